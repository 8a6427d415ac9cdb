pub mod extractor;
pub mod frame_table;
pub mod movement;
pub mod pipeline;
pub mod reconstructor;
pub mod tensor;
