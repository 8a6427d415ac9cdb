pub mod frame_data;
pub mod sampler;
pub mod video;

pub use sampler::FrameSampler;
pub use video::VideoDecoder;
