use opencv::core::Mat;
use std::time::Duration;

/// One decoded video frame
pub struct FrameData {
    pub image: Mat,
    /// Position in the source stream, starting at 0
    pub source_index: u64,
    pub timestamp: Duration,
}

impl FrameData {
    pub fn new(image: Mat, source_index: u64, timestamp: Duration) -> Self {
        Self { image, source_index, timestamp }
    }
}
