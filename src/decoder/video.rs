use anyhow::{anyhow, Result};
use opencv::{prelude::*, videoio};

use super::frame_data::FrameData;

/// Sequential OpenCV reader for one video file.
pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    path: String,
    fps: f64,
    frame_count: Option<u64>,
    next_index: u64,
}

impl VideoDecoder {
    pub fn new(path: &str) -> Result<Self> {
        crate::utils::logger::debug(&format!("opening video with OpenCV: {}", path));

        // CAP_ANY lets OpenCV pick the backend (FFmpeg, GStreamer, AVFoundation, ...)
        let capture = videoio::VideoCapture::from_file(path, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            let err_msg = format!("Failed to open video file: {}", path);
            crate::utils::logger::error(&err_msg);
            return Err(anyhow!(err_msg));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frames = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let frame_count = (frames.is_finite() && frames > 0.0).then(|| frames as u64);

        crate::utils::logger::info(&format!(
            "video opened: {} {}x{} fps={} frames={:?} backend={}",
            path,
            width,
            height,
            fps,
            frame_count,
            capture.get_backend_name().unwrap_or_default()
        ));

        Ok(Self {
            capture,
            path: path.to_string(),
            fps,
            frame_count,
            next_index: 0,
        })
    }

    /// Native frame rate, `None` when the container does not report one.
    pub fn fps(&self) -> Option<f64> {
        (self.fps.is_finite() && self.fps > 0.0).then_some(self.fps)
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next decoded frame in BGR order, or `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<FrameData>> {
        let mut image = Mat::default();
        if !self.capture.read(&mut image)? || image.empty() {
            return Ok(None);
        }

        let source_index = self.next_index;
        self.next_index += 1;
        let timestamp = match self.fps() {
            Some(fps) => std::time::Duration::from_secs_f64(source_index as f64 / fps),
            None => std::time::Duration::ZERO,
        };

        Ok(Some(FrameData::new(image, source_index, timestamp)))
    }
}
