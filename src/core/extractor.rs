use anyhow::{Context, Result};
use opencv::{core::Vector, imgcodecs};
use std::fs;
use std::path::Path;

use crate::decoder::{FrameSampler, VideoDecoder};
use crate::shared::constants;
use crate::utils::time_utils::Timer;

/// `frame-0001.jpg` for the first sampled frame.
pub fn frame_image_name(number: usize) -> String {
    format!(
        "{}{:0width$}.{}",
        constants::FRAME_PREFIX,
        number,
        constants::FRAME_IMAGE_EXTENSION,
        width = constants::FRAME_NUMBER_WIDTH
    )
}

/// Sample `video` at `fps` and save each frame as a JPEG in `output_dir`.
///
/// Returns the number of images written.
pub fn extract_frames(video: &Path, output_dir: &Path, fps: f64, frame_limit: Option<usize>) -> Result<usize> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let video_str = video
        .to_str()
        .with_context(|| format!("Video path is not valid UTF-8: {:?}", video))?;
    let mut decoder = VideoDecoder::new(video_str)?;
    let mut sampler = FrameSampler::new(decoder.fps(), fps);
    if decoder.fps().is_none() {
        crate::utils::logger::warn(&format!("{} reports no frame rate; keeping every frame", video_str));
    }
    eprintln!(
        "Extracting {} at {} fps ({} source frames)",
        video_str,
        fps,
        decoder.frame_count().map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );
    let limit = frame_limit.unwrap_or(usize::MAX);
    let timer = Timer::new();
    let mut written = 0usize;

    'decode: while written < limit {
        let Some(frame) = decoder.read_frame()? else {
            break;
        };

        for _ in 0..sampler.take(frame.source_index) {
            if written >= limit {
                break 'decode;
            }
            written += 1;
            let path = output_dir.join(frame_image_name(written));
            save_image(&path, &frame.image)?;
            crate::utils::logger::debug(&format!(
                "frame {} <- source {} at {:.3}s",
                written,
                frame.source_index,
                frame.timestamp.as_secs_f64()
            ));
        }
    }

    crate::utils::logger::info(&format!(
        "extracted {} frame(s) from {} in {}ms",
        written,
        decoder.path(),
        timer.elapsed_ms()
    ));
    Ok(written)
}

fn save_image(path: &Path, image: &opencv::core::Mat) -> Result<()> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Frame path is not valid UTF-8: {:?}", path))?;
    let saved = imgcodecs::imwrite(path_str, image, &Vector::new())
        .with_context(|| format!("Failed to encode frame: {:?}", path))?;
    if !saved {
        anyhow::bail!("OpenCV refused to write frame: {:?}", path);
    }
    Ok(())
}
