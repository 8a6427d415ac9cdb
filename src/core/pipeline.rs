use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::extractor;
use super::movement;
use super::reconstructor::HandReconstructor;
use super::tensor;
use crate::shared::config::Config;
use crate::shared::constants;
use crate::utils::file_utils;
use crate::utils::time_utils::Timer;

/// Stages a run may skip when their output is already on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_extract: bool,
    pub skip_reconstruct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub video: PathBuf,
    pub work_dir: PathBuf,
    /// Images written by extraction, `None` when extraction was skipped
    pub extracted_frames: Option<usize>,
    pub usable_frames: usize,
    pub skipped_frames: Vec<String>,
    pub pairs: usize,
    pub tensor: PathBuf,
    pub tensor_shape: [usize; 3],
    pub elapsed_ms: u64,
}

pub struct Pipeline<R: HandReconstructor> {
    config: Config,
    reconstructor: R,
    options: RunOptions,
}

impl<R: HandReconstructor> Pipeline<R> {
    pub fn new(config: Config, reconstructor: R, options: RunOptions) -> Self {
        Self { config, reconstructor, options }
    }

    /// `<output root>/<video stem>`
    pub fn work_dir(&self, video: &Path) -> Result<PathBuf> {
        Ok(self.config.output.root.join(file_utils::file_stem(video)?))
    }

    pub fn run_video(&self, video: &Path) -> Result<VideoReport> {
        let timer = Timer::new();
        let work_dir = self.work_dir(video)?;
        eprintln!("==> {}", video.display());
        crate::utils::logger::info(&format!("processing {:?} into {:?}", video, work_dir));
        std::fs::create_dir_all(&work_dir)
            .with_context(|| format!("Failed to create work directory: {:?}", work_dir))?;

        let extracted_frames = if self.options.skip_extract {
            None
        } else {
            let count = extractor::extract_frames(
                video,
                &work_dir,
                self.config.extract.fps,
                self.config.extract.frame_limit,
            )
            .with_context(|| format!("Frame extraction failed for {:?}", video))?;
            eprintln!("    extracted {} frame(s)", count);
            Some(count)
        };

        if !self.options.skip_reconstruct {
            self.reconstructor
                .reconstruct(&work_dir, &work_dir, self.config.reconstruct.focal_length)
                .with_context(|| format!("Hand reconstruction failed for {:?}", video))?;
            eprintln!("    reconstructed hand meshes");
        }

        let summary = movement::calculate_movement_vectors(&work_dir, &work_dir)?;
        eprintln!(
            "    wrote {} pair file(s) from {} frame(s), {} faulty frame(s) skipped",
            summary.pair_files.len(),
            summary.frames,
            summary.skipped_frames.len()
        );

        let tensor_path = work_dir.join(&self.config.output.tensor_file);
        let tensor_shape = tensor::save_pair_tensor(&summary.pair_files, &tensor_path)
            .with_context(|| format!("Failed to pack motion tensor for {:?}", video))?;
        eprintln!("    saved {:?} to {}", tensor_shape, tensor_path.display());

        Ok(VideoReport {
            video: video.to_path_buf(),
            work_dir,
            extracted_frames,
            usable_frames: summary.frames,
            skipped_frames: summary.skipped_frames,
            pairs: summary.pair_files.len(),
            tensor: tensor_path,
            tensor_shape,
            elapsed_ms: timer.elapsed_ms(),
        })
    }

    /// Every video in `dir`, one after another; the first failure stops the batch.
    pub fn run_batch(&self, dir: &Path) -> Result<Vec<VideoReport>> {
        let videos = file_utils::list_files(dir, constants::VIDEO_EXTENSIONS)?;
        crate::utils::logger::info(&format!("batch of {} video(s) from {:?}", videos.len(), dir));

        let mut reports = Vec::with_capacity(videos.len());
        for video in &videos {
            reports.push(self.run_video(video)?);
        }
        Ok(reports)
    }
}
