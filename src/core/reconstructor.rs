use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

use crate::shared::config::ReconstructConfig;

/// 3D hand-pose model run over a directory of frame images.
///
/// Implementations write `frame-<N>_<hand>.obj` meshes into `output_dir`.
pub trait HandReconstructor {
    fn reconstruct(&self, frames_dir: &Path, output_dir: &Path, focal_length: f64) -> Result<()>;
}

/// Runs the model as a child process built from an argument template.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn from_config(config: &ReconstructConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Arguments with `{frames}`, `{output}` and `{focal_length}` filled in.
    pub fn expand_args(&self, frames_dir: &Path, output_dir: &Path, focal_length: f64) -> Vec<String> {
        let frames = frames_dir.to_string_lossy();
        let output = output_dir.to_string_lossy();
        let focal = focal_length.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{frames}", &frames)
                    .replace("{output}", &output)
                    .replace("{focal_length}", &focal)
            })
            .collect()
    }
}

impl HandReconstructor for ExternalCommand {
    fn reconstruct(&self, frames_dir: &Path, output_dir: &Path, focal_length: f64) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

        let args = self.expand_args(frames_dir, output_dir, focal_length);
        crate::utils::logger::info(&format!("running reconstruction: {} {}", self.program, args.join(" ")));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .with_context(|| format!("Failed to start reconstruction program '{}'", self.program))?;

        if !status.success() {
            let err_msg = format!("Reconstruction program '{}' exited with {}", self.program, status);
            crate::utils::logger::error(&err_msg);
            anyhow::bail!(err_msg);
        }

        Ok(())
    }
}
