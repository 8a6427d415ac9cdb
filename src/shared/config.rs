use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants;

/// Everything the pipeline needs, passed explicitly into each stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub reconstruct: ReconstructConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Frames sampled per second of video
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Stop after this many frames
    #[serde(default)]
    pub frame_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// `{frames}`, `{output}` and `{focal_length}` are substituted per run
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_focal_length")]
    pub focal_length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    #[serde(default = "default_tensor_file")]
    pub tensor_file: String,
}

fn default_fps() -> f64 { constants::DEFAULT_FPS }
fn default_program() -> String { constants::DEFAULT_RECONSTRUCT_PROGRAM.to_string() }
fn default_args() -> Vec<String> {
    constants::DEFAULT_RECONSTRUCT_ARGS.iter().map(|s| s.to_string()).collect()
}
fn default_focal_length() -> f64 { constants::DEFAULT_FOCAL_LENGTH }
fn default_output_root() -> PathBuf { PathBuf::from(constants::DEFAULT_OUTPUT_ROOT) }
fn default_tensor_file() -> String { constants::DEFAULT_TENSOR_FILE.to_string() }

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            frame_limit: None,
        }
    }
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            focal_length: default_focal_length(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            tensor_file: default_tensor_file(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub fps: Option<f64>,
    pub frame_limit: Option<usize>,
    pub focal_length: Option<f64>,
    pub output_root: Option<PathBuf>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then the working directory, then the user config dir.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from(constants::CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join(constants::APP_NAME).join(constants::USER_CONFIG_FILE);
            if user.is_file() {
                return Self::load(user);
            }
        }

        Ok(Self::default())
    }

    pub fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(fps) = overrides.fps {
            self.extract.fps = fps;
        }
        if overrides.frame_limit.is_some() {
            self.extract.frame_limit = overrides.frame_limit;
        }
        if let Some(focal_length) = overrides.focal_length {
            self.reconstruct.focal_length = focal_length;
        }
        if let Some(root) = &overrides.output_root {
            self.output.root = root.clone();
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !(self.extract.fps.is_finite() && self.extract.fps > 0.0) {
            anyhow::bail!("extract.fps must be a positive number, got {}", self.extract.fps);
        }
        if self.extract.fps > constants::MAX_FPS {
            anyhow::bail!("extract.fps must be at most {}, got {}", constants::MAX_FPS, self.extract.fps);
        }
        if self.extract.frame_limit == Some(0) {
            anyhow::bail!("extract.frame_limit must be at least 1");
        }
        if self.reconstruct.program.trim().is_empty() {
            anyhow::bail!("reconstruct.program must not be empty");
        }
        Ok(())
    }
}
