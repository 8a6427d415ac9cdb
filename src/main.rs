mod core;
mod decoder;
mod error;
mod mesh;
mod shared;
mod utils;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::pipeline::{Pipeline, RunOptions};
use crate::core::reconstructor::{ExternalCommand, HandReconstructor};
use crate::core::{extractor, movement, tensor};
use crate::shared::config::{Config, Overrides};

#[derive(Parser)]
#[command(author, version, about = "Hand motion tensors from video via 3D hand reconstruction", long_about = None)]
struct Cli {
    /// TOML config file (defaults to ./hand-motion.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory for error.log and debug.log
    #[arg(long, global = true, default_value = ".")]
    log_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct OverrideArgs {
    /// Frames sampled per second of video
    #[arg(short, long)]
    fps: Option<f64>,
    /// Stop extraction after this many frames
    #[arg(short = 'n', long)]
    frame_limit: Option<usize>,
    /// Camera focal length passed to the reconstruction model
    #[arg(long)]
    focal_length: Option<f64>,
    /// Root directory for per-video work directories
    #[arg(short, long)]
    output_root: Option<PathBuf>,
}

impl OverrideArgs {
    fn to_overrides(&self) -> Overrides {
        Overrides {
            fps: self.fps,
            frame_limit: self.frame_limit,
            focal_length: self.focal_length,
            output_root: self.output_root.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames from a video as frame-NNNN.jpg
    Extract {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short = 'd', long)]
        output_dir: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Run the external hand reconstruction model over a frame directory
    Reconstruct {
        #[arg(short = 'd', long)]
        frames_dir: PathBuf,
        /// Mesh output directory (defaults to the frame directory)
        #[arg(short = 'm', long)]
        mesh_dir: Option<PathBuf>,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Write one displacement file per adjacent frame pair
    Vectors {
        #[arg(short = 'd', long)]
        mesh_dir: PathBuf,
        /// Where pair files go (defaults to the mesh directory)
        #[arg(short = 'p', long)]
        pairs_dir: Option<PathBuf>,
    },
    /// Stack pair files into a (pairs, vectors, 3) .npy tensor
    Pack {
        #[arg(short = 'p', long)]
        pairs_dir: PathBuf,
        /// Tensor path (defaults to <pairs dir>/<tensor_file>)
        #[arg(short = 't', long)]
        tensor: Option<PathBuf>,
    },
    /// Extract, reconstruct, build vectors and pack one video
    Run {
        #[arg(short, long)]
        video: PathBuf,
        #[arg(long, default_value_t = false)]
        skip_extract: bool,
        #[arg(long, default_value_t = false)]
        skip_reconstruct: bool,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Run every video in a directory, one after another
    Batch {
        #[arg(short = 'd', long)]
        videos_dir: PathBuf,
        #[arg(long, default_value_t = false)]
        skip_extract: bool,
        #[arg(long, default_value_t = false)]
        skip_reconstruct: bool,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Print the effective configuration
    Config {
        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

fn load_config(cli: &Cli, overrides: &OverrideArgs) -> Result<Config> {
    let mut config = Config::locate(cli.config.as_deref())?;
    config.apply(&overrides.to_overrides())?;
    crate::utils::logger::debug(&format!("effective config: {:?}", config));
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    crate::utils::logger::init(&cli.log_dir);

    let result = run(&cli);
    if let Err(e) = &result {
        crate::utils::logger::error(&format!("{:#}", e));
    }
    result
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Extract { input, output_dir, overrides } => {
            let config = load_config(cli, overrides)?;
            let count = extractor::extract_frames(input, output_dir, config.extract.fps, config.extract.frame_limit)?;
            println!("{} frame(s) written to {}", count, output_dir.display());
        }
        Commands::Reconstruct { frames_dir, mesh_dir, overrides } => {
            let config = load_config(cli, overrides)?;
            let mesh_dir = mesh_dir.as_ref().unwrap_or(frames_dir);
            ExternalCommand::from_config(&config.reconstruct).reconstruct(
                frames_dir,
                mesh_dir,
                config.reconstruct.focal_length,
            )?;
        }
        Commands::Vectors { mesh_dir, pairs_dir } => {
            let pairs_dir = pairs_dir.as_ref().unwrap_or(mesh_dir);
            let summary = movement::calculate_movement_vectors(mesh_dir, pairs_dir)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Pack { pairs_dir, tensor } => {
            let config = load_config(cli, &OverrideArgs::default())?;
            let output = tensor
                .clone()
                .unwrap_or_else(|| pairs_dir.join(&config.output.tensor_file));
            let shape = tensor::save_motion_tensor(pairs_dir, &output)?;
            println!("{:?} -> {}", shape, output.display());
        }
        Commands::Run { video, skip_extract, skip_reconstruct, overrides } => {
            let config = load_config(cli, overrides)?;
            let reconstructor = ExternalCommand::from_config(&config.reconstruct);
            let options = RunOptions { skip_extract: *skip_extract, skip_reconstruct: *skip_reconstruct };
            let report = Pipeline::new(config, reconstructor, options).run_video(video)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Batch { videos_dir, skip_extract, skip_reconstruct, overrides } => {
            let config = load_config(cli, overrides)?;
            let reconstructor = ExternalCommand::from_config(&config.reconstruct);
            let options = RunOptions { skip_extract: *skip_extract, skip_reconstruct: *skip_reconstruct };
            let reports = Pipeline::new(config, reconstructor, options).run_batch(videos_dir)?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Config { overrides } => {
            let config = load_config(cli, overrides)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
