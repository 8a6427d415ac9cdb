pub const APP_NAME: &str = "hand-motion";

pub const CONFIG_FILE: &str = "hand-motion.toml";
pub const USER_CONFIG_FILE: &str = "config.toml";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

pub const DEFAULT_FPS: f64 = 1.0;
/// Upper bound on the sampling rate; beyond this every source frame is duplicated many times over.
pub const MAX_FPS: f64 = 1000.0;
pub const DEFAULT_FOCAL_LENGTH: f64 = 1000.0;
pub const DEFAULT_OUTPUT_ROOT: &str = "hand_motion_output";
pub const DEFAULT_TENSOR_FILE: &str = "motion.npy";

pub const DEFAULT_RECONSTRUCT_PROGRAM: &str = "python";
pub const DEFAULT_RECONSTRUCT_ARGS: &[&str] = &[
    "demo.py",
    "--img_folder",
    "{frames}",
    "--out_folder",
    "{output}",
    "--focal_length",
    "{focal_length}",
    "--save_mesh",
];

/// Frame images and meshes share this prefix: `frame-0001.jpg`, `frame-0001_1.obj`.
pub const FRAME_PREFIX: &str = "frame-";
pub const FRAME_NUMBER_WIDTH: usize = 4;
pub const FRAME_IMAGE_EXTENSION: &str = "jpg";
pub const MESH_EXTENSION: &str = "obj";
pub const PAIR_EXTENSION: &str = "txt";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];
