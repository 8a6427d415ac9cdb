use std::path::PathBuf;

use crate::core::frame_table::Hand;

/// Failures of the mesh and motion stages that callers may want to match on.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Mesh file name does not match frame-<N>_<hand>.obj: {0}")]
    MalformedName(String),

    #[error("Unknown hand index '{hand}' in {file}")]
    UnknownHand { file: String, hand: String },

    #[error("Bad vertex on line {line} of {path:?}")]
    BadVertex { path: PathBuf, line: usize },

    #[error("No frame has {hand} hand data to stand in for frame {frame}")]
    NoHandData { frame: String, hand: Hand },

    #[error("Bad vector on line {line} of {path:?}")]
    BadVector { path: PathBuf, line: usize },

    #[error("{path:?} has {found} vectors, expected {expected}")]
    RaggedPairs { path: PathBuf, expected: usize, found: usize },

    #[error("No frame pair files to pack")]
    NoPairs,
}
