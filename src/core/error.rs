use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the player control core.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to spawn player '{path}': {source}")]
    Spawn { path: String, source: io::Error },

    #[error("player stdin is not available")]
    StdinClosed,

    #[error("player stdout/stderr pipes are not available")]
    PipesUnavailable,

    #[error("invalid seek mode {0}")]
    InvalidSeekMode(i32),

    #[error("failed to create fifo {path}: {source}")]
    Fifo { path: PathBuf, source: io::Error },

    #[error("malformed stream header: {0}")]
    BadHeader(String),

    #[error("unsupported chroma layout: {0}")]
    UnsupportedChroma(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
