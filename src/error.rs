//! Error types for the capture pipeline.

use crate::session::RecorderState;
use std::io;
use thiserror::Error;

/// Failures surfaced by the library. Application code (CLI, config parsing)
/// wraps these in `anyhow`.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Unknown bit depth, encoding or channel layout, or a chunk whose sample
    /// type does not match the session format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Configuration rejected before a session could start.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: RecorderState,
    },

    /// Device reported an invalid-operation status or failed to open.
    #[error("device read error: {0}")]
    DeviceRead(String),

    #[error("sink I/O error: {0}")]
    Sink(#[from] io::Error),

    #[error("capture worker panicked")]
    Worker,
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, RecorderError>;
