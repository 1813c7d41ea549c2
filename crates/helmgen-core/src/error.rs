//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Command not found: {command}")]
    CommandNotFound { command: String },

    #[error("Failed to launch {command}: {source}")]
    ProcessLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with status {code}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("generate failed in {}: {command} {args}", .file.display())]
    DirectiveFailed {
        file: PathBuf,
        command: String,
        args: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
