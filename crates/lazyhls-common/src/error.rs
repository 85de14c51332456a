//! Common error types used throughout lazyhls.
//!
//! Every crate funnels its failures into [`Error`], which carries enough
//! context for the HTTP layer to derive a status code via [`Error::http_status`].

use std::path::PathBuf;

/// Common error type for lazyhls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source file does not exist or is not a regular file.
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// No task is registered under the identifier.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The segment index is outside the task's segment range.
    #[error("Segment not found: {task_id}/segment-{index}.ts")]
    SegmentNotFound { task_id: String, index: u32 },

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Probing the source failed.
    #[error("Probe failed: {0}")]
    Probe(String),

    /// The encoder failed to produce a segment.
    #[error("Transcode failed for segment {index}: {message}")]
    Transcode { index: u32, message: String },

    /// The encoder reported success but left no output file behind.
    #[error("Segment file missing: {}", path.display())]
    SegmentFileMissing { path: PathBuf },

    /// An external tool could not be launched or exited with an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool { tool: String, message: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::FileNotFound { .. } => 404,
            Error::TaskNotFound(_) => 404,
            Error::SegmentNotFound { .. } => 404,
            Error::InvalidInput(_) => 400,
            Error::Probe(_) => 500,
            Error::Transcode { .. } => 500,
            Error::SegmentFileMissing { .. } => 500,
            Error::Tool { .. } => 500,
            Error::Io(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::FileNotFound { .. } => "file_not_found",
            Error::TaskNotFound(_) => "task_not_found",
            Error::SegmentNotFound { .. } => "segment_not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::Probe(_) => "probe_error",
            Error::Transcode { .. } => "transcode_error",
            Error::SegmentFileMissing { .. } => "segment_file_missing",
            Error::Tool { .. } => "tool_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Create a new FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new TaskNotFound error.
    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        Self::TaskNotFound(id.to_string())
    }

    /// Create a new SegmentNotFound error.
    pub fn segment_not_found(task_id: impl std::fmt::Display, index: u32) -> Self {
        Self::SegmentNotFound {
            task_id: task_id.to_string(),
            index,
        }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Probe error.
    pub fn probe<S: Into<String>>(msg: S) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a new Transcode error.
    pub fn transcode<S: Into<String>>(index: u32, msg: S) -> Self {
        Self::Transcode {
            index,
            message: msg.into(),
        }
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
