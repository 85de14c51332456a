//! Lazyhls-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across lazyhls:
//!
//! - **Task IDs**: Deterministic, URL-safe identifiers derived from source paths
//! - **Core Types**: `VideoInfo`, segment status and the fixed-length segment windows
//! - **Configuration**: Tool path overrides and encoder settings shared by the crates
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use lazyhls_common::{segment_count, TaskId, Error, Result};
//! use std::path::Path;
//!
//! let id = TaskId::from_path(Path::new("/media/movie.mkv"));
//! assert_eq!(id.as_str().len(), 32);
//!
//! // A 25 second source is split into 10s + 10s + 5s
//! assert_eq!(segment_count(25.0), 3);
//!
//! fn example() -> Result<()> {
//!     Err(Error::task_not_found("abc"))
//! }
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::{ToolsConfig, TranscodeConfig};
pub use error::{Error, Result};
pub use ids::TaskId;
pub use types::*;
