//! Lazyhls-AV: wrappers around the external media tools.
//!
//! - [`ToolCommand`]: subprocess builder with output capture and optional timeout
//! - [`ToolRegistry`]: locates `ffmpeg` / `ffprobe` from config or `PATH`
//! - [`Prober`] / [`FfprobeProber`]: read duration and stream info from a source
//! - [`Encoder`] / [`FfmpegEncoder`]: produce one timestamp-continuous MPEG-TS segment
//!
//! The traits let callers swap in fakes so the segment coordinator can be
//! exercised without the real tools installed.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;

pub use command::{ToolCommand, ToolOutput};
pub use probe::{parse_ffprobe_output, FfprobeProber, Prober};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transcode::{partial_path, EncodeJob, Encoder, FfmpegEncoder, SeekPlan, SEEK_PRE_ROLL};
