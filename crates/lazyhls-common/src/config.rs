//! Configuration sections shared by the tool wrappers and the server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Paths to external tools. Unset entries are looked up in `PATH`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Encoder settings applied to every segment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Keyframe interval in frames, also used as `keyint_min`.
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,

    /// Output frame rate. When unset the source rate is kept.
    #[serde(default)]
    pub frame_rate: Option<f64>,

    /// Audio codec, or `copy` to pass the first audio stream through.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Maximum seconds a single encoder run may take. Unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_gop_size() -> u32 {
    48
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            gop_size: default_gop_size(),
            frame_rate: None,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            timeout_secs: None,
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn copies_audio(&self) -> bool {
        self.audio_codec == "copy"
    }
}
