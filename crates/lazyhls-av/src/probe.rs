//! Source probing.
//!
//! [`Prober`] is the seam between the task registry and the external probing
//! tool; [`FfprobeProber`] is the production implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use lazyhls_common::{round_millis, Error, Result, VideoInfo};
use serde::Deserialize;

use crate::command::ToolCommand;

/// Reads duration and stream metadata from a source file.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `path`. Fails with [`Error::Probe`] when the file cannot be
    /// read or has no positive duration.
    async fn probe(&self, path: &Path) -> Result<VideoInfo>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probes sources with `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
    timeout: Option<Duration>,
}

impl FfprobeProber {
    pub fn new(ffprobe: PathBuf) -> Self {
        Self {
            ffprobe,
            timeout: None,
        }
    }

    /// Bound each probe run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let output = ToolCommand::new(self.ffprobe.clone())
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .path_arg(path)
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| Error::probe(e.to_string()))?;

        let info = parse_ffprobe_output(&output.stdout)?;
        tracing::debug!(
            path = %path.display(),
            duration = info.duration,
            segments = info.total_segments,
            codec = %info.codec,
            "probed source"
        );
        Ok(info)
    }
}

/// Parse `ffprobe -print_format json` output into a [`VideoInfo`].
///
/// The first video stream supplies resolution and codec; missing values
/// default to `0` / `"unknown"`. Size and bitrate default to `0` when absent
/// or unparsable. A missing or non-positive duration is an error.
pub fn parse_ffprobe_output(json: &str) -> Result<VideoInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::probe(format!("unparsable ffprobe output: {e}")))?;

    let format = output
        .format
        .ok_or_else(|| Error::probe("ffprobe output has no format section"))?;

    // Rounded to the millisecond precision the manifest is written with.
    let duration = format
        .duration
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .map(round_millis)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| Error::probe("source has no positive duration"))?;

    let mut info = VideoInfo::with_duration(duration);
    info.size = parse_u64(format.size.as_deref());
    info.bitrate = parse_u64(format.bit_rate.as_deref());

    if let Some(video) = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
    {
        info.width = video.width.unwrap_or(0);
        info.height = video.height.unwrap_or(0);
        if let Some(ref codec) = video.codec_name {
            info.codec = codec.clone();
        }
    }

    Ok(info)
}

fn parse_u64(value: Option<&str>) -> u64 {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}
