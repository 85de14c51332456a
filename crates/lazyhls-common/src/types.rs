//! Core types shared between the prober, playlist generator and server.

use serde::{Deserialize, Serialize};

/// Fixed length of every segment except the last, in seconds.
pub const SEGMENT_DURATION: f64 = 10.0;

/// Number of segments needed to cover `duration` seconds.
pub fn segment_count(duration: f64) -> u32 {
    if duration <= 0.0 {
        return 0;
    }
    (duration / SEGMENT_DURATION).ceil() as u32
}

/// Round `seconds` to whole milliseconds, the precision manifests and
/// encoder arguments are written with.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Probe result for a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// Duration in seconds, rounded to milliseconds.
    pub duration: f64,
    /// `ceil(duration / SEGMENT_DURATION)`.
    pub total_segments: u32,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    /// Overall bitrate in bits per second, 0 when unknown.
    pub bitrate: u64,
    /// File size in bytes, 0 when unknown.
    pub size: u64,
    /// Source modify time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,
}

impl VideoInfo {
    /// Build a `VideoInfo` for `duration`, deriving the segment count.
    ///
    /// The duration is rounded to milliseconds first, so a sub-millisecond
    /// tail never becomes a segment that renders as `0.000` seconds.
    pub fn with_duration(duration: f64) -> Self {
        let duration = round_millis(duration);
        Self {
            duration,
            total_segments: segment_count(duration),
            width: 0,
            height: 0,
            codec: "unknown".to_string(),
            bitrate: 0,
            size: 0,
            mtime: None,
        }
    }

    /// Time window covered by segment `index`, or `None` when out of range.
    pub fn window(&self, index: u32) -> Option<SegmentWindow> {
        if index >= self.total_segments {
            return None;
        }
        let start = f64::from(index) * SEGMENT_DURATION;
        let end = self.duration.min(start + SEGMENT_DURATION);
        Some(SegmentWindow {
            index,
            start,
            duration: end - start,
        })
    }
}

/// The `[start, start + duration)` window of one segment on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWindow {
    pub index: u32,
    pub start: f64,
    pub duration: f64,
}

impl SegmentWindow {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Lifecycle of a single segment within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    /// Never requested.
    Pending,
    /// An encoder run is in flight.
    Transcoding,
    /// Output is on disk and immutable.
    Ready,
    /// The encoder failed; the failure is replayed until cleanup.
    Error,
}
