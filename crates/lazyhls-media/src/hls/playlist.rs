//! HLS playlist structures.

use lazyhls_common::{TaskId, VideoInfo, SEGMENT_DURATION};
use std::fmt::Write;

/// URI of segment `index` for a task, carrying the cache token.
pub fn segment_uri(task_id: &TaskId, index: u32, cache_token: u64) -> String {
    format!("/hls/{}/segment-{}.ts?v={}", task_id, index, cache_token)
}

/// Parse a `segment-<n>.ts` file name back into its index.
pub fn parse_segment_name(name: &str) -> Option<u32> {
    name.strip_prefix("segment-")?
        .strip_suffix(".ts")?
        .parse()
        .ok()
}

/// Media playlist for a single rendition.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Protocol version.
    pub version: u32,
    /// Target duration in seconds.
    pub target_duration: u32,
    /// Media sequence number.
    pub media_sequence: u32,
    /// Segment entries.
    pub segments: Vec<SegmentEntry>,
    /// Whether this is an ended playlist.
    pub ended: bool,
}

impl MediaPlaylist {
    /// Create an empty, ended playlist with fixed-length segments.
    pub fn on_demand() -> Self {
        Self {
            version: 3,
            target_duration: SEGMENT_DURATION as u32,
            media_sequence: 0,
            segments: Vec::new(),
            ended: true,
        }
    }

    /// List every segment of a probed source.
    ///
    /// All entries are `SEGMENT_DURATION` long except the last, which covers
    /// the remainder of the source.
    pub fn for_source(task_id: &TaskId, info: &VideoInfo, cache_token: u64) -> Self {
        let mut playlist = Self::on_demand();
        playlist.segments = (0..info.total_segments)
            .filter_map(|i| info.window(i))
            .map(|window| SegmentEntry {
                duration: window.duration,
                uri: segment_uri(task_id, window.index, cache_token),
            })
            .collect();
        playlist
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "#EXTM3U");
        let _ = writeln!(out, "#EXT-X-VERSION:{}", self.version);
        let _ = writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration);
        let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence);

        for segment in &self.segments {
            let _ = writeln!(out, "#EXTINF:{:.3},", segment.duration);
            let _ = writeln!(out, "{}", segment.uri);
        }

        if self.ended {
            let _ = writeln!(out, "#EXT-X-ENDLIST");
        }

        out
    }
}

/// A segment entry in the playlist.
#[derive(Debug, Clone)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI.
    pub uri: String,
}
