//! HLS playlist generation.
//!
//! This module generates the M3U8 media playlist listing every segment of a
//! source up front, before any segment has been encoded.

mod playlist;

pub use playlist::{parse_segment_name, segment_uri, MediaPlaylist, SegmentEntry};
