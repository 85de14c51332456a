//! Lazyhls-Media: HLS playlist generation.
//!
//! The playlist for a source is computed from its probed duration alone:
//! fixed 10 second segments, a shorter final segment, and segment URIs that
//! carry the task's cache token so players refetch after the source changes.

pub mod hls;

pub use hls::{parse_segment_name, segment_uri, MediaPlaylist};
