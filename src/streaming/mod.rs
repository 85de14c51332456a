//! Lazy HLS streaming.
//!
//! A source file is registered once through the init API, which probes it and
//! writes a manifest listing every segment. Segments are encoded the first
//! time a player asks for them and served from the cache afterwards.
//!
//! # Routes
//!
//! - `GET /hls/{id}.m3u8` - Media playlist for a task
//! - `GET /hls/{id}/segment-{n}.ts?v={token}` - One MPEG-TS segment

mod hls;
mod registry;
mod task;

pub use hls::{manifest, segment};
pub use registry::TaskRegistry;
pub use task::{SegmentCounts, SegmentFailure, SegmentOutput, SegmentResult, Task, TaskSnapshot};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create HLS streaming router.
pub fn hls_router() -> Router<AppContext> {
    Router::new()
        .route("/:manifest", get(manifest))
        .route("/:id/:segment", get(segment))
}
