//! HLS streaming handlers.
//!
//! Serves the per-task manifest and lazily encoded MPEG-TS segments. Both are
//! sent with caching disabled; segments additionally carry an `ETag` and
//! `Last-Modified` derived from the cached file.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use lazyhls_common::{Error, TaskId};
use lazyhls_media::parse_segment_name;
use std::time::UNIX_EPOCH;
use tokio_util::io::ReaderStream;

use crate::server::{AppContext, AppError};

const NO_CACHE: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Serve `/hls/{id}.m3u8`.
pub async fn manifest(
    State(ctx): State<AppContext>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let id = file
        .strip_suffix(".m3u8")
        .ok_or_else(|| Error::task_not_found(&file))?;
    let task = ctx
        .registry
        .get(&TaskId::from(id))
        .ok_or_else(|| Error::task_not_found(id))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        NO_CACHE,
        task.manifest().to_string(),
    )
        .into_response())
}

/// Serve `/hls/{id}/segment-{n}.ts`, encoding the segment on first request.
///
/// The `v` query parameter is only a cache buster and is ignored.
pub async fn segment(
    State(ctx): State<AppContext>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let id = TaskId::from(id);
    let index = parse_segment_name(&file)
        .ok_or_else(|| Error::invalid_input(format!("not a segment name: {file}")))?;

    let output = ctx.registry.segment(&id, index).await?;

    let file = match tokio::fs::File::open(&output.path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::SegmentFileMissing { path: output.path }.into());
        }
        Err(e) => return Err(Error::from(e).into()),
    };
    let metadata = file.metadata().await.map_err(Error::from)?;
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    let modified_ms = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let etag = format!("\"{:x}-{:x}\"", metadata.len(), modified_ms);
    let last_modified = DateTime::<Utc>::from(modified)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp2t".to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
            (header::ETAG, etag),
            (header::LAST_MODIFIED, last_modified),
        ],
        NO_CACHE,
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
