//! Per-source task state and its segment table.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use lazyhls_common::{Error, SegmentStatus, TaskId, VideoInfo};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Result of one segment transcode, shared by every requester.
pub type SegmentResult = Result<SegmentOutput, Arc<Error>>;

/// Completion handle awaited by all requesters of the same segment.
pub type SegmentHandle = Shared<BoxFuture<'static, SegmentResult>>;

/// A finished segment on disk.
#[derive(Debug, Clone)]
pub struct SegmentOutput {
    pub path: PathBuf,
    pub size: u64,
    pub elapsed: Duration,
}

struct SegmentSlot {
    status: SegmentStatus,
    handle: SegmentHandle,
    size: Option<u64>,
    elapsed: Option<Duration>,
    error: Option<Arc<Error>>,
}

/// One registered source file.
///
/// Everything except the segment table is fixed at creation. A task is
/// replaced, never mutated, when its source changes.
pub struct Task {
    id: TaskId,
    source: PathBuf,
    info: VideoInfo,
    manifest_path: PathBuf,
    manifest: String,
    cache_token: u64,
    generation: u64,
    created_at: DateTime<Utc>,
    segments: Mutex<HashMap<u32, SegmentSlot>>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        source: PathBuf,
        info: VideoInfo,
        manifest_path: PathBuf,
        manifest: String,
        cache_token: u64,
        generation: u64,
    ) -> Self {
        Self {
            id,
            source,
            info,
            manifest_path,
            manifest,
            cache_token,
            generation,
            created_at: Utc::now(),
            segments: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The rendered manifest, identical to the file at [`Task::manifest_path`].
    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    pub fn cache_token(&self) -> u64 {
        self.cache_token
    }

    /// Registry generation this task was created in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Cache file for segment `index`. Unique per task, cache token,
    /// registry generation and index.
    pub fn segment_file_name(&self, index: u32) -> String {
        format!(
            "{}-{}-{}-{}.ts",
            self.id, self.cache_token, self.generation, index
        )
    }

    /// Return the handle for `index`, calling `start` to create it if the
    /// segment has never been requested.
    ///
    /// Lookup and insert happen under one lock, so `start` runs at most once
    /// per index for the lifetime of the task.
    pub(crate) fn segment_handle<F>(&self, index: u32, start: F) -> SegmentHandle
    where
        F: FnOnce() -> SegmentHandle,
    {
        let mut segments = self.segments.lock();
        segments
            .entry(index)
            .or_insert_with(|| SegmentSlot {
                status: SegmentStatus::Transcoding,
                handle: start(),
                size: None,
                elapsed: None,
                error: None,
            })
            .handle
            .clone()
    }

    /// Record the outcome of the transcode for `index`.
    pub(crate) fn finish_segment(&self, index: u32, result: &SegmentResult) {
        let mut segments = self.segments.lock();
        let Some(slot) = segments.get_mut(&index) else {
            return;
        };
        match result {
            Ok(output) => {
                slot.status = SegmentStatus::Ready;
                slot.size = Some(output.size);
                slot.elapsed = Some(output.elapsed);
            }
            Err(e) => {
                slot.status = SegmentStatus::Error;
                slot.error = Some(Arc::clone(e));
            }
        }
    }

    /// Current status of segment `index`.
    pub fn segment_status(&self, index: u32) -> SegmentStatus {
        self.segments
            .lock()
            .get(&index)
            .map(|s| s.status)
            .unwrap_or(SegmentStatus::Pending)
    }

    /// Point-in-time view of the task for the status API.
    pub fn snapshot(&self) -> TaskSnapshot {
        let segments = self.segments.lock();
        let mut counts = SegmentCounts::default();
        let mut failures = Vec::new();
        let mut encode_ms = 0u64;

        for (index, slot) in segments.iter() {
            match slot.status {
                SegmentStatus::Pending => {}
                SegmentStatus::Transcoding => counts.transcoding += 1,
                SegmentStatus::Ready => counts.ready += 1,
                SegmentStatus::Error => counts.error += 1,
            }
            if let Some(elapsed) = slot.elapsed {
                encode_ms += elapsed.as_millis() as u64;
            }
            counts.bytes += slot.size.unwrap_or(0);
            if let Some(ref e) = slot.error {
                failures.push(SegmentFailure {
                    index: *index,
                    error: e.to_string(),
                });
            }
        }
        counts.pending = self
            .info
            .total_segments
            .saturating_sub(counts.transcoding + counts.ready + counts.error);
        failures.sort_by_key(|f| f.index);

        TaskSnapshot {
            video_id: self.id.clone(),
            video_path: self.source.clone(),
            cache_token: self.cache_token,
            created_at: self.created_at,
            video_info: self.info.clone(),
            segments: counts,
            total_encode_ms: encode_ms,
            failures,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("cache_token", &self.cache_token)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCounts {
    pub pending: u32,
    pub transcoding: u32,
    pub ready: u32,
    pub error: u32,
    /// Bytes of all ready segments.
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFailure {
    pub index: u32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub video_id: TaskId,
    pub video_path: PathBuf,
    pub cache_token: u64,
    pub created_at: DateTime<Utc>,
    pub video_info: VideoInfo,
    pub segments: SegmentCounts,
    pub total_encode_ms: u64,
    pub failures: Vec<SegmentFailure>,
}
