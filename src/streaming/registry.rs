//! Task registry and segment coordination.
//!
//! The registry maps source files to [`Task`]s and makes sure each segment of
//! a task is encoded at most once. The first request for a segment spawns the
//! encoder on the runtime; that request and every later one await the same
//! shared handle, so all of them observe the same success or the same error.
//!
//! Encodes are detached from the requests that started them: a client going
//! away does not cancel the encoder. Failures are permanent for the lifetime
//! of the task; only [`TaskRegistry::cleanup`] clears them. An encode that
//! finishes after its task was discarded deletes its own output.

use dashmap::DashMap;
use futures::FutureExt;
use lazyhls_av::{EncodeJob, Encoder, Prober, SeekPlan};
use lazyhls_common::{Error, Result, TaskId};
use lazyhls_media::MediaPlaylist;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use super::task::{SegmentHandle, SegmentOutput, SegmentResult, Task, TaskSnapshot};

/// Registry of all known tasks.
pub struct TaskRegistry {
    cache_dir: PathBuf,
    prober: Arc<dyn Prober>,
    encoder: Arc<dyn Encoder>,
    tasks: Arc<DashMap<TaskId, Arc<Task>>>,
    /// Serializes `initialize` per task id so a source is probed once.
    init_locks: DashMap<TaskId, Arc<tokio::sync::Mutex<()>>>,
    /// Bumped by every cleanup and baked into segment file names, so an
    /// encode that outlives its task never collides with a newer one.
    generation: AtomicU64,
}

impl TaskRegistry {
    pub fn new(cache_dir: PathBuf, prober: Arc<dyn Prober>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            cache_dir,
            prober,
            encoder,
            tasks: Arc::new(DashMap::new()),
            init_locks: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create or reuse the task for `source`.
    ///
    /// Returns the existing task unchanged while the source's modify time is
    /// the one it was created with. Otherwise probes the source, writes the
    /// manifest and registers a fresh task, replacing any stale one.
    pub async fn initialize(&self, source: &Path) -> Result<Arc<Task>> {
        let metadata = match tokio::fs::metadata(source).await {
            Ok(m) if m.is_file() => m,
            _ => return Err(Error::file_not_found(source)),
        };
        let source = tokio::fs::canonicalize(source)
            .await
            .map_err(|_| Error::file_not_found(source))?;
        let id = TaskId::from_path(&source);
        let token = cache_token(&metadata)?;

        let lock = Arc::clone(self.init_locks.entry(id.clone()).or_default().value());
        let result = {
            let _guard = lock.lock().await;
            self.initialize_locked(id.clone(), source, token).await
        };

        // Drop the lock entry unless another caller is already waiting on it.
        self.init_locks
            .remove_if(&id, |_, l| Arc::ptr_eq(l, &lock) && Arc::strong_count(l) <= 2);
        result
    }

    async fn initialize_locked(
        &self,
        id: TaskId,
        source: PathBuf,
        token: u64,
    ) -> Result<Arc<Task>> {
        if let Some(existing) = self.tasks.get(&id) {
            if existing.cache_token() == token {
                tracing::debug!(task_id = %id, "reusing existing task");
                return Ok(Arc::clone(existing.value()));
            }
            tracing::info!(
                task_id = %id,
                old_token = existing.cache_token(),
                new_token = token,
                "source modified, recreating task"
            );
        }

        let mut info = self.prober.probe(&source).await?;
        info.mtime = Some(token);

        let manifest = MediaPlaylist::for_source(&id, &info, token).render();
        let manifest_path = self.cache_dir.join(format!("{id}.m3u8"));
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(&manifest_path, &manifest).await?;

        let generation = self.generation.load(Ordering::SeqCst);
        let task = Arc::new(Task::new(
            id.clone(),
            source.clone(),
            info,
            manifest_path,
            manifest,
            token,
            generation,
        ));
        self.tasks.insert(id.clone(), Arc::clone(&task));

        tracing::info!(
            task_id = %id,
            path = %source.display(),
            duration = task.info().duration,
            segments = task.info().total_segments,
            "task created"
        );
        Ok(task)
    }

    pub fn get(&self, id: &TaskId) -> Option<Arc<Task>> {
        self.tasks.get(id).map(|t| Arc::clone(t.value()))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Snapshots of every registered task, ordered by id.
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        let mut out: Vec<TaskSnapshot> = self.tasks.iter().map(|t| t.snapshot()).collect();
        out.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        out
    }

    /// Return segment `index` of task `id`, encoding it on first request.
    pub async fn segment(&self, id: &TaskId, index: u32) -> SegmentResult {
        let task = self
            .get(id)
            .ok_or_else(|| Arc::new(Error::task_not_found(id)))?;
        let plan = SeekPlan::for_segment(task.info(), index)
            .ok_or_else(|| Arc::new(Error::segment_not_found(id, index)))?;

        let handle = task.segment_handle(index, || self.spawn_encode(&task, plan));
        handle.await
    }

    fn spawn_encode(&self, task: &Arc<Task>, plan: SeekPlan) -> SegmentHandle {
        let job = EncodeJob {
            source: task.source().to_path_buf(),
            output: self.cache_dir.join(task.segment_file_name(plan.index)),
            plan,
        };
        let task = Arc::clone(task);
        let encoder = Arc::clone(&self.encoder);
        let tasks = Arc::clone(&self.tasks);

        tracing::info!(
            task_id = %task.id(),
            segment = plan.index,
            start = plan.target,
            duration = plan.duration,
            "transcoding segment"
        );

        let join = tokio::spawn(async move {
            let index = job.plan.index;
            let result = encode_segment(encoder.as_ref(), job).await.map_err(Arc::new);
            task.finish_segment(index, &result);

            match &result {
                Ok(output) => {
                    tracing::info!(
                        task_id = %task.id(),
                        segment = index,
                        bytes = output.size,
                        elapsed_ms = output.elapsed.as_millis() as u64,
                        "segment ready"
                    );
                    let current = tasks
                        .get(task.id())
                        .is_some_and(|t| Arc::ptr_eq(t.value(), &task));
                    if !current {
                        tracing::debug!(task_id = %task.id(), segment = index, "task discarded during encode, removing output");
                        if let Err(e) = tokio::fs::remove_file(&output.path).await {
                            tracing::warn!(path = %output.path.display(), error = %e, "failed to remove orphaned segment");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(task_id = %task.id(), segment = index, error = %e, "segment failed");
                }
            }
            result
        });

        async move {
            match join.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(Error::internal(format!("encode task failed: {e}")))),
            }
        }
        .boxed()
        .shared()
    }

    /// Discard every task and delete all regular files directly inside the
    /// cache directory. Returns the number of files deleted.
    ///
    /// Files that cannot be deleted are logged and skipped.
    pub async fn cleanup(&self) -> Result<usize> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let discarded = self.tasks.len();
        self.tasks.clear();
        self.init_locks.clear();

        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                _ => continue,
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete cache file");
                }
            }
        }

        tracing::info!(tasks = discarded, files = deleted, "cache cleaned up");
        Ok(deleted)
    }
}

/// Run the encoder and confirm its output landed on disk.
async fn encode_segment(encoder: &dyn Encoder, job: EncodeJob) -> Result<SegmentOutput> {
    let started = Instant::now();
    encoder.encode(&job).await?;

    let size = match tokio::fs::metadata(&job.output).await {
        Ok(m) => m.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::SegmentFileMissing { path: job.output });
        }
        Err(e) => return Err(e.into()),
    };

    Ok(SegmentOutput {
        path: job.output,
        size,
        elapsed: started.elapsed(),
    })
}

/// Milliseconds since the epoch of the source's modify time, falling back
/// to its creation time.
fn cache_token(metadata: &std::fs::Metadata) -> Result<u64> {
    let time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .map_err(Error::from)?;
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    Ok(since_epoch.as_millis() as u64)
}
