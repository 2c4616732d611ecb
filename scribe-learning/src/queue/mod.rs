//! Durable offline write queue
//!
//! Mutations that could not reach the backend are appended here and replayed
//! oldest first once it is reachable again. The queue is written to a JSON file
//! after every change so pending work survives a restart.

mod operation;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub use operation::{Mutation, OfflineOperation, OperationType};

use crate::backend::LearningBackend;
use crate::error::{BackendError, LearningError};

/// Default number of attempts before an operation is abandoned
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default bound on queued operations
pub const DEFAULT_MAX_LEN: usize = 1000;

/// Outcome of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Operations applied and removed
    pub applied: usize,
    /// Operations that failed and stay queued
    pub failed: usize,
    /// Operations dropped after reaching the attempt cap
    pub abandoned: usize,
    /// Operations still queued after the pass
    pub remaining: usize,
    /// Another pass was already running, nothing was attempted
    pub skipped: bool,
}

/// Ordered, retryable queue of backend mutations
pub struct OfflineQueue {
    ops: Mutex<VecDeque<OfflineOperation>>,
    path: Option<PathBuf>,
    max_attempts: u32,
    max_len: usize,
    replay_guard: Mutex<()>,
}

impl OfflineQueue {
    /// Open the queue persisted at `path`, starting empty if the file is
    /// missing or unreadable
    pub async fn open(path: impl Into<PathBuf>, max_attempts: u32, max_len: usize) -> Self {
        let path = path.into();
        let ops = load(&path).await;
        if !ops.is_empty() {
            info!(pending = ops.len(), path = %path.display(), "loaded offline queue");
        }
        Self {
            ops: Mutex::new(ops),
            path: Some(path),
            max_attempts: max_attempts.max(1),
            max_len: max_len.max(1),
            replay_guard: Mutex::new(()),
        }
    }

    /// Queue without a backing file
    pub fn in_memory(max_attempts: u32, max_len: usize) -> Self {
        Self {
            ops: Mutex::new(VecDeque::new()),
            path: None,
            max_attempts: max_attempts.max(1),
            max_len: max_len.max(1),
            replay_guard: Mutex::new(()),
        }
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append a mutation, evicting the oldest operations beyond the bound
    pub async fn enqueue(&self, mutation: Mutation) -> crate::Result<()> {
        let op = OfflineOperation::new(mutation);
        let mut ops = self.ops.lock().await;
        debug!(id = %op.id, operation = ?op.operation_type(), "queued offline operation");
        ops.push_back(op);
        while ops.len() > self.max_len {
            if let Some(dropped) = ops.pop_front() {
                warn!(
                    id = %dropped.id,
                    operation = ?dropped.operation_type(),
                    "offline queue full, dropping oldest operation"
                );
            }
        }
        self.persist(&ops).await
    }

    pub async fn len(&self) -> usize {
        self.ops.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ops.lock().await.is_empty()
    }

    /// Copy of the queued operations, oldest first
    pub async fn snapshot(&self) -> Vec<OfflineOperation> {
        self.ops.lock().await.iter().cloned().collect()
    }

    /// Drop every queued operation
    pub async fn clear(&self) -> crate::Result<()> {
        let mut ops = self.ops.lock().await;
        ops.clear();
        self.persist(&ops).await
    }

    /// Hold off replay passes until the guard is dropped
    pub async fn pause_replay(&self) -> MutexGuard<'_, ()> {
        self.replay_guard.lock().await
    }

    /// Replay queued operations against `backend`, oldest first.
    ///
    /// A connectivity failure ends the pass; other failures are counted and the
    /// pass moves on. Operations reaching the attempt cap are dropped. Returns
    /// immediately if another pass is running.
    pub async fn replay(&self, backend: &dyn LearningBackend) -> ReplayReport {
        let Ok(_guard) = self.replay_guard.try_lock() else {
            debug!("offline replay already in progress");
            return ReplayReport {
                skipped: true,
                ..Default::default()
            };
        };

        let pending = self.snapshot().await;
        let mut report = ReplayReport::default();

        for op in pending {
            match op.mutation.apply(backend).await {
                Ok(()) => {
                    self.remove(op.id).await;
                    report.applied += 1;
                }
                Err(e) => {
                    let connectivity = e.is_connectivity();
                    if self.record_failure(&op, &e).await {
                        report.abandoned += 1;
                    } else {
                        report.failed += 1;
                    }
                    if connectivity {
                        break;
                    }
                }
            }
        }

        let ops = self.ops.lock().await;
        if let Err(e) = self.persist(&ops).await {
            warn!(error = %e, "failed to persist offline queue after replay");
        }
        report.remaining = ops.len();

        if report.applied > 0 || report.abandoned > 0 {
            info!(
                applied = report.applied,
                failed = report.failed,
                abandoned = report.abandoned,
                remaining = report.remaining,
                "offline queue replayed"
            );
        }
        report
    }

    async fn remove(&self, id: uuid::Uuid) {
        self.ops.lock().await.retain(|op| op.id != id);
    }

    /// Count a failed attempt; returns true if the operation was abandoned
    async fn record_failure(&self, op: &OfflineOperation, error: &BackendError) -> bool {
        let mut ops = self.ops.lock().await;
        let Some(index) = ops.iter().position(|o| o.id == op.id) else {
            return false;
        };

        let entry = &mut ops[index];
        entry.attempt_count += 1;
        entry.last_attempt = Some(Utc::now());

        if entry.attempt_count >= self.max_attempts {
            warn!(
                id = %entry.id,
                operation = ?entry.operation_type(),
                attempts = entry.attempt_count,
                error = %error,
                "abandoning offline operation"
            );
            ops.remove(index);
            return true;
        }

        debug!(
            id = %entry.id,
            attempts = entry.attempt_count,
            error = %error,
            "offline operation failed, will retry"
        );
        false
    }

    async fn persist(&self, ops: &VecDeque<OfflineOperation>) -> crate::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LearningError::Queue(format!("failed to create queue dir: {e}"))
            })?;
        }

        let json = serde_json::to_vec(ops)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| LearningError::Queue(format!("failed to write queue: {e}")))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| LearningError::Queue(format!("failed to replace queue file: {e}")))?;
        Ok(())
    }
}

async fn load(path: &Path) -> VecDeque<OfflineOperation> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return VecDeque::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read offline queue, starting empty");
            return VecDeque::new();
        }
    };

    match serde_json::from_slice(&contents) {
        Ok(ops) => ops,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding corrupt offline queue");
            VecDeque::new()
        }
    }
}
