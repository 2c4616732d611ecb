//! Learning orchestrator
//!
//! [`LearningEngine`] ties the extractor, pattern store, preference estimator,
//! decision engine and offline queue together for one user. It is cheap to
//! clone; clones share state.
//!
//! Entry points on the dictation path never fail: backend trouble is logged and
//! the write is queued. Only [`LearningEngine::reset_all_learning`] reports an
//! error, since the user asked for it explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{LearningBackend, RestBackend};
use crate::cache::{self, Snapshot};
use crate::config::LearningConfig;
use crate::decision::{Decision, DecisionEngine};
use crate::error::{LearningError, Result};
use crate::extract::significant_changes;
use crate::paths::EnginePaths;
use crate::patterns::PatternStore;
use crate::preferences::PreferenceEstimator;
use crate::queue::{Mutation, OfflineOperation, OfflineQueue, ReplayReport};
use crate::remote::Remote;
use crate::text::word_count;
use crate::types::{
    LearnedPattern, LearningQuality, LearningSession, LearningType, PatternId, RefinementMode,
    UserPreference,
};

/// Which of two A/B candidates the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbOption {
    A,
    B,
}

/// Summary for the learning dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningStats {
    pub session_count: u64,
    pub quality: LearningQuality,
    /// Active patterns seen often enough to be served
    pub active_patterns: usize,
    /// Active patterns confident enough to apply in any mode
    pub ready_patterns: usize,
    pub preferences: Vec<UserPreference>,
    /// Writes waiting in the offline queue
    pub pending_operations: usize,
}

struct Inner {
    config: LearningConfig,
    paths: EnginePaths,
    device_id: String,
    remote: Arc<Remote>,
    patterns: PatternStore,
    preferences: PreferenceEstimator,
    decisions: DecisionEngine,
    session_count: AtomicU64,
    /// Held while a cache snapshot is built and written
    snapshot_lock: Mutex<()>,
}

/// Per-user learning engine
#[derive(Clone)]
pub struct LearningEngine {
    inner: Arc<Inner>,
}

impl LearningEngine {
    /// Build an engine from configuration, using a REST backend when one is
    /// configured and local-only learning otherwise.
    pub async fn from_config(config: LearningConfig) -> Result<Self> {
        let backend: Option<Arc<dyn LearningBackend>> = match config.rest_backend() {
            Some(rest) => Some(Arc::new(RestBackend::new(rest)?)),
            None => None,
        };
        Ok(Self::open(config, backend).await)
    }

    /// Open the engine: load the offline queue and cache snapshot, then
    /// refresh from the backend when it can be reached.
    pub async fn open(config: LearningConfig, backend: Option<Arc<dyn LearningBackend>>) -> Self {
        let paths = EnginePaths::from_base(config.data_dir.clone());
        if let Err(e) = paths.ensure_dirs() {
            warn!(path = %paths.data_dir.display(), error = %e, "failed to create learning data dir");
        }

        let device_id = config
            .device_id
            .clone()
            .unwrap_or_else(|| paths.device_id());

        let remote = match backend {
            Some(backend) => {
                let queue = OfflineQueue::open(
                    &paths.queue_file,
                    config.max_attempts,
                    config.max_queue_len,
                )
                .await;
                Remote::new(backend, Arc::new(queue), config.user_id.clone())
            }
            None => Remote::local(config.user_id.clone()),
        };
        let remote = Arc::new(remote);

        let decisions = DecisionEngine::new(config.enabled)
            .with_probability(config.edit_review_probability);

        let engine = Self {
            inner: Arc::new(Inner {
                patterns: PatternStore::new(remote.clone()),
                preferences: PreferenceEstimator::new(remote.clone()),
                remote,
                decisions,
                device_id,
                paths,
                session_count: AtomicU64::new(0),
                snapshot_lock: Mutex::new(()),
                config,
            }),
        };

        let user_id = engine.inner.config.user_id.as_deref();
        if let Some(snapshot) = cache::load(&engine.inner.paths.cache_file, user_id).await {
            debug!(
                patterns = snapshot.patterns.len(),
                sessions = snapshot.session_count,
                "restored learning cache"
            );
            engine.inner.patterns.restore(snapshot.patterns).await;
            engine.inner.preferences.restore(snapshot.preferences).await;
            engine
                .inner
                .session_count
                .store(snapshot.session_count, Ordering::SeqCst);
        }

        if engine.inner.config.enabled && engine.refresh().await {
            engine.save_snapshot().await;
        }

        info!(
            enabled = engine.inner.config.enabled,
            local_only = engine.inner.remote.is_local_only(),
            signed_in = user_id.is_some(),
            sessions = engine.session_count(),
            "learning engine ready"
        );
        engine
    }

    pub fn config(&self) -> &LearningConfig {
        &self.inner.config
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    pub fn session_count(&self) -> u64 {
        self.inner.session_count.load(Ordering::SeqCst)
    }

    pub fn learning_quality(&self) -> LearningQuality {
        LearningQuality::from_session_count(self.session_count())
    }

    pub fn patterns_store(&self) -> &PatternStore {
        &self.inner.patterns
    }

    pub fn preference_estimator(&self) -> &PreferenceEstimator {
        &self.inner.preferences
    }

    /// Decide which feedback prompt to show after a transcription
    pub fn decide(&self, word_count: usize, session_count: u64) -> Decision {
        self.inner.decisions.decide(word_count, session_count)
    }

    /// Decide for `text` using the engine's own session count
    pub fn decide_for(&self, text: &str) -> Decision {
        self.decide(word_count(text), self.session_count())
    }

    /// Record an edit review; learns from the edit unless it was skipped
    pub async fn record_edit_review(
        &self,
        original: &str,
        ai_text: &str,
        user_final: &str,
        mode: RefinementMode,
        was_skipped: bool,
    ) {
        if !self.is_enabled() {
            debug!("learning disabled, ignoring edit review");
            return;
        }

        let session = self
            .new_session(LearningType::EditReview, mode, original, ai_text, user_final)
            .skipped(was_skipped);
        self.inner
            .remote
            .write(Mutation::SaveSession(session))
            .await;

        let mut learned = 0;
        if !was_skipped {
            let changes = significant_changes(ai_text, user_final);
            for change in &changes {
                self.inner.patterns.upsert_pattern(change, mode).await;
            }
            learned = changes.len();
            self.inner
                .preferences
                .update_from_edit(ai_text, user_final)
                .await;
        }

        let sessions = self.bump_sessions();
        self.save_snapshot().await;
        info!(
            mode = %mode,
            skipped = was_skipped,
            changes = learned,
            sessions,
            "recorded edit review"
        );
    }

    /// Record an A/B choice between two refinements of `original`
    pub async fn record_ab_choice(
        &self,
        original: &str,
        option_a: &str,
        option_b: &str,
        selected: AbOption,
        mode: RefinementMode,
    ) {
        if !self.is_enabled() {
            debug!("learning disabled, ignoring A/B choice");
            return;
        }

        let (chosen, rejected) = match selected {
            AbOption::A => (option_a, option_b),
            AbOption::B => (option_b, option_a),
        };

        // The rejected option is stored as the AI text and the chosen one as final
        let session = self.new_session(LearningType::AbTesting, mode, original, rejected, chosen);
        self.inner
            .remote
            .write(Mutation::SaveSession(session))
            .await;
        self.inner
            .preferences
            .update_from_choice(chosen, rejected)
            .await;

        let sessions = self.bump_sessions();
        self.save_snapshot().await;
        info!(mode = %mode, selected = ?selected, sessions, "recorded A/B choice");
    }

    /// Apply learned patterns, then preference adjustments, to refined text
    pub async fn apply_learned_adjustments(&self, text: &str, mode: RefinementMode) -> String {
        if !self.is_enabled() {
            return text.to_string();
        }
        let corrected = self.inner.patterns.apply_patterns(text, mode).await;
        self.inner.preferences.adjust_for_preferences(&corrected).await
    }

    /// Every cached pattern, including inactive and not yet established ones
    pub async fn patterns(&self) -> Vec<LearnedPattern> {
        self.inner.patterns.all_patterns().await
    }

    /// Established patterns, refreshed from the backend when reachable
    pub async fn active_patterns(&self) -> Vec<LearnedPattern> {
        self.inner.patterns.get_active_patterns().await
    }

    /// Stop applying a pattern. Returns false for unknown or inactive ids.
    pub async fn deactivate_pattern(&self, id: PatternId) -> bool {
        let found = self.inner.patterns.deactivate_pattern(id).await.is_some();
        if found {
            self.save_snapshot().await;
        }
        found
    }

    pub async fn stats(&self) -> LearningStats {
        let patterns = self.inner.patterns.cached_active_patterns().await;
        let ready_patterns = patterns
            .iter()
            .filter(|p| RefinementMode::ALL.iter().any(|m| p.is_ready_for(*m)))
            .count();
        let pending_operations = match self.inner.remote.queue() {
            Some(queue) => queue.len().await,
            None => 0,
        };
        let session_count = self.session_count();

        LearningStats {
            session_count,
            quality: LearningQuality::from_session_count(session_count),
            active_patterns: patterns.len(),
            ready_patterns,
            preferences: self.inner.preferences.preferences().await,
            pending_operations,
        }
    }

    /// Writes waiting in the offline queue, oldest first
    pub async fn pending_operations(&self) -> Vec<OfflineOperation> {
        match self.inner.remote.queue() {
            Some(queue) => queue.snapshot().await,
            None => Vec::new(),
        }
    }

    /// Replay the offline queue now.
    ///
    /// Skipped when there is no backend or nobody is signed in. A pass that
    /// drains the queue is followed by a refresh from the backend.
    pub async fn sync_now(&self) -> ReplayReport {
        let remote = &self.inner.remote;
        let (Some(queue), Some(backend), Some(_)) =
            (remote.queue(), remote.backend(), remote.user_id())
        else {
            let remaining = match remote.queue() {
                Some(queue) => queue.len().await,
                None => 0,
            };
            debug!(remaining, "offline replay skipped");
            return ReplayReport {
                skipped: true,
                remaining,
                ..Default::default()
            };
        };

        let report = queue.replay(backend).await;
        if !report.skipped && report.remaining == 0 && self.refresh().await {
            self.save_snapshot().await;
        }
        report
    }

    /// Replay the offline queue every `replay_interval` until shut down
    pub fn spawn_replay_loop(&self) -> ReplayHandle {
        let engine = self.clone();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let period = if self.inner.config.replay_interval.is_zero() {
            Duration::from_secs(30)
        } else {
            self.inner.config.replay_interval
        };

        let handle = tokio::spawn(async move {
            info!(interval = ?period, "offline replay loop started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        engine.sync_now().await;
                    }
                }
            }

            info!("offline replay loop stopped");
        });

        ReplayHandle { shutdown, handle }
    }

    /// Delete every pattern, preference and session of the user, remotely
    /// and locally.
    ///
    /// Remote data goes first; if that fails nothing local is touched and the
    /// error is returned so the user can retry.
    pub async fn reset_all_learning(&self) -> Result<()> {
        let remote = &self.inner.remote;
        let _replay_paused = match remote.queue() {
            Some(queue) => Some(queue.pause_replay().await),
            None => None,
        };

        if let Some((backend, user_id)) = remote.reader() {
            backend.delete_all_for_user(user_id).await.map_err(|e| {
                error!(error = %e, "failed to reset learning data on the backend");
                LearningError::from(e)
            })?;
        }

        if let Some(queue) = remote.queue() {
            queue.clear().await.inspect_err(|e| {
                error!(error = %e, "failed to clear offline queue during reset");
            })?;
        }

        let _snapshot = self.inner.snapshot_lock.lock().await;
        self.inner.patterns.clear().await;
        self.inner.preferences.clear().await;
        self.inner.session_count.store(0, Ordering::SeqCst);
        cache::remove(&self.inner.paths.cache_file)
            .await
            .inspect_err(|e| error!(error = %e, "failed to remove learning cache during reset"))?;

        info!("learning data reset");
        Ok(())
    }

    fn new_session(
        &self,
        learning_type: LearningType,
        mode: RefinementMode,
        original: &str,
        ai_text: &str,
        user_final: &str,
    ) -> LearningSession {
        LearningSession::new(learning_type, mode, original, ai_text, user_final)
            .with_user(self.inner.config.user_id.clone())
            .with_device(self.inner.device_id.clone())
    }

    fn bump_sessions(&self) -> u64 {
        self.inner.session_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Refresh patterns, preferences and the session count from the backend.
    /// Returns true if anything was read.
    async fn refresh(&self) -> bool {
        let patterns = self.inner.patterns.refresh().await;
        let preferences = self.inner.preferences.refresh().await;

        let mut sessions = false;
        if let Some((backend, user_id)) = self.inner.remote.reader() {
            match backend.count_sessions(user_id).await {
                Ok(count) => {
                    self.inner.session_count.fetch_max(count, Ordering::SeqCst);
                    sessions = true;
                }
                Err(e) => debug!(error = %e, "failed to count sessions"),
            }
        }

        patterns || preferences || sessions
    }

    /// Write the current state to the cache file.
    ///
    /// The snapshot is taken under the lock so a later write never carries
    /// older state than an earlier one.
    async fn save_snapshot(&self) {
        let _snapshot = self.inner.snapshot_lock.lock().await;
        let snapshot = Snapshot::new(
            self.inner.config.user_id.clone(),
            self.session_count(),
            self.inner.patterns.all_patterns().await,
            self.inner.preferences.preferences().await,
        );
        if let Err(e) = cache::save(&self.inner.paths.cache_file, &snapshot).await {
            warn!(error = %e, "failed to save learning cache");
        }
    }
}

/// Handle to the background replay task
pub struct ReplayHandle {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReplayHandle {
    /// Stop the loop and wait for it to finish its current pass
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "offline replay loop ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
