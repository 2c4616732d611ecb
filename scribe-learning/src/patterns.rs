//! Pattern store client
//!
//! The in-memory cache is the working copy of the user's patterns. Writers
//! take the store's single writer lock, change the cache, then persist the
//! whole row; readers copy a snapshot out of the cache and never wait on the
//! network.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::queue::Mutation;
use crate::remote::Remote;
use crate::text::replace_folded;
use crate::types::{LearnedPattern, PatternId, PhraseChange, RefinementMode};

/// Per-user learned patterns
pub struct PatternStore {
    remote: Arc<Remote>,
    cache: RwLock<Vec<LearnedPattern>>,
    writer: Mutex<()>,
}

impl PatternStore {
    pub(crate) fn new(remote: Arc<Remote>) -> Self {
        Self {
            remote,
            cache: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Record one observation of `change` under `mode`.
    ///
    /// Reinforces the active pattern with the same key, or creates one at the
    /// initial confidence. Returns the stored row.
    pub async fn upsert_pattern(&self, change: &PhraseChange, mode: RefinementMode) -> LearnedPattern {
        // Held through the backend write: rows are saved whole, so writes for
        // one id must reach the backend in the order the cache changed.
        // Readers only take the cache lock and never wait on this.
        let _writer = self.writer.lock().await;

        let (row, created) = {
            let mut cache = self.cache.write().await;
            match cache.iter().position(|p| p.is_active && p.same_key(change)) {
                Some(i) => {
                    cache[i].reinforce();
                    (cache[i].clone(), false)
                }
                None => {
                    let pattern =
                        LearnedPattern::new(self.remote.user_id().map(String::from), change, mode);
                    cache.push(pattern.clone());
                    (pattern, true)
                }
            }
        };

        if created {
            debug!(original = %row.original_phrase, corrected = %row.corrected_phrase, "new pattern");
        } else if row.occurrence_count == crate::types::MIN_OCCURRENCES {
            info!(
                original = %row.original_phrase,
                corrected = %row.corrected_phrase,
                confidence = row.confidence,
                "pattern established"
            );
        } else {
            debug!(
                original = %row.original_phrase,
                occurrences = row.occurrence_count,
                confidence = row.confidence,
                "pattern reinforced"
            );
        }

        self.remote.write(Mutation::SavePattern(row.clone())).await;
        row
    }

    /// Established patterns, highest confidence first.
    ///
    /// Refreshes from the backend first; when it cannot be reached the last
    /// known set is served from the cache.
    pub async fn get_active_patterns(&self) -> Vec<LearnedPattern> {
        self.refresh().await;
        self.cached_active_patterns().await
    }

    /// Established patterns from the cache only
    pub async fn cached_active_patterns(&self) -> Vec<LearnedPattern> {
        let mut active: Vec<LearnedPattern> = self
            .cache
            .read()
            .await
            .iter()
            .filter(|p| p.is_established())
            .cloned()
            .collect();
        sort_by_priority(&mut active);
        active
    }

    /// Every cached pattern, including inactive and not yet established ones
    pub async fn all_patterns(&self) -> Vec<LearnedPattern> {
        let mut all = self.cache.read().await.clone();
        sort_by_priority(&mut all);
        all
    }

    /// Apply ready patterns to `text` using the cached set
    pub async fn apply_patterns(&self, text: &str, mode: RefinementMode) -> String {
        let patterns = self.cached_active_patterns().await;
        apply_ready(&patterns, text, mode)
    }

    /// Soft-delete a pattern. Returns the deactivated row, or `None` if the id
    /// is unknown or already inactive.
    pub async fn deactivate_pattern(&self, id: PatternId) -> Option<LearnedPattern> {
        let _writer = self.writer.lock().await;

        let row = {
            let mut cache = self.cache.write().await;
            let pattern = cache.iter_mut().find(|p| p.id == id && p.is_active)?;
            pattern.is_active = false;
            pattern.clone()
        };

        info!(original = %row.original_phrase, corrected = %row.corrected_phrase, "pattern deactivated");
        self.remote.write(Mutation::DeletePattern(row.clone())).await;
        Some(row)
    }

    /// Merge the user's patterns from the backend into the cache. Returns
    /// false when the backend could not be read.
    pub async fn refresh(&self) -> bool {
        let Some((backend, user_id)) = self.remote.reader() else {
            return false;
        };

        let rows = match backend.fetch_patterns(user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to fetch patterns, serving cached set");
                return false;
            }
        };

        let _writer = self.writer.lock().await;
        let mut cache = self.cache.write().await;
        let fetched = rows.len();
        for row in rows {
            merge_row(&mut cache, row.normalized());
        }
        debug!(fetched, cached = cache.len(), "patterns refreshed");
        true
    }

    /// Seed the cache from a local snapshot
    pub(crate) async fn restore(&self, rows: Vec<LearnedPattern>) {
        let _writer = self.writer.lock().await;
        let mut cache = self.cache.write().await;
        for row in rows {
            merge_row(&mut cache, row.normalized());
        }
    }

    pub(crate) async fn clear(&self) {
        let _writer = self.writer.lock().await;
        self.cache.write().await.clear();
    }
}

/// Insert `row` or replace its cached counterpart when `row` is newer.
///
/// Rows match by id, then by (original, corrected) key among rows with the
/// same active state.
fn merge_row(cache: &mut Vec<LearnedPattern>, row: LearnedPattern) {
    let key = PhraseChange::new(row.original_phrase.clone(), row.corrected_phrase.clone());
    let position = cache.iter().position(|p| p.id == row.id).or_else(|| {
        cache
            .iter()
            .position(|p| p.is_active == row.is_active && p.same_key(&key))
    });

    match position {
        Some(i) if row.last_seen >= cache[i].last_seen => cache[i] = row,
        Some(_) => {}
        None => cache.push(row),
    }
}

/// Confidence descending, then more occurrences, then older first
fn sort_by_priority(patterns: &mut [LearnedPattern]) {
    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.occurrence_count.cmp(&a.occurrence_count))
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
}

/// Apply each ready pattern to `text` in the given order.
///
/// Later patterns see the output of earlier ones.
pub fn apply_ready(patterns: &[LearnedPattern], text: &str, mode: RefinementMode) -> String {
    let mut out = text.to_string();
    for pattern in patterns.iter().filter(|p| p.is_ready_for(mode)) {
        let (next, count) = replace_folded(&out, &pattern.original_phrase, &pattern.corrected_phrase);
        if count > 0 {
            debug!(
                original = %pattern.original_phrase,
                replacements = count,
                "applied pattern"
            );
        }
        out = next;
    }
    out
}
