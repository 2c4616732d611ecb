//! Preference estimation
//!
//! Every edit or A/B choice yields one delta per [`PreferenceType`], folded into
//! a running estimate in [-1, 1]. Strong preferences then drive deterministic
//! dictionary rewrites of new text.

mod lexicon;
pub mod metrics;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

pub use lexicon::{Lexicon, is_contraction};

use crate::queue::Mutation;
use crate::remote::Remote;
use crate::types::{PreferenceType, UserPreference};

/// Preference magnitude beyond which adjustments kick in
pub const ADJUSTMENT_THRESHOLD: f64 = 0.5;

/// Weight of an A/B choice relative to a direct edit
pub const CHOICE_WEIGHT: f64 = 0.5;

/// Raw per-axis deltas observed from one event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreferenceDeltas {
    pub formality: f64,
    pub conciseness: f64,
    pub contractions: f64,
    pub punctuation: f64,
}

impl PreferenceDeltas {
    /// Deltas for a user rewriting `ai_text` into `user_text`
    pub fn from_edit(ai_text: &str, user_text: &str) -> Self {
        Self {
            formality: metrics::formality(user_text) - metrics::formality(ai_text),
            conciseness: metrics::conciseness(ai_text, user_text),
            contractions: metrics::contractions(user_text) - metrics::contractions(ai_text),
            punctuation: metrics::punctuation(user_text) - metrics::punctuation(ai_text),
        }
    }

    /// Deltas for picking `selected` over `rejected`, at half weight
    pub fn from_choice(selected: &str, rejected: &str) -> Self {
        Self::from_edit(rejected, selected).scaled(CHOICE_WEIGHT)
    }

    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            formality: self.formality * factor,
            conciseness: self.conciseness * factor,
            contractions: self.contractions * factor,
            punctuation: self.punctuation * factor,
        }
    }

    pub fn get(&self, preference_type: PreferenceType) -> f64 {
        match preference_type {
            PreferenceType::Formality => self.formality,
            PreferenceType::Conciseness => self.conciseness,
            PreferenceType::Contractions => self.contractions,
            PreferenceType::Punctuation => self.punctuation,
        }
    }
}

/// Per-user preference profile with single-writer updates
pub struct PreferenceEstimator {
    remote: Arc<Remote>,
    cache: RwLock<BTreeMap<PreferenceType, UserPreference>>,
    writer: Mutex<()>,
    lexicon: Lexicon,
}

impl PreferenceEstimator {
    pub(crate) fn new(remote: Arc<Remote>) -> Self {
        Self {
            remote,
            cache: RwLock::new(BTreeMap::new()),
            writer: Mutex::new(()),
            lexicon: Lexicon::new(),
        }
    }

    /// Current preferences, one row per axis that has seen data
    pub async fn preferences(&self) -> Vec<UserPreference> {
        self.cache.read().await.values().cloned().collect()
    }

    /// Current value for one axis, neutral when unknown
    pub async fn value(&self, preference_type: PreferenceType) -> f64 {
        self.cache
            .read()
            .await
            .get(&preference_type)
            .map_or(0.0, |p| p.value)
    }

    /// Learn from a direct edit of the AI output
    pub async fn update_from_edit(&self, ai_text: &str, user_text: &str) {
        self.fold(PreferenceDeltas::from_edit(ai_text, user_text))
            .await;
    }

    /// Learn from an A/B selection
    pub async fn update_from_choice(&self, selected: &str, rejected: &str) {
        self.fold(PreferenceDeltas::from_choice(selected, rejected))
            .await;
    }

    /// Fold one set of deltas into every axis and persist the new rows
    pub async fn fold(&self, deltas: PreferenceDeltas) {
        // Held through the backend writes so rows land in fold order
        let _writer = self.writer.lock().await;

        let updated: Vec<UserPreference> = {
            let mut cache = self.cache.write().await;
            PreferenceType::ALL
                .into_iter()
                .map(|preference_type| {
                    let pref = cache.entry(preference_type).or_insert_with(|| {
                        UserPreference::new(
                            self.remote.user_id().map(String::from),
                            preference_type,
                        )
                    });
                    pref.fold(deltas.get(preference_type));
                    pref.clone()
                })
                .collect()
        };

        debug!(
            formality = deltas.formality,
            conciseness = deltas.conciseness,
            contractions = deltas.contractions,
            punctuation = deltas.punctuation,
            "folded preference deltas"
        );

        for pref in updated {
            self.remote.write(Mutation::SavePreference(pref)).await;
        }
    }

    /// Rewrite `text` toward the user's strong preferences.
    ///
    /// Formality, then conciseness, then contractions; each only past
    /// [`ADJUSTMENT_THRESHOLD`].
    pub async fn adjust_for_preferences(&self, text: &str) -> String {
        let (formality, conciseness, contractions) = {
            let cache = self.cache.read().await;
            let value = |t: PreferenceType| cache.get(&t).map_or(0.0, |p| p.value);
            (
                value(PreferenceType::Formality),
                value(PreferenceType::Conciseness),
                value(PreferenceType::Contractions),
            )
        };
        self.adjust_with(text, formality, conciseness, contractions)
    }

    fn adjust_with(
        &self,
        text: &str,
        formality: f64,
        conciseness: f64,
        contractions: f64,
    ) -> String {
        let mut out = text.to_string();

        if formality > ADJUSTMENT_THRESHOLD {
            let (next, n) = self.lexicon.formalize(&out);
            debug!(replacements = n, "formality adjustment");
            out = next;
        } else if formality < -ADJUSTMENT_THRESHOLD {
            let (next, n) = self.lexicon.casualize(&out);
            debug!(replacements = n, "informality adjustment");
            out = next;
        }

        if conciseness > ADJUSTMENT_THRESHOLD {
            let (next, n) = self.lexicon.strip_lead_ins(&out);
            debug!(removed = n, "conciseness adjustment");
            out = next;
        }

        if contractions > ADJUSTMENT_THRESHOLD {
            let (next, n) = self.lexicon.contract(&out);
            debug!(replacements = n, "contraction adjustment");
            out = next;
        } else if contractions < -ADJUSTMENT_THRESHOLD {
            let (next, n) = self.lexicon.expand(&out);
            debug!(replacements = n, "expansion adjustment");
            out = next;
        }

        out
    }

    /// Pull the user's preferences from the backend. Returns false when the
    /// backend could not be read and the cache was left as is.
    pub async fn refresh(&self) -> bool {
        let Some((backend, user_id)) = self.remote.reader() else {
            return false;
        };

        let rows = match backend.fetch_preferences(user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to fetch preferences, using cached values");
                return false;
            }
        };

        let _writer = self.writer.lock().await;
        let mut cache = self.cache.write().await;
        for row in rows.into_iter().map(UserPreference::normalized) {
            let newer = cache
                .get(&row.preference_type)
                .is_none_or(|cached| row.last_updated >= cached.last_updated);
            if newer {
                cache.insert(row.preference_type, row);
            }
        }
        true
    }

    /// Seed the cache from a local snapshot
    pub(crate) async fn restore(&self, rows: Vec<UserPreference>) {
        let _writer = self.writer.lock().await;
        let mut cache = self.cache.write().await;
        for row in rows.into_iter().map(UserPreference::normalized) {
            cache.insert(row.preference_type, row);
        }
    }

    pub(crate) async fn clear(&self) {
        let _writer = self.writer.lock().await;
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LearningBackend, MemoryBackend};
    use crate::queue::OfflineQueue;

    fn local() -> PreferenceEstimator {
        PreferenceEstimator::new(Arc::new(Remote::local(Some("alex".into()))))
    }

    async fn with_value(preference_type: PreferenceType, value: f64) -> PreferenceEstimator {
        let estimator = local();
        let mut pref = UserPreference::new(Some("alex".into()), preference_type);
        pref.value = value;
        estimator.restore(vec![pref]).await;
        estimator
    }

    #[test]
    fn test_edit_deltas() {
        let deltas = PreferenceDeltas::from_edit(
            "I am basically going to send the report today",
            "I'm sending the report today!",
        );
        assert!(deltas.formality > 0.0);
        assert!(deltas.conciseness > 0.0);
        assert!(deltas.contractions > 0.0);
        assert!(deltas.punctuation > 0.0);
    }

    #[test]
    fn test_choice_is_half_weight() {
        let edit = PreferenceDeltas::from_edit("We are done", "We're done!");
        let choice = PreferenceDeltas::from_choice("We're done!", "We are done");
        assert!((choice.contractions - edit.contractions * 0.5).abs() < 1e-12);
        assert!((choice.punctuation - edit.punctuation * 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_update_folds_every_axis() {
        let estimator = local();
        estimator.update_from_edit("we are done", "we're done").await;

        let prefs = estimator.preferences().await;
        assert_eq!(prefs.len(), 4);
        assert!(prefs.iter().all(|p| p.sample_count == 1));
        // 1/2 contractions delta at weight 0.3
        assert!((estimator.value(PreferenceType::Contractions).await - 0.15).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_values_stay_clamped() {
        let estimator = local();
        for _ in 0..50 {
            estimator.update_from_edit("a b c d e f g h", "Wow!!!").await;
            for pref in estimator.preferences().await {
                assert!((-1.0..=1.0).contains(&pref.value));
            }
        }
    }

    #[tokio::test]
    async fn test_adjust_requires_strong_preference() {
        let estimator = with_value(PreferenceType::Formality, 0.5).await;
        assert_eq!(
            estimator.adjust_for_preferences("yeah, gonna do it").await,
            "yeah, gonna do it"
        );

        let estimator = with_value(PreferenceType::Formality, 0.8).await;
        assert_eq!(
            estimator.adjust_for_preferences("yeah, gonna do it").await,
            "yes, going to do it"
        );
    }

    #[tokio::test]
    async fn test_adjust_directions() {
        let estimator = with_value(PreferenceType::Formality, -0.9).await;
        assert_eq!(
            estimator
                .adjust_for_preferences("Thank you, I will determine the cause")
                .await,
            "Thanks, I will figure out the cause"
        );

        let estimator = with_value(PreferenceType::Contractions, -0.7).await;
        assert_eq!(
            estimator.adjust_for_preferences("We're sure it's fine").await,
            "We are sure it is fine"
        );

        let estimator = with_value(PreferenceType::Conciseness, 0.6).await;
        assert_eq!(
            estimator
                .adjust_for_preferences("To be honest, the build is green")
                .await,
            "The build is green"
        );
    }

    #[tokio::test]
    async fn test_refresh_keeps_newer_local_rows() {
        let backend = Arc::new(MemoryBackend::new());
        let remote = Arc::new(Remote::new(
            backend.clone(),
            Arc::new(OfflineQueue::in_memory(5, 100)),
            Some("alex".into()),
        ));

        let mut stale = UserPreference::new(Some("alex".into()), PreferenceType::Punctuation);
        stale.value = -0.9;
        stale.last_updated -= chrono::Duration::hours(1);
        backend.save_preference(&stale).await.unwrap();

        let mut remote_only = UserPreference::new(Some("alex".into()), PreferenceType::Formality);
        remote_only.value = 0.7;
        backend.save_preference(&remote_only).await.unwrap();

        let estimator = PreferenceEstimator::new(remote);
        let mut local = UserPreference::new(Some("alex".into()), PreferenceType::Punctuation);
        local.value = 0.2;
        estimator.restore(vec![local]).await;

        assert!(estimator.refresh().await);
        assert_eq!(estimator.value(PreferenceType::Punctuation).await, 0.2);
        assert_eq!(estimator.value(PreferenceType::Formality).await, 0.7);
    }

    #[tokio::test]
    async fn test_refresh_offline_keeps_cache() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_reachable(false);
        let estimator = PreferenceEstimator::new(Arc::new(Remote::new(
            backend,
            Arc::new(OfflineQueue::in_memory(5, 100)),
            Some("alex".into()),
        )));
        let mut pref = UserPreference::new(Some("alex".into()), PreferenceType::Formality);
        pref.value = 0.4;
        estimator.restore(vec![pref]).await;

        assert!(!estimator.refresh().await);
        assert_eq!(estimator.value(PreferenceType::Formality).await, 0.4);
    }
}
