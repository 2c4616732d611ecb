//! In-memory backend for tests and embedders.
//!
//! Rows live in memory only. Reachability can be toggled to simulate the
//! backend going away, and writes can be forced to fail with a rejection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendResult, LearningBackend};
use crate::error::BackendError;
use crate::types::{LearnedPattern, LearningSession, PreferenceType, UserPreference};

#[derive(Default)]
struct Tables {
    patterns: HashMap<Uuid, LearnedPattern>,
    preferences: HashMap<(Option<String>, PreferenceType), UserPreference>,
    sessions: Vec<LearningSession>,
}

/// In-memory implementation of [`LearningBackend`]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    reachable: AtomicBool,
    reject_writes: AtomicBool,
    calls: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty, reachable backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            reachable: AtomicBool::new(true),
            reject_writes: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// Simulate connectivity loss (`false`) or recovery (`true`)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make every write fail with a non-connectivity rejection
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of calls received, successful or not
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of stored sessions
    pub async fn sessions(&self) -> Vec<LearningSession> {
        self.tables.read().await.sessions.clone()
    }

    /// Snapshot of stored patterns
    pub async fn patterns(&self) -> Vec<LearnedPattern> {
        self.tables.read().await.patterns.values().cloned().collect()
    }

    /// Snapshot of stored preferences
    pub async fn preferences(&self) -> Vec<UserPreference> {
        self.tables.read().await.preferences.values().cloned().collect()
    }

    fn check_reachable(&self) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("memory backend offline".into()))
        }
    }

    fn check_writable(&self) -> BackendResult<()> {
        self.check_reachable()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 500,
                message: "writes rejected".into(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LearningBackend for MemoryBackend {
    async fn fetch_patterns(&self, user_id: &str) -> BackendResult<Vec<LearnedPattern>> {
        self.check_reachable()?;
        let tables = self.tables.read().await;
        Ok(tables
            .patterns
            .values()
            .filter(|p| p.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn save_pattern(&self, pattern: &LearnedPattern) -> BackendResult<()> {
        self.check_writable()?;
        self.tables
            .write()
            .await
            .patterns
            .insert(pattern.id, pattern.clone());
        Ok(())
    }

    async fn fetch_preferences(&self, user_id: &str) -> BackendResult<Vec<UserPreference>> {
        self.check_reachable()?;
        let tables = self.tables.read().await;
        Ok(tables
            .preferences
            .values()
            .filter(|p| p.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn save_preference(&self, preference: &UserPreference) -> BackendResult<()> {
        self.check_writable()?;
        self.tables.write().await.preferences.insert(
            (preference.user_id.clone(), preference.preference_type),
            preference.clone(),
        );
        Ok(())
    }

    async fn insert_session(&self, session: &LearningSession) -> BackendResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if !tables.sessions.iter().any(|s| s.id == session.id) {
            tables.sessions.push(session.clone());
        }
        Ok(())
    }

    async fn count_sessions(&self, user_id: &str) -> BackendResult<u64> {
        self.check_reachable()?;
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .count() as u64)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> BackendResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables
            .patterns
            .retain(|_, p| p.user_id.as_deref() != Some(user_id));
        tables
            .preferences
            .retain(|_, p| p.user_id.as_deref() != Some(user_id));
        tables
            .sessions
            .retain(|s| s.user_id.as_deref() != Some(user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LearningType, PhraseChange, RefinementMode};

    fn session(user: &str) -> LearningSession {
        LearningSession::new(
            LearningType::EditReview,
            RefinementMode::Cleanup,
            "raw",
            "refined text",
            "final text",
        )
        .with_user(Some(user.into()))
    }

    #[tokio::test]
    async fn test_save_pattern_overwrites_by_id() {
        let backend = MemoryBackend::new();
        let mut pattern = LearnedPattern::new(
            Some("alex".into()),
            &PhraseChange::new("gonna", "going to"),
            RefinementMode::Email,
        );
        backend.save_pattern(&pattern).await.unwrap();
        pattern.reinforce();
        backend.save_pattern(&pattern).await.unwrap();

        let stored = backend.fetch_patterns("alex").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].occurrence_count, 2);
    }

    #[tokio::test]
    async fn test_fetch_is_scoped_to_user() {
        let backend = MemoryBackend::new();
        backend.insert_session(&session("alex")).await.unwrap();
        backend.insert_session(&session("sam")).await.unwrap();
        assert_eq!(backend.count_sessions("alex").await.unwrap(), 1);
        assert_eq!(backend.count_sessions("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_session_is_idempotent() {
        let backend = MemoryBackend::new();
        let s = session("alex");
        backend.insert_session(&s).await.unwrap();
        backend.insert_session(&s).await.unwrap();
        assert_eq!(backend.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_connectivity() {
        let backend = MemoryBackend::new();
        backend.set_reachable(false);
        let err = backend.insert_session(&session("alex")).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(backend.sessions().await.is_empty());

        backend.set_reachable(true);
        backend.insert_session(&session("alex")).await.unwrap();
        assert_eq!(backend.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_writes_are_not_connectivity() {
        let backend = MemoryBackend::new();
        backend.set_reject_writes(true);
        let err = backend.insert_session(&session("alex")).await.unwrap_err();
        assert!(!err.is_connectivity());
        // Reads still work
        assert_eq!(backend.count_sessions("alex").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_removes_only_that_user() {
        let backend = MemoryBackend::new();
        backend.insert_session(&session("alex")).await.unwrap();
        backend.insert_session(&session("sam")).await.unwrap();
        backend
            .save_preference(&UserPreference::new(
                Some("alex".into()),
                PreferenceType::Formality,
            ))
            .await
            .unwrap();

        backend.delete_all_for_user("alex").await.unwrap();

        assert_eq!(backend.count_sessions("alex").await.unwrap(), 0);
        assert_eq!(backend.count_sessions("sam").await.unwrap(), 1);
        assert!(backend.fetch_preferences("alex").await.unwrap().is_empty());
        assert_eq!(backend.call_count(), 7);
    }
}
