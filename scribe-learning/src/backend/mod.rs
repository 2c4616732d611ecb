//! Remote persistence for learning data
//!
//! The backend is the authoritative long-term store. Every call may fail with a
//! connectivity error, which the engine redirects into the offline queue.

mod memory;
mod rest;

use async_trait::async_trait;

pub use memory::MemoryBackend;
pub use rest::{RestBackend, RestBackendConfig};

use crate::error::BackendError;
use crate::types::{LearnedPattern, LearningSession, UserPreference};

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// CRUD surface the engine needs from the backend
#[async_trait]
pub trait LearningBackend: Send + Sync {
    /// All patterns stored for a user, active or not
    async fn fetch_patterns(&self, user_id: &str) -> BackendResult<Vec<LearnedPattern>>;

    /// Insert or overwrite a pattern row by id
    async fn save_pattern(&self, pattern: &LearnedPattern) -> BackendResult<()>;

    /// All preference rows for a user
    async fn fetch_preferences(&self, user_id: &str) -> BackendResult<Vec<UserPreference>>;

    /// Insert or overwrite the preference row for its (user, type)
    async fn save_preference(&self, preference: &UserPreference) -> BackendResult<()>;

    /// Append a learning session; inserting the same id twice is a no-op
    async fn insert_session(&self, session: &LearningSession) -> BackendResult<()>;

    /// Number of sessions recorded for a user
    async fn count_sessions(&self, user_id: &str) -> BackendResult<u64>;

    /// Remove every pattern, preference and session of a user
    async fn delete_all_for_user(&self, user_id: &str) -> BackendResult<()>;
}
