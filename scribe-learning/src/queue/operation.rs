//! Queued backend mutations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{BackendResult, LearningBackend};
use crate::types::{LearnedPattern, LearningSession, UserPreference};

/// Kind of queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    SaveSession,
    SavePattern,
    SavePreference,
    DeletePattern,
}

/// A backend write together with the row it carries.
///
/// Every variant is idempotent against the backend, so replaying an operation
/// that already landed is harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation_type", content = "payload", rename_all = "snake_case")]
pub enum Mutation {
    SaveSession(LearningSession),
    SavePattern(LearnedPattern),
    SavePreference(UserPreference),
    /// Soft delete: the pattern row with `is_active` cleared
    DeletePattern(LearnedPattern),
}

impl Mutation {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Mutation::SaveSession(_) => OperationType::SaveSession,
            Mutation::SavePattern(_) => OperationType::SavePattern,
            Mutation::SavePreference(_) => OperationType::SavePreference,
            Mutation::DeletePattern(_) => OperationType::DeletePattern,
        }
    }

    /// Perform the write against `backend`
    pub async fn apply(&self, backend: &dyn LearningBackend) -> BackendResult<()> {
        match self {
            Mutation::SaveSession(session) => backend.insert_session(session).await,
            Mutation::SavePattern(pattern) => backend.save_pattern(pattern).await,
            Mutation::SavePreference(preference) => backend.save_preference(preference).await,
            Mutation::DeletePattern(pattern) => {
                let mut row = pattern.clone();
                row.is_active = false;
                backend.save_pattern(&row).await
            }
        }
    }
}

/// A mutation waiting for the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineOperation {
    pub id: Uuid,
    pub mutation: Mutation,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt_count: u32,
}

impl OfflineOperation {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            id: Uuid::new_v4(),
            mutation,
            created_at: Utc::now(),
            last_attempt: None,
            attempt_count: 0,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        self.mutation.operation_type()
    }
}
