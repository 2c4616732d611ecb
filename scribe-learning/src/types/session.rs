//! Learning sessions: one record per collected feedback event

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LearningError;
use crate::text::word_count;

/// Refinement mode the dictation was processed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinementMode {
    Raw,
    Cleanup,
    Email,
    Messaging,
}

impl RefinementMode {
    pub const ALL: [RefinementMode; 4] = [
        RefinementMode::Raw,
        RefinementMode::Cleanup,
        RefinementMode::Email,
        RefinementMode::Messaging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementMode::Raw => "raw",
            RefinementMode::Cleanup => "cleanup",
            RefinementMode::Email => "email",
            RefinementMode::Messaging => "messaging",
        }
    }
}

impl fmt::Display for RefinementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefinementMode {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefinementMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LearningError::InvalidValue(format!("unknown refinement mode: {s}")))
    }
}

/// How feedback for a session was collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningType {
    /// The user edited the refined text directly
    EditReview,
    /// The user picked one of two candidate refinements
    AbTesting,
}

/// One feedback event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub original_transcript: String,
    pub ai_refinement: String,
    pub user_final_text: String,
    pub refinement_mode: RefinementMode,
    /// Word count of the AI refinement
    pub text_length: usize,
    pub learning_type: LearningType,
    pub was_skipped: bool,
    pub device_id: String,
}

impl LearningSession {
    pub fn new(
        learning_type: LearningType,
        refinement_mode: RefinementMode,
        original_transcript: impl Into<String>,
        ai_refinement: impl Into<String>,
        user_final_text: impl Into<String>,
    ) -> Self {
        let ai_refinement = ai_refinement.into();
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            timestamp: Utc::now(),
            original_transcript: original_transcript.into(),
            text_length: word_count(&ai_refinement),
            ai_refinement,
            user_final_text: user_final_text.into(),
            refinement_mode,
            learning_type,
            was_skipped: false,
            device_id: String::new(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    #[must_use]
    pub fn skipped(mut self, was_skipped: bool) -> Self {
        self.was_skipped = was_skipped;
        self
    }
}

/// How much the engine has learned, by number of recorded sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningQuality {
    Minimal,
    Basic,
    Good,
    Excellent,
}

impl LearningQuality {
    pub fn from_session_count(count: u64) -> Self {
        match count {
            0..=9 => LearningQuality::Minimal,
            10..=49 => LearningQuality::Basic,
            50..=99 => LearningQuality::Good,
            _ => LearningQuality::Excellent,
        }
    }
}

impl fmt::Display for LearningQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LearningQuality::Minimal => "minimal",
            LearningQuality::Basic => "basic",
            LearningQuality::Good => "good",
            LearningQuality::Excellent => "excellent",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!(
            "Email".parse::<RefinementMode>().unwrap(),
            RefinementMode::Email
        );
        assert_eq!(
            " messaging ".parse::<RefinementMode>().unwrap(),
            RefinementMode::Messaging
        );
        assert!("poetry".parse::<RefinementMode>().is_err());
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        let json = serde_json::to_string(&RefinementMode::Cleanup).unwrap();
        assert_eq!(json, "\"cleanup\"");
    }

    #[test]
    fn test_session_counts_refined_words() {
        let session = LearningSession::new(
            LearningType::EditReview,
            RefinementMode::Email,
            "um so i think we should go",
            "I think we should go.",
            "We should go.",
        );
        assert_eq!(session.text_length, 5);
        assert!(!session.was_skipped);
        assert!(session.user_id.is_none());
    }

    #[test]
    fn test_session_builders() {
        let session = LearningSession::new(
            LearningType::AbTesting,
            RefinementMode::Raw,
            "a",
            "b",
            "c",
        )
        .with_user(Some("alex".into()))
        .with_device("laptop")
        .skipped(true);

        assert_eq!(session.user_id.as_deref(), Some("alex"));
        assert_eq!(session.device_id, "laptop");
        assert!(session.was_skipped);
    }

    #[test]
    fn test_learning_type_serialization() {
        let json = serde_json::to_string(&LearningType::AbTesting).unwrap();
        assert_eq!(json, "\"ab_testing\"");
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(LearningQuality::from_session_count(0), LearningQuality::Minimal);
        assert_eq!(LearningQuality::from_session_count(9), LearningQuality::Minimal);
        assert_eq!(LearningQuality::from_session_count(10), LearningQuality::Basic);
        assert_eq!(LearningQuality::from_session_count(49), LearningQuality::Basic);
        assert_eq!(LearningQuality::from_session_count(50), LearningQuality::Good);
        assert_eq!(LearningQuality::from_session_count(99), LearningQuality::Good);
        assert_eq!(
            LearningQuality::from_session_count(100),
            LearningQuality::Excellent
        );
    }
}
