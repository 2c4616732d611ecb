//! Whether to ask the user for feedback after a transcription

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Shortest text, in words, worth an edit review
pub const MIN_EDIT_REVIEW_WORDS: usize = 20;

/// Sessions before edit reviews become occasional
pub const BOOTSTRAP_SESSIONS: u64 = 10;

/// Sessions after which short texts stop triggering A/B prompts
pub const AB_TESTING_SESSION_LIMIT: u64 = 50;

/// Chance of an edit review once bootstrapped
pub const DEFAULT_EDIT_REVIEW_PROBABILITY: f64 = 0.2;

/// Which feedback prompt, if any, to show for a completed transcription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    EditReview,
    AbTesting,
    None,
}

/// Pure decision function over word and session counts.
///
/// Holds no mutable state, so overlapping transcriptions can decide
/// concurrently.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    enabled: bool,
    edit_review_probability: f64,
}

impl DecisionEngine {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            edit_review_probability: DEFAULT_EDIT_REVIEW_PROBABILITY,
        }
    }

    /// Override the post-bootstrap edit review rate, clamped to [0, 1]
    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.edit_review_probability = if probability.is_nan() {
            DEFAULT_EDIT_REVIEW_PROBABILITY
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn decide(&self, word_count: usize, session_count: u64) -> Decision {
        self.decide_with_rng(word_count, session_count, &mut rand::thread_rng())
    }

    pub fn decide_with_rng<R: Rng + ?Sized>(
        &self,
        word_count: usize,
        session_count: u64,
        rng: &mut R,
    ) -> Decision {
        if !self.enabled {
            return Decision::None;
        }

        if word_count < MIN_EDIT_REVIEW_WORDS {
            return if session_count < AB_TESTING_SESSION_LIMIT {
                Decision::AbTesting
            } else {
                Decision::None
            };
        }

        if session_count < BOOTSTRAP_SESSIONS || rng.gen_bool(self.edit_review_probability) {
            Decision::EditReview
        } else {
            Decision::None
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(true)
    }
}
