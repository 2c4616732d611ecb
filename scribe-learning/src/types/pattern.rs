//! Learned phrase substitutions and their confidence lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RefinementMode;
use crate::text::fold;

pub type PatternId = Uuid;

/// Confidence assigned on the first observation
pub const INITIAL_CONFIDENCE: f64 = 0.3;
/// Confidence gained on each repeat observation
pub const CONFIDENCE_STEP: f64 = 0.1;
/// Observations needed before a pattern is served as active
pub const MIN_OCCURRENCES: u32 = 3;
/// Confidence a pattern must exceed to be applied
pub const READY_CONFIDENCE: f64 = 0.5;
/// Transient bonus when the pattern was learned under the current mode
pub const MODE_MATCH_BONUS: f64 = 0.1;

/// A phrase-level edit between AI output and the user's final text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhraseChange {
    pub original: String,
    pub corrected: String,
}

impl PhraseChange {
    pub fn new(original: impl Into<String>, corrected: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            corrected: corrected.into(),
        }
    }
}

/// A literal phrase substitution the user has made repeatedly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub id: PatternId,
    pub user_id: Option<String>,
    pub original_phrase: String,
    pub corrected_phrase: String,
    pub occurrence_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub refinement_mode: RefinementMode,
    pub confidence: f64,
    pub is_active: bool,
}

impl LearnedPattern {
    /// First observation of a correction
    pub fn new(user_id: Option<String>, change: &PhraseChange, mode: RefinementMode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            original_phrase: change.original.clone(),
            corrected_phrase: change.corrected.clone(),
            occurrence_count: 1,
            first_seen: now,
            last_seen: now,
            refinement_mode: mode,
            confidence: INITIAL_CONFIDENCE,
            is_active: true,
        }
    }

    /// Whether this row is the stored form of `change`.
    ///
    /// Originals compare case/diacritic-folded since they are matched that way;
    /// corrections compare exactly.
    pub fn same_key(&self, change: &PhraseChange) -> bool {
        self.corrected_phrase == change.corrected
            && fold(&self.original_phrase) == fold(&change.original)
    }

    /// Record a repeat observation
    pub fn reinforce(&mut self) {
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        self.confidence = step_confidence(self.confidence);
        self.last_seen = Utc::now();
    }

    /// Confidence used to decide eligibility for `mode`, bonus included
    pub fn effective_confidence(&self, mode: RefinementMode) -> f64 {
        let bonus = if self.refinement_mode == mode {
            MODE_MATCH_BONUS
        } else {
            0.0
        };
        clamp_confidence(self.confidence + bonus)
    }

    /// Served by the store: active and seen often enough
    pub fn is_established(&self) -> bool {
        self.is_active && self.occurrence_count >= MIN_OCCURRENCES
    }

    /// Eligible for application under `mode`
    pub fn is_ready_for(&self, mode: RefinementMode) -> bool {
        self.is_established() && self.effective_confidence(mode) > READY_CONFIDENCE
    }

    /// Repair values that arrived out of range from storage
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self.occurrence_count = self.occurrence_count.max(1);
        self
    }
}

/// Clamp to [0, 1], mapping NaN to the initial confidence
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return INITIAL_CONFIDENCE;
    }
    value.clamp(0.0, 1.0)
}

// Rounded to hundredths so repeated steps land exactly on 0.4, 0.5, ... 1.0.
fn step_confidence(current: f64) -> f64 {
    let next = clamp_confidence(current + CONFIDENCE_STEP);
    (next * 100.0).round() / 100.0
}
