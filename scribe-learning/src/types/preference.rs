//! Scalar personalization axes folded from edit deltas

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ceiling on a single update's influence
pub const MAX_FOLD_WEIGHT: f64 = 0.3;

/// One personalization axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceType {
    /// Positive prefers formal wording
    Formality,
    /// Positive prefers shorter text
    Conciseness,
    /// Positive prefers contracted forms
    Contractions,
    /// Positive prefers heavier punctuation
    Punctuation,
}

impl PreferenceType {
    pub const ALL: [PreferenceType; 4] = [
        PreferenceType::Formality,
        PreferenceType::Conciseness,
        PreferenceType::Contractions,
        PreferenceType::Punctuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceType::Formality => "formality",
            PreferenceType::Conciseness => "conciseness",
            PreferenceType::Contractions => "contractions",
            PreferenceType::Punctuation => "punctuation",
        }
    }
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated preference value for one axis, in [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub id: Uuid,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub preference_type: PreferenceType,
    pub value: f64,
    pub sample_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl UserPreference {
    pub fn new(user_id: Option<String>, preference_type: PreferenceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            preference_type,
            value: 0.0,
            sample_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Fold one observed delta into the running estimate.
    ///
    /// `value = value * (1 - w) + delta * w` with `w = min(0.3, 1 / (samples + 1))`,
    /// clamped to [-1, 1].
    pub fn fold(&mut self, delta: f64) {
        let delta = if delta.is_nan() { 0.0 } else { delta };
        let w = fold_weight(self.sample_count);
        self.value = clamp_preference(self.value * (1.0 - w) + delta * w);
        self.sample_count = self.sample_count.saturating_add(1);
        self.last_updated = Utc::now();
    }

    /// Repair values that arrived out of range from storage
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.value = clamp_preference(self.value);
        self
    }
}

/// Weight of the next sample given how many have been folded already
pub fn fold_weight(sample_count: u32) -> f64 {
    (1.0 / (f64::from(sample_count) + 1.0)).min(MAX_FOLD_WEIGHT)
}

/// Clamp to [-1, 1], mapping NaN to neutral
pub fn clamp_preference(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_weight_ceiling() {
        assert_eq!(fold_weight(0), 0.3);
        assert_eq!(fold_weight(1), 0.3);
        assert_eq!(fold_weight(2), 0.3);
        assert!((fold_weight(3) - 0.25).abs() < 1e-12);
        assert!((fold_weight(9) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_fold_matches_weighted_average() {
        let mut pref = UserPreference::new(None, PreferenceType::Formality);
        pref.fold(1.0);
        assert!((pref.value - 0.3).abs() < 1e-12);
        assert_eq!(pref.sample_count, 1);

        pref.fold(1.0);
        // 0.3 * 0.7 + 1.0 * 0.3
        assert!((pref.value - 0.51).abs() < 1e-12);

        pref.sample_count = 9;
        pref.fold(-1.0);
        // 0.51 * 0.9 - 0.1
        assert!((pref.value - 0.359).abs() < 1e-12);
    }

    #[test]
    fn test_fold_stays_in_range() {
        let mut pref = UserPreference::new(None, PreferenceType::Punctuation);
        for i in 0..200 {
            let delta = if i % 3 == 0 { 50.0 } else { -75.0 };
            pref.fold(delta);
            assert!((-1.0..=1.0).contains(&pref.value));
        }
    }

    #[test]
    fn test_fold_ignores_nan() {
        let mut pref = UserPreference::new(None, PreferenceType::Conciseness);
        pref.value = 0.5;
        pref.fold(f64::NAN);
        assert!((pref.value - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_type_serializes_as_type_field() {
        let pref = UserPreference::new(Some("alex".into()), PreferenceType::Contractions);
        let json = serde_json::to_value(&pref).unwrap();
        assert_eq!(json["type"], "contractions");
    }
}
