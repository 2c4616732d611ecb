//! Scalar text metrics feeding the preference deltas

use super::lexicon::{CASUAL_WORDS, FORMAL_WORDS, is_contraction};
use crate::text::{compact, tokenize, word_count};

/// Characters counted as heavy punctuation
const HEAVY_PUNCTUATION: &[char] = &['!', '?', ';', ':', '\u{2014}'];

/// `(formal connectives - casual fillers) / words`
pub fn formality(text: &str) -> f64 {
    let words = tokenize(text);
    if words.is_empty() {
        return 0.0;
    }
    let mut score: i64 = 0;
    for word in &words {
        let key = compact(word);
        if FORMAL_WORDS.contains(&key.as_str()) {
            score += 1;
        } else if CASUAL_WORDS.contains(&key.as_str()) {
            score -= 1;
        }
    }
    score as f64 / words.len() as f64
}

/// Relative shortening from `before` to `after`; positive when the text shrank
pub fn conciseness(before: &str, after: &str) -> f64 {
    let before_words = word_count(before);
    if before_words == 0 {
        return 0.0;
    }
    (before_words as f64 - word_count(after) as f64) / before_words as f64
}

/// Fraction of words that are contractions
pub fn contractions(text: &str) -> f64 {
    let words = tokenize(text);
    if words.is_empty() {
        return 0.0;
    }
    let contracted = words.iter().filter(|w| is_contraction(w)).count();
    contracted as f64 / words.len() as f64
}

/// Heavy punctuation marks per word
pub fn punctuation(text: &str) -> f64 {
    let words = word_count(text);
    if words == 0 {
        return 0.0;
    }
    let marks = text.chars().filter(|c| HEAVY_PUNCTUATION.contains(c)).count();
    marks as f64 / words as f64
}
