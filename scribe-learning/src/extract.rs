//! Phrase-level change extraction between AI output and the user's final text
//!
//! Words are aligned with a Myers diff on their folded, punctuation-free form,
//! so an inserted or deleted word does not shift every later comparison.
//! Each non-equal hunk becomes one or more [`PhraseChange`]s:
//!
//! - small replacements (up to three words a side) become a single change
//! - larger replacements are walked position by position inside the hunk,
//!   emitting one to three word windows at every mismatched index
//! - pure insertions and deletions borrow neighbouring words so that neither
//!   side of the change is empty
//!
//! Only [significant](is_significant) changes are worth learning from.

use std::collections::HashSet;
use std::ops::Range;

use similar::{Algorithm, DiffTag, capture_diff_slices};

use crate::text::{compact, is_punctuation_only, tokenize};
use crate::types::PhraseChange;

/// Longest phrase, in words, considered as a single substitution
pub const MAX_PHRASE_WORDS: usize = 3;

/// Most context words borrowed to anchor an insertion or deletion
const MAX_ANCHOR_WORDS: usize = 2;

/// Shortest phrase, in characters, that can carry a correction
const MIN_PHRASE_CHARS: usize = 3;

/// All candidate changes between `before` and `after`, in text order, deduplicated
pub fn extract_changes(before: &str, after: &str) -> Vec<PhraseChange> {
    let old = tokenize(before);
    let new = tokenize(after);
    let old_keys: Vec<String> = old.iter().map(|w| compact(w)).collect();
    let new_keys: Vec<String> = new.iter().map(|w| compact(w)).collect();

    let aligned = Aligned {
        old: &old,
        new: &new,
        old_keys: &old_keys,
        new_keys: &new_keys,
    };

    let mut changes = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys) {
        let (tag, o, n) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {}
            DiffTag::Replace if o.len() <= MAX_PHRASE_WORDS && n.len() <= MAX_PHRASE_WORDS => {
                changes.push(aligned.change(o, n));
            }
            DiffTag::Replace => aligned.windows(o, n, &mut changes),
            DiffTag::Delete | DiffTag::Insert => {
                if let Some(change) = aligned.anchored(o, n) {
                    changes.push(change);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    changes.retain(|c| seen.insert(c.clone()));
    changes
}

/// Changes worth passing to the pattern store
pub fn significant_changes(before: &str, after: &str) -> Vec<PhraseChange> {
    extract_changes(before, after)
        .into_iter()
        .filter(is_significant)
        .collect()
}

/// A change is significant when both phrases are longer than two characters,
/// neither is punctuation alone, and they still differ once case and
/// punctuation are ignored.
pub fn is_significant(change: &PhraseChange) -> bool {
    let original = change.original.trim();
    let corrected = change.corrected.trim();

    if original.chars().count() < MIN_PHRASE_CHARS || corrected.chars().count() < MIN_PHRASE_CHARS
    {
        return false;
    }
    if is_punctuation_only(original) || is_punctuation_only(corrected) {
        return false;
    }
    compact(original) != compact(corrected)
}

struct Aligned<'a> {
    old: &'a [&'a str],
    new: &'a [&'a str],
    old_keys: &'a [String],
    new_keys: &'a [String],
}

impl Aligned<'_> {
    fn change(&self, o: Range<usize>, n: Range<usize>) -> PhraseChange {
        PhraseChange::new(self.old[o].join(" "), self.new[n].join(" "))
    }

    /// Position-aligned windows inside a large replacement hunk
    fn windows(&self, o: Range<usize>, n: Range<usize>, out: &mut Vec<PhraseChange>) {
        let shared = o.len().min(n.len());
        for i in 0..shared {
            if self.old_keys[o.start + i] == self.new_keys[n.start + i] {
                continue;
            }
            for width in 1..=MAX_PHRASE_WORDS {
                if i + width > shared {
                    break;
                }
                let oi = o.start + i..o.start + i + width;
                let ni = n.start + i..n.start + i + width;
                if self.old_keys[oi.clone()] != self.new_keys[ni.clone()] {
                    out.push(self.change(oi, ni));
                }
            }
        }
    }

    /// Extend an insertion or deletion with neighbouring words.
    ///
    /// Prefers the following words, falls back to the preceding ones at the end
    /// of the text, and grows until both sides are long enough to be learned.
    fn anchored(&self, o: Range<usize>, n: Range<usize>) -> Option<PhraseChange> {
        let after = (self.old.len() - o.end).min(self.new.len() - n.end);
        let before = o.start.min(n.start);

        let mut candidate = None;
        for k in 1..=MAX_ANCHOR_WORDS {
            let (oi, ni) = if after >= k {
                (o.start..o.end + k, n.start..n.end + k)
            } else if before >= k {
                (o.start - k..o.end, n.start - k..n.end)
            } else {
                break;
            };
            let change = self.change(oi, ni);
            let long_enough = change.original.chars().count() >= MIN_PHRASE_CHARS
                && change.corrected.chars().count() >= MIN_PHRASE_CHARS;
            candidate = Some(change);
            if long_enough {
                break;
            }
        }
        candidate
    }
}
