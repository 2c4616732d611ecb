//! Text helpers shared by extraction, pattern application and preference metrics
//!
//! Everything here works on whitespace-separated words. Matching is
//! case-insensitive and diacritic-insensitive: text is decomposed (NFD),
//! combining marks are dropped and the rest is lowercased.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Split on whitespace
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Case- and diacritic-folded form used for matching
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercased words with punctuation removed, single-spaced.
///
/// Two phrases with the same compact form differ only in case or punctuation.
pub fn compact(text: &str) -> String {
    let stripped: String = fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the text has no letters or digits at all
pub fn is_punctuation_only(text: &str) -> bool {
    !text.chars().any(char::is_alphanumeric)
}

/// Apostrophes count as word characters so "don" never matches inside "don't"
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '\u{2019}'
}

/// Folded copy of a text with, for every folded byte, the byte range of the
/// source character that produced it.
struct FoldedText {
    folded: String,
    origin: Vec<(usize, usize)>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        for (start, ch) in text.char_indices() {
            let end = start + ch.len_utf8();
            let before = folded.len();
            folded.extend(
                std::iter::once(ch)
                    .nfd()
                    .filter(|c| !is_combining_mark(*c))
                    .flat_map(char::to_lowercase),
            );
            origin.extend(std::iter::repeat_n((start, end), folded.len() - before));
        }
        Self { folded, origin }
    }

    fn starts_char(&self, idx: usize) -> bool {
        idx == 0 || self.origin[idx - 1].0 != self.origin[idx].0
    }

    fn ends_char(&self, idx: usize) -> bool {
        idx == self.folded.len() || self.origin[idx].0 != self.origin[idx - 1].0
    }
}

/// Replace every whole-word, case/diacritic-insensitive occurrence of `from`.
///
/// Returns the new text and the number of replacements made.
pub fn replace_folded(text: &str, from: &str, to: &str) -> (String, usize) {
    let needle = fold(from.trim());
    if needle.is_empty() || text.is_empty() {
        return (text.to_string(), 0);
    }

    let index = FoldedText::new(text);
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut pos = 0;

    while let Some(found) = index.folded[pos..].find(&needle) {
        let fs = pos + found;
        let fe = fs + needle.len();

        if index.starts_char(fs) && index.ends_char(fe) {
            let start = index.origin[fs].0;
            let end = index.origin[fe - 1].1;
            let first = text[start..end].chars().next();
            let last = text[start..end].chars().next_back();
            let before = text[..start].chars().next_back();
            let after = text[end..].chars().next();

            let open = !(before.is_some_and(is_word_char) && first.is_some_and(is_word_char));
            let close = !(after.is_some_and(is_word_char) && last.is_some_and(is_word_char));

            if open && close {
                ranges.push((start, end));
                pos = fe;
                continue;
            }
        }

        // Advance one folded character and keep looking
        pos = fs
            + index.folded[fs..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }

    if ranges.is_empty() {
        return (text.to_string(), 0);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in &ranges {
        out.push_str(&text[cursor..start]);
        out.push_str(to);
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    (out, ranges.len())
}
