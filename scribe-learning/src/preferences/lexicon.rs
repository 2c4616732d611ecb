//! Fixed phrase dictionaries behind the preference metrics and adjustments

use regex::{Captures, Regex};

/// Connectives that mark formal register
pub const FORMAL_WORDS: &[&str] = &[
    "therefore",
    "however",
    "furthermore",
    "moreover",
    "consequently",
    "nevertheless",
    "accordingly",
    "additionally",
    "regarding",
    "hence",
    "thus",
    "whereas",
    "sincerely",
    "kindly",
];

/// Fillers and slang that mark casual register
pub const CASUAL_WORDS: &[&str] = &[
    "like",
    "just",
    "really",
    "basically",
    "literally",
    "totally",
    "pretty",
    "gonna",
    "wanna",
    "gotta",
    "kinda",
    "sorta",
    "yeah",
    "hey",
    "ok",
    "okay",
    "stuff",
    "cool",
    "awesome",
];

/// `(casual, formal)` phrase pairs, swapped in either direction
const REGISTER_PAIRS: &[(&str, &str)] = &[
    ("gonna", "going to"),
    ("wanna", "want to"),
    ("gotta", "have to"),
    ("kinda", "somewhat"),
    ("yeah", "yes"),
    ("hey", "hello"),
    ("thanks", "thank you"),
    ("asap", "as soon as possible"),
    ("fyi", "for your information"),
    ("lots of", "many"),
    ("figure out", "determine"),
    ("help out", "assist"),
];

/// Lead-in phrases removed when the user prefers concise text, longest first
const FILLER_LEAD_INS: &[&str] = &[
    "just to let you know,",
    "at the end of the day,",
    "as a matter of fact,",
    "i just wanted to say that",
    "to be honest,",
    "i think that",
    "basically,",
    "honestly,",
    "you know,",
    "i mean,",
    "actually,",
];

/// `(expanded, contracted)` pairs
const CONTRACTION_PAIRS: &[(&str, &str)] = &[
    ("do not", "don't"),
    ("does not", "doesn't"),
    ("did not", "didn't"),
    ("cannot", "can't"),
    ("will not", "won't"),
    ("would not", "wouldn't"),
    ("should not", "shouldn't"),
    ("could not", "couldn't"),
    ("is not", "isn't"),
    ("are not", "aren't"),
    ("was not", "wasn't"),
    ("were not", "weren't"),
    ("have not", "haven't"),
    ("has not", "hasn't"),
    ("had not", "hadn't"),
    ("i am", "i'm"),
    ("you are", "you're"),
    ("we are", "we're"),
    ("they are", "they're"),
    ("it is", "it's"),
    ("that is", "that's"),
    ("there is", "there's"),
    ("i will", "i'll"),
    ("you will", "you'll"),
    ("we will", "we'll"),
    ("they will", "they'll"),
    ("i have", "i've"),
    ("you have", "you've"),
    ("we have", "we've"),
    ("they have", "they've"),
    ("i would", "i'd"),
    ("let us", "let's"),
];

/// Contracted suffixes counted by the contraction metric
const CONTRACTION_SUFFIXES: &[&str] = &["n't", "'re", "'ll", "'ve", "'m", "'d"];

/// `'s` forms that are contractions rather than possessives
const S_CONTRACTIONS: &[&str] = &[
    "it's", "that's", "there's", "here's", "let's", "he's", "she's", "what's", "who's", "where's",
];

/// Whether a single word (punctuation and case ignored) is a contraction
pub fn is_contraction(word: &str) -> bool {
    let word = word
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '\u{2019}')
        .replace('\u{2019}', "'")
        .to_lowercase();
    if S_CONTRACTIONS.contains(&word.as_str()) {
        return true;
    }
    CONTRACTION_SUFFIXES
        .iter()
        .any(|suffix| word.len() > suffix.len() && word.ends_with(suffix))
}

/// One whole-phrase, case-insensitive substitution
struct Substitution {
    regex: Regex,
    replacement: &'static str,
}

impl Substitution {
    fn new(from: &str, replacement: &'static str) -> Option<Self> {
        Self::build(from, replacement, "")
    }

    /// Deletes the phrase along with the whitespace that follows it
    fn removal(from: &str) -> Option<Self> {
        Self::build(from, "", r"\s*")
    }

    fn build(from: &str, replacement: &'static str, trailing: &str) -> Option<Self> {
        // Apostrophes in the source may be typographic
        let pattern = regex::escape(from).replace('\'', "['\u{2019}]");
        // Word boundaries only where the phrase edge is a word character
        let open = if from.starts_with(char::is_alphanumeric) { r"\b" } else { "" };
        let close = if from.ends_with(char::is_alphanumeric) { r"\b" } else { "" };
        let regex = Regex::new(&format!(r"(?i){open}{pattern}{close}{trailing}")).ok()?;
        Some(Self { regex, replacement })
    }

    fn apply(&self, text: &str) -> (String, usize) {
        let mut count = 0;
        let out = self
            .regex
            .replace_all(text, |caps: &Captures<'_>| {
                count += 1;
                match_case(&caps[0], self.replacement)
            })
            .into_owned();
        (out, count)
    }
}

/// Keep a leading capital from the matched text
fn match_case(matched: &str, replacement: &str) -> String {
    if matched.chars().next().is_some_and(char::is_uppercase) {
        capitalize_first(replacement)
    } else {
        replacement.to_string()
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn compile<'a>(pairs: impl Iterator<Item = (&'a str, &'static str)>) -> Vec<Substitution> {
    pairs
        .filter_map(|(from, to)| Substitution::new(from, to))
        .collect()
}

/// Compiled substitution tables
pub struct Lexicon {
    to_formal: Vec<Substitution>,
    to_casual: Vec<Substitution>,
    contract: Vec<Substitution>,
    expand: Vec<Substitution>,
    lead_ins: Vec<Substitution>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            to_formal: compile(REGISTER_PAIRS.iter().map(|&(c, f)| (c, f))),
            to_casual: compile(REGISTER_PAIRS.iter().map(|&(c, f)| (f, c))),
            contract: compile(CONTRACTION_PAIRS.iter().map(|&(e, c)| (e, c))),
            expand: compile(CONTRACTION_PAIRS.iter().map(|&(e, c)| (c, e))),
            lead_ins: FILLER_LEAD_INS
                .iter()
                .filter_map(|l| Substitution::removal(l))
                .collect(),
        }
    }

    /// Swap casual phrases for formal ones
    pub fn formalize(&self, text: &str) -> (String, usize) {
        run(&self.to_formal, text)
    }

    /// Swap formal phrases for casual ones
    pub fn casualize(&self, text: &str) -> (String, usize) {
        run(&self.to_casual, text)
    }

    pub fn contract(&self, text: &str) -> (String, usize) {
        let (out, count) = run(&self.contract, text);
        (fix_pronoun_i(&out), count)
    }

    pub fn expand(&self, text: &str) -> (String, usize) {
        let (out, count) = run(&self.expand, text);
        (fix_pronoun_i(&out), count)
    }

    /// Remove filler lead-ins, keeping a capital at the start of the text
    pub fn strip_lead_ins(&self, text: &str) -> (String, usize) {
        let (mut out, count) = run(&self.lead_ins, text);
        if count == 0 {
            return (out, 0);
        }
        // A lead-in at the very end leaves the space before it behind
        if !text.ends_with(char::is_whitespace) {
            out.truncate(out.trim_end().len());
        }
        let capitalized = text.trim_start().chars().next().is_some_and(char::is_uppercase);
        if capitalized {
            (capitalize_first(&out), count)
        } else {
            (out, count)
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

fn run(table: &[Substitution], text: &str) -> (String, usize) {
    table.iter().fold((text.to_string(), 0), |(text, total), sub| {
        let (out, count) = sub.apply(&text);
        (out, total + count)
    })
}

/// The contraction tables are lowercase; the pronoun is always capitalized
fn fix_pronoun_i(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in text.split(' ') {
        let plain = word.replace('\u{2019}', "'");
        let fixed = if plain == "i"
            || ["i'm", "i'll", "i've", "i'd"].iter().any(|f| plain.starts_with(f))
        {
            let mut chars = word.chars();
            chars.next();
            format!("I{}", chars.as_str())
        } else {
            word.to_string()
        };
        words.push(fixed);
    }
    words.join(" ")
}
