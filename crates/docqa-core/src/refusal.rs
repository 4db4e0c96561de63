//! Detection of "the context does not contain the answer" responses.
//!
//! The generation model is instructed to say so when the retrieved
//! context lacks the answer. When it does, the answer must not be shown
//! with citations. [`RefusalClassifier`] decides this with a
//! case-insensitive match against an explicit phrase list; typographic
//! apostrophes are folded to `'` first so "couldn’t find" matches
//! "couldn't find".
//!
//! Detection is lexical only. An answer that declines in wording not on
//! the list is treated as substantive.

/// Phrases that mark an answer as a refusal.
pub const DEFAULT_REFUSAL_PHRASES: &[&str] = &[
    "couldn't find",
    "could not find",
    "does not contain",
    "doesn't contain",
    "not mentioned",
    "no information",
    "unable to find",
    "context does not provide",
    "not provided in the context",
];

#[derive(Debug, Clone)]
pub struct RefusalClassifier {
    phrases: Vec<String>,
}

impl Default for RefusalClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_REFUSAL_PHRASES.iter().copied())
    }
}

impl RefusalClassifier {
    /// Build a classifier from trigger phrases. Blank phrases are ignored.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.trim().is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Returns true when `answer` states that no relevant information was found.
    pub fn is_refusal(&self, answer: &str) -> bool {
        let haystack = normalize(answer);
        self.phrases.iter().any(|p| haystack.contains(p.as_str()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}
