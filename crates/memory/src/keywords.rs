//! Keyword extraction for the long-term archive.
//!
//! This is a lossy index: lower-cased whitespace tokens of at
//! least four characters, minus a fixed stop-word list. No stemming, no
//! punctuation stripping, no ranking.

pub const MIN_KEYWORD_CHARS: usize = 4;
pub const MAX_KEYWORDS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "to", "for", "of", "and", "or", "in", "on", "at",
    "by",
];

fn is_keyword(token: &str) -> bool {
    token.chars().count() >= MIN_KEYWORD_CHARS && !STOP_WORDS.contains(&token)
}

/// Unique keywords in first-seen order, all of them.
pub fn terms(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in text.to_lowercase().split_whitespace() {
        if is_keyword(token) && !out.iter().any(|t| t == token) {
            out.push(token.to_string());
        }
    }
    out
}

/// Keywords stored with an archive entry: [`terms`] capped at ten.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords = terms(text);
    keywords.truncate(MAX_KEYWORDS);
    keywords
}
