//! Phrase lexicons scanned in inbound user messages.
//!
//! Matching is a plain lower-cased substring test, so "thanks" hits "thank"
//! and "building" hits "build".

pub const PRAISE_MARKERS: &[&str] = &["thank", "awesome", "great job"];

pub const CREATIVE_MARKERS: &[&str] = &["creative", "build", "create"];

pub const FRUSTRATION_MARKERS: &[&str] = &["ugh", "annoying", "doesn't work"];

pub const EXCITEMENT_MARKERS: &[&str] = &["awesome", "cool", "nice"];

/// True if any marker occurs in `text`, ignoring case.
pub fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_case_insensitive_substrings() {
        assert!(contains_any("THANKS a lot", PRAISE_MARKERS));
        assert!(contains_any("help me build a CLI", CREATIVE_MARKERS));
        assert!(contains_any("Ugh, it Doesn't Work", FRUSTRATION_MARKERS));
        assert!(!contains_any("list the files", PRAISE_MARKERS));
    }
}
