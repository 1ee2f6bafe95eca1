//! Text normalization shared by validation and keyword extraction

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Three or more dots; NFKC has already turned `…` into `...`
    static ref ELLIPSIS: Regex = Regex::new(r"\.{3,}").unwrap();
}

/// NFKC, lowercase, punctuation to space, collapsed whitespace.
///
/// Works char by char so normalizing a slice of a text yields a substring
/// of the normalized text.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a snippet on truncation ellipses into normalized fragments.
///
/// Leading and trailing ellipses only mark truncation, so they produce no
/// fragment; empty fragments are dropped.
pub fn snippet_fragments(snippet: &str) -> Vec<String> {
    let composed: String = snippet.nfkc().collect();
    ELLIPSIS
        .split(&composed)
        .map(normalize_text)
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("  Fe(II)-oxidizing\n\tbacteria,  grew!  "),
            "fe ii oxidizing bacteria grew"
        );
        assert_eq!(normalize_text("ﬁxation"), "fixation");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn test_snippet_fragments() {
        assert_eq!(
            snippet_fragments("...oxidized ferrous iron... at pH 2…"),
            vec!["oxidized ferrous iron", "at ph 2"]
        );
        assert_eq!(snippet_fragments("plain text."), vec!["plain text"]);
        assert!(snippet_fragments(" … ").is_empty());
    }
}
