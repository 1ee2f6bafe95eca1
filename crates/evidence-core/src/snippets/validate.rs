//! Snippet substantiation check

use super::normalize::{normalize_text, snippet_fragments};

/// Minimum normalized Levenshtein similarity for a near-verbatim window
pub const NEAR_VERBATIM_SIMILARITY: f64 = 0.95;

/// Whether `snippet` is substantiated by `reference_text`.
///
/// Both sides are normalized; the snippet's ellipsis-separated fragments must
/// each appear in the text, in order. A fragment that is not contained
/// verbatim may still match a word window of the same length starting at the
/// fragment's first word with similarity of at least
/// [`NEAR_VERBATIM_SIMILARITY`].
pub fn validate_snippet(snippet: &str, reference_text: &str) -> bool {
    let fragments = snippet_fragments(snippet);
    if fragments.is_empty() {
        return false;
    }
    let text = normalize_text(reference_text);
    if text.is_empty() {
        return false;
    }

    let mut cursor = 0;
    for fragment in &fragments {
        match find_fragment(&text, fragment, cursor) {
            Some(end) => cursor = end,
            None => return false,
        }
    }
    true
}

/// Byte offset just past the fragment's match at or after `from`
fn find_fragment(text: &str, fragment: &str, from: usize) -> Option<usize> {
    if let Some(pos) = text[from..].find(fragment) {
        return Some(from + pos + fragment.len());
    }
    find_near_verbatim(text, fragment, from)
}

fn find_near_verbatim(text: &str, fragment: &str, from: usize) -> Option<usize> {
    let fragment_words: Vec<&str> = fragment.split(' ').collect();
    let first = *fragment_words.first()?;
    let words = word_spans(text);

    words
        .iter()
        .enumerate()
        .filter(|(_, (start, word))| *start >= from && *word == first)
        .find_map(|(i, (start, _))| {
            let last = words.get(i + fragment_words.len() - 1)?;
            let end = last.0 + last.1.len();
            let window = &text[*start..end];
            (strsim::normalized_levenshtein(window, fragment) >= NEAR_VERBATIM_SIMILARITY)
                .then_some(end)
        })
}

/// Words of a normalized text with their byte offsets
fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for word in text.split(' ') {
        spans.push((offset, word));
        offset += word.len() + 1;
    }
    spans
}
