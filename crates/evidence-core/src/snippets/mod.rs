//! Snippet validation and suggestion
//!
//! Pure functions over (snippet, reference text); nothing here touches the
//! network or the cache.

mod normalize;
mod suggest;
mod validate;

pub use normalize::{normalize_text, snippet_fragments};
pub use suggest::{
    clean_candidate, snippet_keywords, split_sentences, suggest_snippets, ScoringPolicy,
    ScoringWeights,
};
pub use validate::{validate_snippet, NEAR_VERBATIM_SIMILARITY};

use crate::domain::{EvidenceSnippet, SnippetSuggestion};

/// Suggest replacements for a curator snippet.
///
/// The snippet's own salient words extend its keyword context.
pub fn suggest_for_snippet(
    snippet: &EvidenceSnippet,
    reference_text: &str,
    policy: &ScoringPolicy,
) -> Vec<SnippetSuggestion> {
    let mut keywords = snippet.keyword_context.clone();
    keywords.extend(snippet_keywords(&snippet.text));
    suggest_snippets(
        snippet.organism_context.as_deref(),
        &keywords,
        reference_text,
        policy,
    )
}
