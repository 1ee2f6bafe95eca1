//! Snippet checks against a resolved record

use evidence_identifiers::Identifier;
use serde::{Deserialize, Serialize};

use crate::domain::{CachedRecord, EvidenceSnippet, SnippetSuggestion, TierName};
use crate::snippets::{suggest_for_snippet, validate_snippet, ScoringPolicy};

/// Whether a curator snippet is backed by the text of its reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCheck {
    pub identifier: Identifier,
    /// Tier that produced the document
    pub tier: Option<TierName>,
    pub in_abstract: bool,
    pub in_full_text: bool,
    pub substantiated: bool,
    /// Replacement candidates; empty when the snippet is substantiated
    pub suggestions: Vec<SnippetSuggestion>,
}

/// Check a snippet against a record's abstract, then its full text.
///
/// Suggestions come from the full text, or the abstract when no full text
/// was extracted.
pub fn check_record(
    record: &CachedRecord,
    snippet: &EvidenceSnippet,
    policy: &ScoringPolicy,
) -> EvidenceCheck {
    let in_abstract = record
        .abstract_text
        .as_deref()
        .is_some_and(|text| validate_snippet(&snippet.text, text));
    let in_full_text = !in_abstract
        && record
            .extracted_text
            .as_deref()
            .is_some_and(|text| validate_snippet(&snippet.text, text));
    let substantiated = in_abstract || in_full_text;

    let suggestions = match (substantiated, record.reference_text()) {
        (false, Some(text)) => suggest_for_snippet(snippet, text, policy),
        _ => Vec::new(),
    };

    if !substantiated {
        tracing::info!(
            "Snippet not found in {} ({} suggestions)",
            record.identifier,
            suggestions.len()
        );
    }

    EvidenceCheck {
        identifier: record.identifier.clone(),
        tier: Some(record.pdf_source_tier),
        in_abstract,
        in_full_text,
        substantiated,
        suggestions,
    }
}
