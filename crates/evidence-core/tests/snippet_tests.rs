//! Snippet validation and suggestion tests

use evidence_core::snippets::{suggest_for_snippet, suggest_snippets, validate_snippet, ScoringPolicy};
use evidence_core::{ConfidenceBucket, EvidenceSnippet, RationaleFeature};
use proptest::prelude::*;

const ARTICLE: &str = "Correspondence: jane.doe@univ.example.edu. \
    Copyright © 2019 Doe, Smith and Lee. \
    Acidophilic bacteria drive metal leaching in mine tailings worldwide and shape drainage chemistry. \
    Acidithiobacillus ferrooxidans oxidized ferrous iron at rates 45% higher than the reference strain [12]. \
    Growth of the consortium was optimal at pH 2.0 with 10 mM ferrous sulfate in batch reactors. \
    In this study we review general aspects of the leaching literature and its open problems. \
    Leptospirillum ferriphilum dominated the biofilm community after twenty days of operation.";

// === Validation ===

#[test]
fn test_verbatim_and_ellipsis_snippets() {
    assert!(validate_snippet(
        "Acidithiobacillus ferrooxidans oxidized ferrous iron",
        ARTICLE
    ));
    assert!(validate_snippet(
        "Acidithiobacillus ferrooxidans oxidized ... than the reference strain",
        ARTICLE
    ));
    assert!(!validate_snippet(
        "than the reference strain ... Acidithiobacillus ferrooxidans oxidized",
        ARTICLE
    ));
    assert!(!validate_snippet("Escherichia coli fermented lactose", ARTICLE));
}

#[test]
fn test_validation_ignores_case_and_punctuation() {
    assert!(validate_snippet(
        "ACIDITHIOBACILLUS FERROOXIDANS, oxidized ferrous-iron",
        ARTICLE
    ));
}

proptest! {
    #[test]
    fn prop_any_substring_validates(start in 0usize..200, len in 20usize..120) {
        let chars: Vec<char> = ARTICLE.chars().collect();
        let start = start.min(chars.len() - 1);
        let end = (start + len).min(chars.len());
        let snippet: String = chars[start..end].iter().collect();
        prop_assume!(snippet.chars().any(|c| c.is_alphanumeric()));
        prop_assert!(validate_snippet(&snippet, ARTICLE));
    }

    #[test]
    fn prop_suggestions_are_bounded_and_sorted(max in 1usize..6) {
        let policy = ScoringPolicy { max_suggestions: max, ..ScoringPolicy::default() };
        let suggestions = suggest_snippets(
            Some("Acidithiobacillus ferrooxidans"),
            &["leaching".to_string(), "biofilm".to_string()],
            ARTICLE,
            &policy,
        );
        prop_assert!(suggestions.len() <= max);
        prop_assert!(suggestions.windows(2).all(|w| w[0].score >= w[1].score));
        prop_assert!(suggestions.iter().all(|s| s.score > 0.0));
    }
}

// === Suggestions ===

#[test]
fn test_organism_sentence_ranks_first() {
    let suggestions = suggest_snippets(
        Some("Acidithiobacillus ferrooxidans"),
        &[],
        ARTICLE,
        &ScoringPolicy::default(),
    );

    let top = &suggestions[0];
    assert_eq!(
        top.candidate_text,
        "Acidithiobacillus ferrooxidans oxidized ferrous iron at rates 45% higher than the reference strain."
    );
    assert_eq!(top.confidence_bucket, ConfidenceBucket::High);
    assert!(top.rationale_features.contains(&RationaleFeature::OrganismName));
    assert!(top.rationale_features.contains(&RationaleFeature::Percentage));
}

#[test]
fn test_contact_and_copyright_lines_never_suggested() {
    let suggestions = suggest_snippets(
        Some("Doe"),
        &["copyright".to_string(), "correspondence".to_string()],
        ARTICLE,
        &ScoringPolicy { max_suggestions: 10, ..ScoringPolicy::default() },
    );
    assert!(suggestions
        .iter()
        .all(|s| !s.candidate_text.contains('@') && !s.candidate_text.contains('©')));
}

#[test]
fn test_equal_scores_keep_text_order() {
    let text = "The first sentence mentions leaching of copper ores in heaps here. \
        The second sentence mentions leaching of nickel ores in heaps too. \
        The third sentence mentions leaching of zinc ores within heaps also.";
    let suggestions = suggest_snippets(
        None,
        &["leaching".to_string()],
        text,
        &ScoringPolicy { max_suggestions: 3, ..ScoringPolicy::default() },
    );
    // Only the middle sentence gets the interior bonus
    assert_eq!(suggestions.len(), 3);
    assert!(suggestions[0].candidate_text.contains("nickel"));
    assert!(suggestions[1].candidate_text.contains("copper"));
    assert!(suggestions[2].candidate_text.contains("zinc"));
}

#[test]
fn test_generic_sentence_is_penalized() {
    let suggestions = suggest_snippets(
        None,
        &["leaching".to_string()],
        ARTICLE,
        &ScoringPolicy { max_suggestions: 10, ..ScoringPolicy::default() },
    );
    let position = |prefix: &str| {
        suggestions
            .iter()
            .position(|s| s.candidate_text.starts_with(prefix))
            .unwrap()
    };
    let generic = &suggestions[position("In this study")];
    assert!(generic.rationale_features.contains(&RationaleFeature::GenericPhrase));
    assert_eq!(generic.confidence_bucket, ConfidenceBucket::Low);
    assert!(position("Acidophilic bacteria") < position("In this study"));
}

#[test]
fn test_snippet_keywords_extend_context() {
    let snippet = EvidenceSnippet::new("the consortium grew in batch reactors");
    let suggestions = suggest_for_snippet(&snippet, ARTICLE, &ScoringPolicy::default());

    assert!(suggestions[0].candidate_text.starts_with("Growth of the consortium"));
    assert_eq!(suggestions[0].confidence_bucket, ConfidenceBucket::Medium);
}
