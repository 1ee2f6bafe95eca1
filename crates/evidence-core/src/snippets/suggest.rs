//! Ranked replacement snippets from reference text

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{ConfidenceBucket, RationaleFeature, SnippetSuggestion};
use crate::error::ConfigError;

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+\s+").unwrap();

    static ref EMAIL: Regex = Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+|@").unwrap();
    static ref COPYRIGHT: Regex = Regex::new(
        r"(?i)©|\(c\)\s*\d{4}|\bcopyright\b|all rights reserved|^published by|^author information|^(?:19|20)\d{2}\s+[A-Z]"
    ).unwrap();
    static ref IDENTIFIER_LINE: Regex = Regex::new(r"(?i)^(?:doi|pmid):").unwrap();

    static ref AUTHOR_AFFILIATION: Regex = Regex::new(r"[A-Z][a-z]+\s+[A-Z]{1,4}\(\d+\)").unwrap();
    static ref AUTHOR_INITIALS: Regex = Regex::new(r"^[A-Z][a-z]+\s+[A-Z]{1,3}(?:,|$)").unwrap();
    static ref AFFILIATION_MARK: Regex = Regex::new(r"^\(\d+\)").unwrap();
    static ref ET_AL: Regex = Regex::new(r"(?i)\bet al\b").unwrap();

    static ref PERCENTAGE: Regex = Regex::new(r"\d+(?:\.\d+)?\s*%").unwrap();
    static ref CONCENTRATION: Regex = Regex::new(
        r"\d+(?:\.\d+)?\s*(?:mM|µM|μM|nM|mg/L|g/L|mg/l|g/l|mol/L)\b|\bpH\s*\d"
    ).unwrap();

    static ref NUMERIC_CITATION: Regex = Regex::new(r"\s*\[\d+(?:\s*[,–-]\s*\d+)*\]").unwrap();
    static ref KEYWORD_WORD: Regex = Regex::new(r"\b[[:alpha:]]{4,}\b").unwrap();
}

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "sp.", "spp.", "nov.", "et al.", "e.g.", "i.e.", "fig.", "figs.", "vs.", "ca.", "approx.",
];

const GENERIC_TERMS: &[&str] = &["paper", "study", "review", "article", "here we", "in this"];

const REPORTING_VERBS: &[&str] = &[
    "showed",
    "demonstrated",
    "observed",
    "found",
    "indicated",
    "revealed",
    "exhibited",
    "contained",
    "produced",
    "reduced",
    "oxidized",
    "catalyzed",
    "dominated",
    "enriched",
];

const STOP_WORDS: &[&str] = &["that", "with", "from", "this", "were", "have", "been", "which"];

/// Score contributions of each feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub organism_name: f64,
    pub organism_genus: f64,
    pub organism_epithet: f64,
    pub keyword: f64,
    pub percentage: f64,
    pub concentration: f64,
    pub reporting_verb: f64,
    pub interior_sentence: f64,
    /// Subtracted for generic phrasing
    pub generic_penalty: f64,
    /// Subtracted for author-list patterns
    pub author_list_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            organism_name: 5.0,
            organism_genus: 2.0,
            organism_epithet: 1.0,
            keyword: 1.0,
            percentage: 0.5,
            concentration: 0.5,
            reporting_verb: 0.5,
            interior_sentence: 0.3,
            generic_penalty: 1.0,
            author_list_penalty: 10.0,
        }
    }
}

/// Tunable thresholds for snippet suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Minimum score for a high-confidence suggestion
    pub high_threshold: f64,
    /// Minimum score for a medium-confidence suggestion
    pub medium_threshold: f64,
    /// Candidate sentence length bounds, in characters
    pub min_sentence_chars: usize,
    pub max_sentence_chars: usize,
    pub max_suggestions: usize,
    pub weights: ScoringWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            high_threshold: 5.0,
            medium_threshold: 2.0,
            min_sentence_chars: 50,
            max_sentence_chars: 500,
            max_suggestions: 3,
            weights: ScoringWeights::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn bucket(&self, score: f64) -> ConfidenceBucket {
        if score >= self.high_threshold {
            ConfidenceBucket::High
        } else if score >= self.medium_threshold {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_threshold <= self.medium_threshold {
            return Err(ConfigError::InvalidThresholds(
                "scoring.high_threshold must be greater than scoring.medium_threshold".to_string(),
            ));
        }
        if self.min_sentence_chars > self.max_sentence_chars {
            return Err(ConfigError::InvalidThresholds(
                "scoring.min_sentence_chars exceeds scoring.max_sentence_chars".to_string(),
            ));
        }
        if self.max_suggestions == 0 {
            return Err(ConfigError::OutOfRange(
                "scoring.max_suggestions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split text into sentences, keeping terminal punctuation and leaving
/// protected abbreviations intact
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let candidate = text[start..m.end()].trim();
        if ends_with_abbreviation(candidate) {
            continue;
        }
        if !candidate.is_empty() {
            sentences.push(candidate);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    ABBREVIATIONS.iter().any(|abbr| {
        lower.strip_suffix(abbr).is_some_and(|before| {
            before
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
        })
    })
}

/// Whether a sentence must never be suggested
fn is_excluded(sentence: &str) -> bool {
    EMAIL.is_match(sentence) || COPYRIGHT.is_match(sentence) || IDENTIFIER_LINE.is_match(sentence)
}

fn is_author_list(sentence: &str) -> bool {
    AUTHOR_AFFILIATION.is_match(sentence)
        || AUTHOR_INITIALS.is_match(sentence)
        || AFFILIATION_MARK.is_match(sentence)
        || ET_AL.is_match(sentence)
}

/// Remove bracketed numeric citations and collapse whitespace
pub fn clean_candidate(sentence: &str) -> String {
    let without_citations = NUMERIC_CITATION.replace_all(sentence, "");
    without_citations.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Salient words of a curator's snippet: four or more letters, stop-words
/// removed, first five distinct
pub fn snippet_keywords(snippet: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for m in KEYWORD_WORD.find_iter(&snippet.to_lowercase()) {
        let word = m.as_str().to_string();
        if STOP_WORDS.contains(&word.as_str()) || keywords.contains(&word) {
            continue;
        }
        keywords.push(word);
        if keywords.len() == 5 {
            break;
        }
    }
    keywords
}

struct OrganismTerms {
    full: String,
    genus: Option<String>,
    epithet: Option<String>,
}

impl OrganismTerms {
    fn parse(organism: &str) -> Option<Self> {
        let lower = organism.trim().to_lowercase();
        let name = lower.strip_prefix("candidatus ").unwrap_or(&lower).trim();
        if name.is_empty() {
            return None;
        }
        let mut parts = name.split_whitespace();
        Some(Self {
            full: parts.clone().collect::<Vec<_>>().join(" "),
            genus: parts.next().map(str::to_string),
            epithet: parts.next().map(str::to_string),
        })
    }
}

fn score_sentence(
    sentence: &str,
    position: usize,
    total: usize,
    organism: Option<&OrganismTerms>,
    keywords: &[String],
    weights: &ScoringWeights,
) -> (f64, Vec<RationaleFeature>) {
    let lower = sentence.to_lowercase();
    let mut score = 0.0;
    let mut features = Vec::new();

    if let Some(terms) = organism {
        if lower.contains(&terms.full) {
            score += weights.organism_name;
            features.push(RationaleFeature::OrganismName);
        } else {
            if terms.genus.as_ref().is_some_and(|g| lower.contains(g.as_str())) {
                score += weights.organism_genus;
                features.push(RationaleFeature::OrganismGenus);
            }
            if terms.epithet.as_ref().is_some_and(|e| lower.contains(e.as_str())) {
                score += weights.organism_epithet;
                features.push(RationaleFeature::OrganismEpithet);
            }
        }
    }

    for keyword in keywords {
        if lower.contains(keyword.as_str()) {
            score += weights.keyword;
            features.push(RationaleFeature::Keyword(keyword.clone()));
        }
    }

    if PERCENTAGE.is_match(sentence) {
        score += weights.percentage;
        features.push(RationaleFeature::Percentage);
    }
    if CONCENTRATION.is_match(sentence) {
        score += weights.concentration;
        features.push(RationaleFeature::Concentration);
    }
    if position > 0 && position + 1 < total {
        score += weights.interior_sentence;
        features.push(RationaleFeature::InteriorSentence);
    }
    if GENERIC_TERMS.iter().any(|t| lower.contains(t)) {
        score -= weights.generic_penalty;
        features.push(RationaleFeature::GenericPhrase);
    }
    if REPORTING_VERBS.iter().any(|v| lower.contains(v)) {
        score += weights.reporting_verb;
        features.push(RationaleFeature::ReportingVerb);
    }
    if is_author_list(sentence) {
        score -= weights.author_list_penalty;
        features.push(RationaleFeature::AuthorList);
    }

    (score, features)
}

/// Rank sentences of `reference_text` as replacement snippets.
///
/// Returns at most `policy.max_suggestions` candidates with positive scores,
/// highest first; equal scores keep their order in the text.
pub fn suggest_snippets(
    organism_context: Option<&str>,
    keyword_context: &[String],
    reference_text: &str,
    policy: &ScoringPolicy,
) -> Vec<SnippetSuggestion> {
    let organism = organism_context.and_then(OrganismTerms::parse);

    let mut keywords: Vec<String> = Vec::new();
    for keyword in keyword_context {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    let candidates: Vec<&str> = split_sentences(reference_text)
        .into_iter()
        .filter(|s| !is_excluded(s))
        .filter(|s| {
            let len = s.chars().count();
            len >= policy.min_sentence_chars && len <= policy.max_sentence_chars
        })
        .collect();

    let total = candidates.len();
    let mut scored: Vec<SnippetSuggestion> = candidates
        .iter()
        .enumerate()
        .filter_map(|(position, sentence)| {
            let (score, rationale_features) = score_sentence(
                sentence,
                position,
                total,
                organism.as_ref(),
                &keywords,
                &policy.weights,
            );
            (score > 0.0).then(|| SnippetSuggestion {
                candidate_text: clean_candidate(sentence),
                score,
                confidence_bucket: policy.bucket(score),
                rationale_features,
            })
        })
        .collect();

    // Stable sort keeps text order among equal scores
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(policy.max_suggestions);
    scored
}
