//! Evidence snippets and suggested replacements

use serde::{Deserialize, Serialize};

/// A curator-supplied quotation asserted to be supported by a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    /// Organism the evidence is about (e.g. "Acidithiobacillus ferrooxidans")
    pub organism_context: Option<String>,
    /// Extra terms that make a sentence relevant (e.g. "iron", "oxidation")
    pub keyword_context: Vec<String>,
}

impl EvidenceSnippet {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            organism_context: None,
            keyword_context: Vec::new(),
        }
    }

    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism_context = Some(organism.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyword_context = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Coarse relevance classification of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

/// Scoring feature that contributed to a suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "feature", content = "value", rename_all = "snake_case")]
pub enum RationaleFeature {
    /// Full organism name present
    OrganismName,
    /// Genus present without the full name
    OrganismGenus,
    /// Species epithet present without the full name
    OrganismEpithet,
    Keyword(String),
    Percentage,
    /// Concentration unit or pH value
    Concentration,
    ReportingVerb,
    /// Neither the first nor the last candidate sentence
    InteriorSentence,
    GenericPhrase,
    AuthorList,
}

/// Ranked replacement candidate for an unsubstantiated snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetSuggestion {
    pub candidate_text: String,
    pub score: f64,
    pub confidence_bucket: ConfidenceBucket,
    pub rationale_features: Vec<RationaleFeature>,
}
