//! Resolution records and per-tier diagnostics

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use evidence_identifiers::Identifier;
use serde::{Deserialize, Serialize};

use crate::error::TierError;

/// One named upstream source in the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierName {
    /// Publisher landing page or publisher PDF pattern
    Publisher,
    /// PubMed Central
    OpenAccessRepository,
    /// Unpaywall
    OpenAccessAggregator,
    /// Semantic Scholar
    AcademicSearchIndex,
    /// Configured mirror sites
    FallbackMirror,
    /// Generic web search
    WebSearch,
}

impl TierName {
    /// Cascade order. Fixed for the lifetime of the process.
    pub const CASCADE: [TierName; 6] = [
        TierName::Publisher,
        TierName::OpenAccessRepository,
        TierName::OpenAccessAggregator,
        TierName::AcademicSearchIndex,
        TierName::FallbackMirror,
        TierName::WebSearch,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Publisher => "publisher",
            TierName::OpenAccessRepository => "open_access_repository",
            TierName::OpenAccessAggregator => "open_access_aggregator",
            TierName::AcademicSearchIndex => "academic_search_index",
            TierName::FallbackMirror => "fallback_mirror",
            TierName::WebSearch => "web_search",
        }
    }

    /// Zero-based position in the cascade
    pub fn position(&self) -> usize {
        Self::CASCADE
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::CASCADE.len())
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single tier attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure(TierError),
    /// The tier could not build a request for this identifier
    Skipped(String),
}

/// Diagnostic entry for one tier of one cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub tier: TierName,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

impl TierAttempt {
    pub fn success(tier: TierName, latency: Duration) -> Self {
        Self {
            tier,
            outcome: AttemptOutcome::Success,
            latency,
        }
    }

    pub fn failure(tier: TierName, error: TierError, latency: Duration) -> Self {
        Self {
            tier,
            outcome: AttemptOutcome::Failure(error),
            latency,
        }
    }

    pub fn skipped(tier: TierName, reason: impl Into<String>) -> Self {
        Self {
            tier,
            outcome: AttemptOutcome::Skipped(reason.into()),
            latency: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }

    /// Human-readable failure or skip reason
    pub fn error_reason(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Success => None,
            AttemptOutcome::Failure(e) => Some(e.to_string()),
            AttemptOutcome::Skipped(reason) => Some(reason.clone()),
        }
    }
}

/// Durable record for one resolved identifier.
///
/// Only successful cascades produce a record, so the document URL and its
/// tier are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub identifier: Identifier,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    /// DOI of the work; for PMIDs, the DOI linked in PubMed metadata
    pub doi: Option<String>,
    pub pdf_url: String,
    pub pdf_source_tier: TierName,
    pub pdf_local_path: Option<PathBuf>,
    pub extracted_text: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRecord {
    /// Best available text for snippet work: full text first, then abstract
    pub fn reference_text(&self) -> Option<&str> {
        self.extracted_text
            .as_deref()
            .or(self.abstract_text.as_deref())
    }
}

/// Successful outcome of a resolution call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub record: CachedRecord,
    /// Ordered diagnostics of this call's cascade; empty when served from cache
    pub attempts: Vec<TierAttempt>,
    pub from_cache: bool,
}

impl ResolvedRecord {
    /// Winning tier
    pub fn tier(&self) -> TierName {
        self.record.pdf_source_tier
    }

    /// Document URL produced by the winning tier
    pub fn document_url(&self) -> &str {
        &self.record.pdf_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order() {
        let positions: Vec<usize> = TierName::CASCADE.iter().map(|t| t.position()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(TierName::CASCADE[0], TierName::Publisher);
        assert_eq!(TierName::CASCADE[5], TierName::WebSearch);
    }

    #[test]
    fn test_attempt_reason() {
        let ok = TierAttempt::success(TierName::Publisher, Duration::from_millis(5));
        assert!(ok.is_success());
        assert!(ok.error_reason().is_none());

        let failed = TierAttempt::failure(
            TierName::OpenAccessAggregator,
            TierError::HttpStatus(404),
            Duration::from_millis(5),
        );
        assert_eq!(failed.error_reason().as_deref(), Some("HTTP status 404"));

        let skipped = TierAttempt::skipped(TierName::FallbackMirror, "no mirrors configured");
        assert_eq!(skipped.error_reason().as_deref(), Some("no mirrors configured"));
    }

    #[test]
    fn test_attempt_serde() {
        let attempt = TierAttempt::failure(
            TierName::WebSearch,
            TierError::ExtractionFailed("no document link".to_string()),
            Duration::from_millis(12),
        );
        let json = serde_json::to_string(&attempt).unwrap();
        let back: TierAttempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
    }
}
