//! evidence-core: evidence resolution for curated literature references
//!
//! This library provides:
//! - A tiered resolver that walks publisher, open-access and search sources
//!   in a fixed order until one yields a document
//! - Per-tier, per-host rate limiting with 429 backoff
//! - HTML and PDF content extraction
//! - A durable cache with negative entries and single-flight resolution
//! - Snippet validation and ranked replacement suggestions
//!
//! Identifier parsing lives in the `evidence-identifiers` crate and is
//! re-exported here.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod http;
pub mod resolver;
pub mod snippets;
pub mod sources;

pub use cache::{CacheStore, NegativeEntry};
pub use config::{CacheConfig, ResolverConfig, TierSettings};
pub use domain::{
    AttemptOutcome, CachedRecord, ConfidenceBucket, EvidenceSnippet, RationaleFeature,
    ResolvedRecord, SnippetSuggestion, TierAttempt, TierName,
};
pub use error::{CacheError, ConfigError, EngineError, ResolveError, Result, TierError};
pub use evidence::{check_record, EvidenceCheck};
pub use extract::{ContentExtractor, PdfTextDecoder, PdfiumDecoder};
pub use http::{HttpClient, HttpError, HttpFetch, HttpResponse, RateLimitPolicy};
pub use resolver::{EvidenceResolver, ResolveOptions};
pub use snippets::{suggest_for_snippet, suggest_snippets, validate_snippet, ScoringPolicy};

pub use evidence_identifiers::{Identifier, IdentifierError, IdentifierKind};
