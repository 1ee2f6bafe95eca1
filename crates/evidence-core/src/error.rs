//! Error types for evidence-core
//!
//! Tier-level failures ([`TierError`]) are recovered inside the cascade and
//! only ever surface as diagnostics; [`ResolveError`] is what callers see.

use evidence_identifiers::{Identifier, IdentifierError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TierAttempt;
use crate::extract::ExtractionError;
use crate::http::HttpError;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Outcome errors of a full resolution call.
///
/// Cloneable so that every caller coalesced onto one cascade receives the
/// same value.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// Malformed reference; no network resource was used
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    /// Every tier was attempted (or skipped) without usable content
    #[error("No source produced content for {identifier} after {} tier attempts", attempts.len())]
    NotFound {
        identifier: Identifier,
        attempts: Vec<TierAttempt>,
    },

    /// The caller cancelled the cascade
    #[error("Resolution of {identifier} was cancelled")]
    Cancelled { identifier: Identifier },
}

impl ResolveError {
    /// Per-tier diagnostics for a `NotFound` outcome
    pub fn attempts(&self) -> &[TierAttempt] {
        match self {
            ResolveError::NotFound { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

/// Why a single tier failed.
///
/// Serializable because the ordered attempt list is kept with negative
/// cache entries.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierError {
    /// Network or DNS failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The tier did not answer within its timeout
    #[error("Timed out")]
    Timeout,

    /// Non-success HTTP status other than 429
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// HTTP 429 persisted after the single backoff retry, or the host is exhausted
    #[error("Rate limited")]
    RateLimited,

    /// The payload held nothing usable
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Every candidate URL of a multi-URL tier failed; reasons in order
    #[error("All candidates failed: {0}")]
    AllCandidatesFailed(String),
}

impl From<HttpError> for TierError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RateLimited { .. } => TierError::RateLimited,
            HttpError::Timeout => TierError::Timeout,
            other => TierError::Transport(other.to_string()),
        }
    }
}

impl From<ExtractionError> for TierError {
    fn from(e: ExtractionError) -> Self {
        TierError::ExtractionFailed(e.to_string())
    }
}

/// Cache store errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted entry could not be decoded; callers treat it as a miss
    #[error("Corrupt cache entry {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while constructing a resolver
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpError),
}
