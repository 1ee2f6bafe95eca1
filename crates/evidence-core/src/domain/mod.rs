//! Domain models for evidence resolution
//!
//! Records produced by the tiered resolver and the inputs/outputs of the
//! snippet validator.

pub mod record;
pub mod snippet;

pub use record::{AttemptOutcome, CachedRecord, ResolvedRecord, TierAttempt, TierName};
pub use snippet::{ConfidenceBucket, EvidenceSnippet, RationaleFeature, SnippetSuggestion};
