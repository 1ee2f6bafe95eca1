//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod fake_http;
pub mod fixtures;

use std::sync::Arc;

use evidence_core::cache::CacheStore;
use evidence_core::extract::{ExtractionError, PdfTextDecoder};
use evidence_core::{CacheConfig, EvidenceResolver, ResolverConfig};

pub use fake_http::{FakeHttp, Reply};

pub const FULL_TEXT: &str = "Acidithiobacillus ferrooxidans oxidized ferrous iron at rates 45% \
    higher than the reference strain in acidic media.";

/// Decoder returning fixed text for any PDF payload
pub struct StubDecoder(pub &'static str);

impl PdfTextDecoder for StubDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(self.0.to_string())
    }
}

/// Route `tracing` output to the test harness; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config used by resolver tests: no metadata lookups, one mirror
pub fn test_config() -> ResolverConfig {
    let mut config = ResolverConfig::new(CacheConfig::new(3600, 3));
    config.fetch_metadata = false;
    config.fallback_mirrors = vec!["https://mirror.example.org".to_string()];
    config
}

pub fn resolver_with(config: ResolverConfig, http: Arc<FakeHttp>) -> EvidenceResolver {
    let cache = CacheStore::in_memory().expect("in-memory cache");
    resolver_with_cache(config, http, Arc::new(cache))
}

pub fn resolver_with_cache(
    config: ResolverConfig,
    http: Arc<FakeHttp>,
    cache: Arc<CacheStore>,
) -> EvidenceResolver {
    init_tracing();
    EvidenceResolver::with_components(config, http, Arc::new(StubDecoder(FULL_TEXT)), cache)
        .expect("valid test config")
}
