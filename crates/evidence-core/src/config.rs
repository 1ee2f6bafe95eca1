//! Configuration for evidence-core
//!
//! Centralized configuration for tier endpoints, timeouts, rate limits, the
//! cache store and snippet scoring. `cache.negative_ttl_secs` and
//! `cache.max_cascades_per_identifier` have no defaults and must be given.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::TierName;
use crate::error::ConfigError;
use crate::http::RateLimitPolicy;
use crate::snippets::ScoringPolicy;

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Contact address required by polite-pool APIs (Unpaywall, Crossref)
    #[serde(default = "default_contact_email")]
    pub contact_email: String,
    /// Durable store settings
    pub cache: CacheConfig,
    /// Per-tier timeouts and rate limits
    #[serde(default)]
    pub tiers: TierTable,
    /// Upstream base URLs
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// DOI-prefix to publisher URL templates; longest matching prefix wins
    #[serde(default = "default_publisher_patterns")]
    pub publisher_patterns: Vec<PublisherPattern>,
    /// Mirror base URLs tried in order by the fallback tier
    #[serde(default)]
    pub fallback_mirrors: Vec<String>,
    /// Search URL with a `{query}` placeholder; `None` skips the web search tier
    #[serde(default = "default_web_search_template")]
    pub web_search_url_template: Option<String>,
    /// Redirect hops followed for a tier request
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    /// Fetch and decode document URLs returned by a tier
    #[serde(default)]
    pub download_documents: bool,
    /// Look up title/abstract metadata before the cascade
    #[serde(default = "default_true")]
    pub fetch_metadata: bool,
    /// Snippet suggestion scoring
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

/// Cache store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite database path; `None` keeps the cache in memory
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Validity window of a negative (`NotFound`) entry in seconds
    pub negative_ttl_secs: u64,
    /// Failed cascades after which an identifier is no longer retried
    /// until a forced refresh
    pub max_cascades_per_identifier: u32,
}

impl CacheConfig {
    pub fn new(negative_ttl_secs: u64, max_cascades_per_identifier: u32) -> Self {
        Self {
            path: None,
            negative_ttl_secs,
            max_cascades_per_identifier,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }

    /// Directory for downloaded documents, next to the database file
    pub fn documents_dir(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        Some(parent.join("documents"))
    }
}

/// Timeout and rate limit for one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSettings {
    /// Per-request timeout in ms
    pub timeout_ms: u64,
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
}

impl TierSettings {
    fn with_interval(timeout_ms: u64, min_interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            rate_limit: RateLimitPolicy {
                min_interval_ms,
                ..RateLimitPolicy::default()
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TierSettings {
    fn default() -> Self {
        Self::with_interval(30_000, 1000)
    }
}

/// Settings for every tier plus the metadata sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub publisher: TierSettings,
    pub open_access_repository: TierSettings,
    pub open_access_aggregator: TierSettings,
    pub academic_search_index: TierSettings,
    pub fallback_mirror: TierSettings,
    pub web_search: TierSettings,
    /// PubMed and Crossref metadata lookups
    pub metadata: TierSettings,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            publisher: TierSettings::with_interval(30_000, 1000),
            // NCBI allows three requests per second without an API key
            open_access_repository: TierSettings::with_interval(30_000, 340),
            open_access_aggregator: TierSettings::with_interval(15_000, 100),
            academic_search_index: TierSettings::with_interval(15_000, 1000),
            fallback_mirror: TierSettings::with_interval(30_000, 2000),
            web_search: TierSettings::with_interval(15_000, 2000),
            metadata: TierSettings::with_interval(15_000, 340),
        }
    }
}

impl TierTable {
    pub fn get(&self, tier: TierName) -> &TierSettings {
        match tier {
            TierName::Publisher => &self.publisher,
            TierName::OpenAccessRepository => &self.open_access_repository,
            TierName::OpenAccessAggregator => &self.open_access_aggregator,
            TierName::AcademicSearchIndex => &self.academic_search_index,
            TierName::FallbackMirror => &self.fallback_mirror,
            TierName::WebSearch => &self.web_search,
        }
    }

    fn all(&self) -> [(&'static str, &TierSettings); 7] {
        [
            ("publisher", &self.publisher),
            ("open_access_repository", &self.open_access_repository),
            ("open_access_aggregator", &self.open_access_aggregator),
            ("academic_search_index", &self.academic_search_index),
            ("fallback_mirror", &self.fallback_mirror),
            ("web_search", &self.web_search),
            ("metadata", &self.metadata),
        ]
    }
}

/// Upstream API base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub doi_resolver: String,
    pub pmc_idconv: String,
    pub pmc_articles: String,
    pub unpaywall: String,
    pub semantic_scholar: String,
    pub pubmed_efetch: String,
    pub crossref_works: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            doi_resolver: "https://doi.org".to_string(),
            pmc_idconv: "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/".to_string(),
            pmc_articles: "https://www.ncbi.nlm.nih.gov/pmc/articles".to_string(),
            unpaywall: "https://api.unpaywall.org/v2".to_string(),
            semantic_scholar: "https://api.semanticscholar.org/graph/v1/paper".to_string(),
            pubmed_efetch: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi"
                .to_string(),
            crossref_works: "https://api.crossref.org/works".to_string(),
        }
    }
}

/// Publisher-specific document URL pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherPattern {
    /// DOI prefix such as `10.3389`
    pub doi_prefix: String,
    /// URL with `{doi}` and/or `{suffix}` placeholders
    pub url_template: String,
}

impl PublisherPattern {
    pub fn new(doi_prefix: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            doi_prefix: doi_prefix.into(),
            url_template: url_template.into(),
        }
    }

    /// Whether this pattern covers `doi`.
    ///
    /// A bare registrant prefix (`10.1016`) must end at the `/`; a prefix that
    /// already includes part of the suffix matches as plain text.
    pub fn matches(&self, doi: &str) -> bool {
        let prefix = self.doi_prefix.to_ascii_lowercase();
        let doi = doi.to_ascii_lowercase();
        doi.strip_prefix(&prefix)
            .is_some_and(|rest| prefix.contains('/') || rest.starts_with('/'))
    }
}

fn default_user_agent() -> String {
    format!("evidence-core/{}", env!("CARGO_PKG_VERSION"))
}

fn default_contact_email() -> String {
    "curation@example.org".to_string()
}

fn default_web_search_template() -> Option<String> {
    Some("https://html.duckduckgo.com/html/?q={query}".to_string())
}

fn default_max_redirects() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Known open-access publisher PDF patterns
pub fn default_publisher_patterns() -> Vec<PublisherPattern> {
    vec![
        PublisherPattern::new("10.3389", "https://www.frontiersin.org/articles/{doi}/pdf"),
        PublisherPattern::new(
            "10.1371",
            "https://journals.plos.org/plosone/article/file?id={doi}&type=printable",
        ),
        PublisherPattern::new("10.1128", "https://journals.asm.org/doi/pdf/{doi}"),
        PublisherPattern::new("10.1038", "https://www.nature.com/articles/{suffix}.pdf"),
        PublisherPattern::new(
            "10.1186",
            "https://link.springer.com/content/pdf/{doi}.pdf",
        ),
    ]
}

impl ResolverConfig {
    /// Create a configuration with defaults around the required cache settings
    pub fn new(cache: CacheConfig) -> Self {
        Self {
            user_agent: default_user_agent(),
            contact_email: default_contact_email(),
            cache,
            tiers: TierTable::default(),
            endpoints: EndpointConfig::default(),
            publisher_patterns: default_publisher_patterns(),
            fallback_mirrors: Vec::new(),
            web_search_url_template: default_web_search_template(),
            max_redirects: default_max_redirects(),
            download_documents: false,
            fetch_metadata: true,
            scoring: ScoringPolicy::default(),
        }
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_cascades_per_identifier == 0 {
            return Err(ConfigError::OutOfRange(
                "cache.max_cascades_per_identifier must be positive".to_string(),
            ));
        }

        for (name, settings) in self.tiers.all() {
            if settings.timeout_ms == 0 {
                return Err(ConfigError::OutOfRange(format!(
                    "tiers.{}.timeout_ms must be positive",
                    name
                )));
            }
            let policy = &settings.rate_limit;
            if policy.max_consecutive_429 == 0 {
                return Err(ConfigError::OutOfRange(format!(
                    "tiers.{}.rate_limit.max_consecutive_429 must be positive",
                    name
                )));
            }
            if policy.initial_backoff_ms > policy.max_backoff_ms {
                return Err(ConfigError::InvalidThresholds(format!(
                    "tiers.{}.rate_limit.initial_backoff_ms exceeds max_backoff_ms",
                    name
                )));
            }
        }

        for pattern in &self.publisher_patterns {
            if !pattern.url_template.contains("{doi}") && !pattern.url_template.contains("{suffix}")
            {
                return Err(ConfigError::InvalidTemplate(format!(
                    "template for {} has no {{doi}} or {{suffix}} placeholder",
                    pattern.doi_prefix
                )));
            }
        }

        if let Some(template) = &self.web_search_url_template {
            if !template.contains("{query}") {
                return Err(ConfigError::InvalidTemplate(
                    "web_search_url_template has no {query} placeholder".to_string(),
                ));
            }
        }

        for mirror in &self.fallback_mirrors {
            if url::Url::parse(mirror).is_err() {
                return Err(ConfigError::InvalidTemplate(format!(
                    "fallback mirror {} is not a URL",
                    mirror
                )));
            }
        }

        self.scoring.validate()
    }
}
