//! Publisher tier
//!
//! Known open-access publishers get a direct document URL from a DOI-prefix
//! template; everything else goes through the DOI landing page.

use super::traits::{fill_template, SourceTier, TierContext, TierPlan};
use crate::config::{PublisherPattern, ResolverConfig};
use crate::domain::TierName;

pub struct PublisherTier {
    patterns: Vec<PublisherPattern>,
    doi_resolver: String,
}

impl PublisherTier {
    pub fn new(patterns: Vec<PublisherPattern>, doi_resolver: impl Into<String>) -> Self {
        Self {
            patterns,
            doi_resolver: doi_resolver.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.publisher_patterns.clone(),
            config.endpoints.doi_resolver.clone(),
        )
    }

    /// Pattern with the longest prefix matching `doi`
    pub fn pattern_for(&self, doi: &str) -> Option<&PublisherPattern> {
        self.patterns
            .iter()
            .filter(|p| p.matches(doi))
            .max_by_key(|p| p.doi_prefix.len())
    }

    /// Publisher URL for a DOI
    pub fn url_for(&self, doi: &str) -> String {
        match self.pattern_for(doi) {
            Some(pattern) => {
                let suffix = doi.split_once('/').map(|(_, s)| s).unwrap_or(doi);
                let url = fill_template(&pattern.url_template, "doi", doi);
                fill_template(&url, "suffix", suffix)
            }
            None => format!("{}/{}", self.doi_resolver.trim_end_matches('/'), doi),
        }
    }
}

impl SourceTier for PublisherTier {
    fn name(&self) -> TierName {
        TierName::Publisher
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        match ctx.doi {
            Some(doi) => TierPlan::fetch(self.url_for(doi)),
            None => TierPlan::skip("no DOI known for publisher lookup"),
        }
    }
}
