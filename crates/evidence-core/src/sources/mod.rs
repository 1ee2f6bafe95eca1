//! Source tiers and metadata sources

pub mod crossref;
pub mod mirror;
pub mod pmc;
pub mod publisher;
pub mod pubmed;
pub mod semantic_scholar;
pub mod traits;
pub mod unpaywall;
pub mod web_search;

pub use crossref::*;
pub use mirror::*;
pub use pmc::*;
pub use publisher::*;
pub use pubmed::*;
pub use semantic_scholar::*;
pub use traits::*;
pub use unpaywall::*;
pub use web_search::*;

use crate::config::ResolverConfig;

/// Build every tier in cascade order
pub fn cascade_tiers(config: &ResolverConfig) -> Vec<Box<dyn SourceTier>> {
    vec![
        Box::new(PublisherTier::from_config(config)),
        Box::new(PmcTier::from_config(config)),
        Box::new(UnpaywallTier::from_config(config)),
        Box::new(SemanticScholarTier::from_config(config)),
        Box::new(MirrorTier::from_config(config)),
        Box::new(WebSearchTier::from_config(config)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::domain::TierName;

    #[test]
    fn test_cascade_matches_tier_order() {
        let config = ResolverConfig::new(CacheConfig::new(60, 1));
        let names: Vec<TierName> = cascade_tiers(&config).iter().map(|t| t.name()).collect();
        assert_eq!(names, TierName::CASCADE.to_vec());
    }
}
