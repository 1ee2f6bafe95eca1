//! Web search tier: last resort over a generic search results page

use super::traits::{fill_template, SourceTier, TierContext, TierPlan};
use crate::config::ResolverConfig;
use crate::domain::TierName;

pub struct WebSearchTier {
    url_template: Option<String>,
}

impl WebSearchTier {
    pub fn new(url_template: Option<String>) -> Self {
        Self { url_template }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.web_search_url_template.clone())
    }

    /// Search query for the work: its DOI, else its title, else its PMID
    pub fn query(ctx: &TierContext<'_>) -> String {
        if let Some(doi) = ctx.doi {
            format!("\"{}\" pdf", doi)
        } else if let Some(title) = ctx.title.filter(|t| !t.trim().is_empty()) {
            format!("\"{}\" pdf", title.trim())
        } else {
            format!("PMID {} pdf", ctx.identifier.value())
        }
    }
}

impl SourceTier for WebSearchTier {
    fn name(&self) -> TierName {
        TierName::WebSearch
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        match &self.url_template {
            Some(template) => {
                let query = urlencoding::encode(&Self::query(ctx)).into_owned();
                TierPlan::fetch(fill_template(template, "query", &query))
            }
            None => TierPlan::skip("web search disabled"),
        }
    }
}
