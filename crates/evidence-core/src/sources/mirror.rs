//! Fallback mirror tier
//!
//! Each configured mirror serves an HTML page at `<base>/<doi>` embedding
//! the document; mirrors are tried in configuration order.

use super::traits::{SourceTier, TierContext, TierPlan};
use crate::config::ResolverConfig;
use crate::domain::TierName;

pub struct MirrorTier {
    mirrors: Vec<String>,
}

impl MirrorTier {
    pub fn new(mirrors: Vec<String>) -> Self {
        Self { mirrors }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.fallback_mirrors.clone())
    }
}

impl SourceTier for MirrorTier {
    fn name(&self) -> TierName {
        TierName::FallbackMirror
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        if self.mirrors.is_empty() {
            return TierPlan::skip("no mirrors configured");
        }
        let Some(doi) = ctx.doi else {
            return TierPlan::skip("no DOI for mirror lookup");
        };
        TierPlan::Fetch(
            self.mirrors
                .iter()
                .map(|base| format!("{}/{}", base.trim_end_matches('/'), doi))
                .collect(),
        )
    }
}
