//! Unpaywall tier
//!
//! API docs: https://unpaywall.org/products/api
//! Requires a contact email on every request.

use serde::Deserialize;

use super::traits::{SourceTier, TierContext, TierPlan};
use crate::config::ResolverConfig;
use crate::domain::TierName;
use crate::error::TierError;
use crate::extract::{ContentExtractor, Extracted, ExtractionError};
use crate::http::HttpResponse;

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    #[serde(default)]
    is_oa: bool,
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
}

pub struct UnpaywallTier {
    base_url: String,
    contact_email: String,
}

impl UnpaywallTier {
    pub fn new(base_url: impl Into<String>, contact_email: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            contact_email: contact_email.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.endpoints.unpaywall.clone(), config.contact_email.clone())
    }

    /// Open-access PDF URL from an Unpaywall record
    pub fn parse_response(json: &str) -> Result<String, ExtractionError> {
        let response: UnpaywallResponse = serde_json::from_str(json).map_err(|e| {
            ExtractionError::MalformedResponse(format!("Invalid Unpaywall JSON: {}", e))
        })?;

        if !response.is_oa {
            return Err(ExtractionError::UnsupportedPayload(
                "no open-access copy".to_string(),
            ));
        }

        response
            .best_oa_location
            .and_then(|loc| loc.url_for_pdf)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ExtractionError::UnsupportedPayload("no open-access PDF".to_string()))
    }
}

impl SourceTier for UnpaywallTier {
    fn name(&self) -> TierName {
        TierName::OpenAccessAggregator
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        match ctx.doi {
            Some(doi) => TierPlan::fetch(format!(
                "{}/{}?email={}",
                self.base_url.trim_end_matches('/'),
                doi,
                urlencoding::encode(&self.contact_email)
            )),
            None => TierPlan::skip("no DOI for Unpaywall lookup"),
        }
    }

    fn interpret(
        &self,
        response: &HttpResponse,
        _extractor: &ContentExtractor,
    ) -> Result<Extracted, TierError> {
        let url = Self::parse_response(&response.text())?;
        Ok(Extracted::DocumentUrl { url, rule: None })
    }
}
