//! PubMed Central tier
//!
//! API docs: https://www.ncbi.nlm.nih.gov/pmc/tools/id-converter-api/
//! The ID converter maps a PMID or DOI to a PMCID; an article with a PMCID
//! has its PDF at `/pmc/articles/<pmcid>/pdf/`.

use serde::Deserialize;

use super::traits::{SourceTier, TierContext, TierPlan};
use crate::config::ResolverConfig;
use crate::domain::TierName;
use crate::error::TierError;
use crate::extract::{ContentExtractor, Extracted, ExtractionError};
use crate::http::HttpResponse;

#[derive(Debug, Deserialize)]
struct IdConvResponse {
    #[serde(default)]
    records: Vec<IdConvRecord>,
}

#[derive(Debug, Deserialize)]
struct IdConvRecord {
    pmcid: Option<String>,
    #[serde(default)]
    errmsg: Option<String>,
}

pub struct PmcTier {
    idconv_url: String,
    articles_url: String,
    contact_email: String,
}

impl PmcTier {
    pub fn new(
        idconv_url: impl Into<String>,
        articles_url: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            idconv_url: idconv_url.into(),
            articles_url: articles_url.into(),
            contact_email: contact_email.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.endpoints.pmc_idconv.clone(),
            config.endpoints.pmc_articles.clone(),
            config.contact_email.clone(),
        )
    }

    /// PDF URL for a PMCID
    pub fn pdf_url(&self, pmcid: &str) -> String {
        format!("{}/{}/pdf/", self.articles_url.trim_end_matches('/'), pmcid)
    }

    /// Parse an ID converter response into a PMCID
    pub fn parse_idconv_response(json: &str) -> Result<String, ExtractionError> {
        let response: IdConvResponse = serde_json::from_str(json)
            .map_err(|e| ExtractionError::MalformedResponse(format!("Invalid idconv JSON: {}", e)))?;

        let record = response
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::UnsupportedPayload("no idconv record".to_string()))?;

        match record.pmcid {
            Some(pmcid) if !pmcid.is_empty() => Ok(pmcid),
            _ => Err(ExtractionError::UnsupportedPayload(
                record
                    .errmsg
                    .unwrap_or_else(|| "article has no PMC copy".to_string()),
            )),
        }
    }
}

impl SourceTier for PmcTier {
    fn name(&self) -> TierName {
        TierName::OpenAccessRepository
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        let Some(id) = ctx.pmid().or(ctx.doi) else {
            return TierPlan::skip("no PMID or DOI for PMC lookup");
        };
        TierPlan::fetch(format!(
            "{}?ids={}&format=json&tool=evidence-core&email={}",
            self.idconv_url,
            urlencoding::encode(id),
            urlencoding::encode(&self.contact_email)
        ))
    }

    fn interpret(
        &self,
        response: &HttpResponse,
        _extractor: &ContentExtractor,
    ) -> Result<Extracted, TierError> {
        let pmcid = Self::parse_idconv_response(&response.text())?;
        Ok(Extracted::DocumentUrl {
            url: self.pdf_url(&pmcid),
            rule: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_identifiers::Identifier;

    fn tier() -> PmcTier {
        PmcTier::new(
            "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/",
            "https://www.ncbi.nlm.nih.gov/pmc/articles",
            "curator@example.org",
        )
    }

    #[test]
    fn test_plan_uses_pmid() {
        let id = Identifier::parse("PMID:23193287").unwrap();
        let plan = tier().plan(&TierContext::new(&id));
        assert_eq!(
            plan,
            TierPlan::fetch(
                "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/?ids=23193287&format=json&tool=evidence-core&email=curator%40example.org"
            )
        );
    }

    #[test]
    fn test_parse_idconv_response() {
        let json = r#"{"status":"ok","records":[{"pmcid":"PMC3531190","pmid":"23193287","doi":"10.1093/nar/gks1195"}]}"#;
        assert_eq!(PmcTier::parse_idconv_response(json).unwrap(), "PMC3531190");
        assert_eq!(
            tier().pdf_url("PMC3531190"),
            "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC3531190/pdf/"
        );
    }

    #[test]
    fn test_record_without_pmcid() {
        let json = r#"{"status":"ok","records":[{"doi":"10.1099/ijs.0.65409-0","live":"false","status":"error","errmsg":"invalid article id"}]}"#;
        let err = PmcTier::parse_idconv_response(json).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::UnsupportedPayload("invalid article id".to_string())
        );
        assert!(PmcTier::parse_idconv_response("<html>").is_err());
    }
}
