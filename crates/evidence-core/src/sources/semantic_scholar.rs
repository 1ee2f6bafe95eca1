//! Semantic Scholar tier
//!
//! API docs: https://api.semanticscholar.org/api-docs/graph
//! Paper lookups accept `DOI:<doi>` and `PMID:<pmid>` ids.

use evidence_identifiers::{resolve_doi_to_semantic_scholar, semantic_scholar_paper_id};
use serde::Deserialize;

use super::traits::{SourceTier, TierContext, TierPlan};
use crate::config::ResolverConfig;
use crate::domain::TierName;
use crate::error::TierError;
use crate::extract::{ContentExtractor, Extracted, ExtractionError};
use crate::http::HttpResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperResponse {
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}

pub struct SemanticScholarTier {
    base_url: String,
}

impl SemanticScholarTier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.endpoints.semantic_scholar.clone())
    }

    pub fn parse_response(json: &str) -> Result<String, ExtractionError> {
        let paper: PaperResponse = serde_json::from_str(json).map_err(|e| {
            ExtractionError::MalformedResponse(format!("Invalid Semantic Scholar JSON: {}", e))
        })?;
        paper
            .open_access_pdf
            .and_then(|pdf| pdf.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ExtractionError::UnsupportedPayload("no open-access PDF".to_string()))
    }
}

impl SourceTier for SemanticScholarTier {
    fn name(&self) -> TierName {
        TierName::AcademicSearchIndex
    }

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan {
        let paper_id = match ctx.doi {
            Some(doi) => resolve_doi_to_semantic_scholar(doi),
            None => semantic_scholar_paper_id(ctx.identifier),
        };
        TierPlan::fetch(format!(
            "{}/{}?fields=openAccessPdf",
            self.base_url.trim_end_matches('/'),
            paper_id
        ))
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

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_identifiers::Identifier;

    #[test]
    fn test_plan_prefers_doi() {
        let tier = SemanticScholarTier::new("https://api.semanticscholar.org/graph/v1/paper");
        let id = Identifier::parse("PMID:31234567").unwrap();

        let plan = tier.plan(&TierContext::new(&id));
        assert_eq!(
            plan,
            TierPlan::fetch(
                "https://api.semanticscholar.org/graph/v1/paper/PMID:31234567?fields=openAccessPdf"
            )
        );

        let plan = tier.plan(&TierContext::new(&id).with_linked_doi(Some("10.1128/aem.01234-19")));
        assert_eq!(
            plan,
            TierPlan::fetch(
                "https://api.semanticscholar.org/graph/v1/paper/DOI:10.1128/aem.01234-19?fields=openAccessPdf"
            )
        );
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{"paperId": "abc", "openAccessPdf": {"url": "https://europepmc.org/articles/pmc1/pdf", "status": "GREEN"}}"#;
        assert_eq!(
            SemanticScholarTier::parse_response(json).unwrap(),
            "https://europepmc.org/articles/pmc1/pdf"
        );
        assert!(SemanticScholarTier::parse_response(r#"{"paperId": "abc", "openAccessPdf": null}"#).is_err());
    }
}
