//! Common traits for source tiers

use evidence_identifiers::Identifier;
use thiserror::Error;

use crate::domain::TierName;
use crate::error::TierError;
use crate::extract::{ContentExtractor, Extracted};
use crate::http::{HttpError, HttpResponse};

/// Errors raised by metadata sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(HttpError),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimit,
    #[error("Not found")]
    NotFound,
}

impl From<HttpError> for SourceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RateLimited { .. } => SourceError::RateLimit,
            other => SourceError::Http(other),
        }
    }
}

/// What a tier knows about the identifier being resolved
#[derive(Debug, Clone, Copy)]
pub struct TierContext<'a> {
    pub identifier: &'a Identifier,
    /// The identifier's DOI, or the DOI linked to a PMID by its metadata
    pub doi: Option<&'a str>,
    pub title: Option<&'a str>,
}

impl<'a> TierContext<'a> {
    pub fn new(identifier: &'a Identifier) -> Self {
        Self {
            identifier,
            doi: identifier.doi(),
            title: None,
        }
    }

    pub fn with_linked_doi(mut self, doi: Option<&'a str>) -> Self {
        if self.doi.is_none() {
            self.doi = doi;
        }
        self
    }

    pub fn with_title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    pub fn pmid(&self) -> Option<&'a str> {
        self.identifier.pmid()
    }
}

/// Requests a tier wants to make for an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierPlan {
    /// Candidate URLs tried in order; the first usable one wins
    Fetch(Vec<String>),
    /// The tier cannot serve this identifier
    Skip(String),
}

impl TierPlan {
    pub fn fetch(url: impl Into<String>) -> Self {
        TierPlan::Fetch(vec![url.into()])
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        TierPlan::Skip(reason.into())
    }
}

/// One named source in the cascade.
///
/// Tiers only build requests and read responses; the resolver owns the
/// network, rate limiting and caching.
pub trait SourceTier: Send + Sync {
    fn name(&self) -> TierName;

    fn plan(&self, ctx: &TierContext<'_>) -> TierPlan;

    /// Turn a successful response into usable content
    fn interpret(
        &self,
        response: &HttpResponse,
        extractor: &ContentExtractor,
    ) -> Result<Extracted, TierError> {
        Ok(extractor.extract(response)?)
    }
}

/// Replace every `{placeholder}` in a template
pub(crate) fn fill_template(template: &str, placeholder: &str, value: &str) -> String {
    template.replace(&format!("{{{}}}", placeholder), value)
}

/// Bibliographic metadata from PubMed or Crossref
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkMetadata {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    /// Display names, "Family Given"
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
}
