//! Crossref metadata source for DOIs
//!
//! API docs: https://api.crossref.org/swagger-ui/index.html
//! Rate limit: Polite pool with mailto parameter, ~50 req/sec

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::traits::{SourceError, WorkMetadata};
use crate::config::ResolverConfig;

lazy_static! {
    static ref JATS_TAG: Regex = Regex::new(r"</?jats:[^>]+>").unwrap();
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: String,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CrossrefDate>,
    issued: Option<CrossrefDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

impl CrossrefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts
            .as_ref()?
            .first()?
            .first()
            .copied()
            .flatten()
    }
}

pub struct CrossrefSource {
    works_url: String,
    contact_email: String,
}

impl CrossrefSource {
    pub fn new(works_url: impl Into<String>, contact_email: impl Into<String>) -> Self {
        Self {
            works_url: works_url.into(),
            contact_email: contact_email.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.endpoints.crossref_works.clone(),
            config.contact_email.clone(),
        )
    }

    /// Works endpoint URL for a DOI
    pub fn request_url(&self, doi: &str) -> String {
        format!(
            "{}/{}?mailto={}",
            self.works_url.trim_end_matches('/'),
            doi,
            urlencoding::encode(&self.contact_email)
        )
    }

    /// Parse single work response (for DOI lookup)
    pub fn parse_work_response(json: &str) -> Result<WorkMetadata, SourceError> {
        let response: CrossrefResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Invalid Crossref JSON: {}", e)))?;
        Ok(Self::parse_work(response.message))
    }

    fn parse_work(work: CrossrefWork) -> WorkMetadata {
        let title = work
            .title
            .and_then(|t| t.into_iter().next())
            .map(|t| strip_jats_markup(&t))
            .filter(|t| !t.is_empty());

        let authors = work
            .author
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| match (a.family, a.given) {
                (Some(family), Some(given)) => Some(format!("{} {}", family, given)),
                (Some(family), None) => Some(family),
                (None, _) => a.name,
            })
            .collect();

        let year = [&work.published_print, &work.published_online, &work.issued]
            .into_iter()
            .flatten()
            .find_map(CrossrefDate::year);

        let journal = work.container_title.and_then(|t| t.into_iter().next());

        // Crossref abstracts usually carry JATS markup
        let abstract_text = work
            .abstract_text
            .map(|a| strip_jats_markup(&a))
            .filter(|a| !a.is_empty());

        WorkMetadata {
            title,
            abstract_text,
            authors,
            year,
            journal,
            doi: Some(work.doi.to_lowercase()),
        }
    }
}

/// Strip JATS XML markup from Crossref abstracts
pub fn strip_jats_markup(text: &str) -> String {
    let cleaned = JATS_TAG.replace_all(text, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
