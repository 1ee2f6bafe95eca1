//! Content extraction from tier payloads
//!
//! Turns a raw response into either a document URL (HTML pages, via the
//! ordered [`HtmlRule`]s) or plain text (PDF payloads, via a
//! [`PdfTextDecoder`]).

pub mod html;
pub mod pdf;

pub use html::{extract_document_link, looks_like_document, sanitize_html, HtmlRule};
pub use pdf::{looks_like_pdf, PdfTextDecoder, PdfiumDecoder};

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::http::HttpResponse;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No document link found in HTML payload")]
    NoDocumentLink,
    #[error("PDF decoded to empty text")]
    EmptyText,
    #[error("Failed to decode PDF: {0}")]
    PdfDecode(String),
    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(String),
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
}

/// Coarse classification of a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Pdf,
    Html,
    Other,
}

/// Sniff the payload kind from magic bytes first, then the content type
pub fn classify(response: &HttpResponse) -> PayloadKind {
    if looks_like_pdf(&response.body) {
        return PayloadKind::Pdf;
    }

    let content_type = response
        .content_type()
        .unwrap_or("")
        .to_ascii_lowercase();
    if content_type.contains("application/pdf") {
        return PayloadKind::Pdf;
    }
    if content_type.contains("html") {
        return PayloadKind::Html;
    }

    let head = String::from_utf8_lossy(&response.body[..response.body.len().min(1024)])
        .to_ascii_lowercase();
    if head.contains("<html") || head.contains("<!doctype html") {
        PayloadKind::Html
    } else {
        PayloadKind::Other
    }
}

/// Usable content found in a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Link to a document, with the rule that found it (none for API tiers)
    DocumentUrl { url: String, rule: Option<HtmlRule> },
    /// Text decoded from a document
    Text { text: String },
}

/// Applies HTML rules and PDF decoding to tier responses
#[derive(Clone)]
pub struct ContentExtractor {
    decoder: Arc<dyn PdfTextDecoder>,
}

impl ContentExtractor {
    pub fn new(decoder: Arc<dyn PdfTextDecoder>) -> Self {
        Self { decoder }
    }

    /// Extract a document URL or text from a response
    pub fn extract(&self, response: &HttpResponse) -> Result<Extracted, ExtractionError> {
        match classify(response) {
            PayloadKind::Pdf => self.decode_pdf(&response.body).map(|text| Extracted::Text { text }),
            PayloadKind::Html => {
                let base = Url::parse(&response.url).map_err(|_| {
                    ExtractionError::UnsupportedPayload(format!("bad base URL {}", response.url))
                })?;
                extract_document_link(&response.text(), &base)
                    .map(|(rule, url)| Extracted::DocumentUrl {
                        url: url.to_string(),
                        rule: Some(rule),
                    })
                    .ok_or(ExtractionError::NoDocumentLink)
            }
            PayloadKind::Other => Err(ExtractionError::UnsupportedPayload(
                response
                    .content_type()
                    .unwrap_or("unknown content type")
                    .to_string(),
            )),
        }
    }

    /// Decode PDF bytes, rejecting documents with no text
    pub fn decode_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if !looks_like_pdf(bytes) {
            return Err(ExtractionError::PdfDecode("missing %PDF- header".to_string()));
        }
        let decoded = self.decoder.decode(bytes)?;
        let text = decoded.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        Ok(text.to_string())
    }
}
