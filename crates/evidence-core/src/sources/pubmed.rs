//! PubMed metadata source
//!
//! API docs: https://www.ncbi.nlm.nih.gov/books/NBK25501/
//! Rate limit: 3 requests/second without API key, 10 with key

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::traits::{SourceError, WorkMetadata};
use crate::config::ResolverConfig;

pub struct PubMedSource {
    efetch_url: String,
    contact_email: String,
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl PubMedSource {
    pub fn new(efetch_url: impl Into<String>, contact_email: impl Into<String>) -> Self {
        Self {
            efetch_url: efetch_url.into(),
            contact_email: contact_email.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.endpoints.pubmed_efetch.clone(),
            config.contact_email.clone(),
        )
    }

    /// efetch URL returning the article XML for a PMID
    pub fn request_url(&self, pmid: &str) -> String {
        format!(
            "{}?db=pubmed&id={}&retmode=xml&tool=evidence-core&email={}",
            self.efetch_url,
            pmid,
            urlencoding::encode(&self.contact_email)
        )
    }

    /// Parse PubMed XML response (efetch format) for a single article
    pub fn parse_efetch_response(xml: &str) -> Result<WorkMetadata, SourceError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut found_article = false;

        let mut current_element = String::new();
        let mut title = String::new();
        let mut abstract_text = String::new();
        let mut journal = String::new();
        let mut year: Option<i32> = None;
        let mut doi: Option<String> = None;
        let mut authors: Vec<String> = Vec::new();
        let mut current_author_last = String::new();
        let mut current_author_first = String::new();
        let mut current_id_type: Option<String> = None;

        let mut in_author = false;
        let mut in_title = false;
        let mut in_abstract = false;
        let mut in_pub_date = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    match name.as_str() {
                        "PubmedArticle" => found_article = true,
                        "Author" => {
                            in_author = true;
                            current_author_last.clear();
                            current_author_first.clear();
                        }
                        "ArticleTitle" => in_title = true,
                        "AbstractText" => in_abstract = true,
                        "PubDate" => in_pub_date = true,
                        "ArticleId" => current_id_type = attribute(e, b"IdType"),
                        "ELocationID" => current_id_type = attribute(e, b"EIdType"),
                        _ => {}
                    }
                    current_element = name;
                }
                Ok(Event::End(ref e)) => {
                    match e.name().as_ref() {
                        b"PubmedArticle" if found_article => break,
                        b"Author" if in_author => {
                            if !current_author_last.is_empty() {
                                authors.push(if current_author_first.is_empty() {
                                    current_author_last.clone()
                                } else {
                                    format!("{} {}", current_author_last, current_author_first)
                                });
                            }
                            in_author = false;
                        }
                        b"ArticleTitle" => in_title = false,
                        b"AbstractText" => in_abstract = false,
                        b"PubDate" => in_pub_date = false,
                        b"ArticleId" | b"ELocationID" => current_id_type = None,
                        _ => {}
                    }
                    current_element.clear();
                }
                Ok(Event::Text(e)) => {
                    if !found_article {
                        buf.clear();
                        continue;
                    }
                    let text = e.unescape().unwrap_or_default().to_string();
                    if in_title {
                        if !title.is_empty() {
                            title.push(' ');
                        }
                        title.push_str(&text);
                    } else if in_abstract {
                        if !abstract_text.is_empty() {
                            abstract_text.push(' ');
                        }
                        abstract_text.push_str(&text);
                    } else {
                        match current_element.as_str() {
                            "Title" if journal.is_empty() => journal = text,
                            "Year" if in_pub_date && year.is_none() => year = text.parse().ok(),
                            "MedlineDate" if in_pub_date && year.is_none() => {
                                year = text.get(..4).and_then(|y| y.parse().ok())
                            }
                            "LastName" if in_author => current_author_last = text,
                            "ForeName" if in_author => current_author_first = text,
                            "ArticleId" | "ELocationID"
                                if doi.is_none()
                                    && current_id_type.as_deref() == Some("doi") =>
                            {
                                doi = Some(text.to_lowercase())
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        if !found_article {
            return Err(SourceError::NotFound);
        }

        Ok(WorkMetadata {
            title: non_empty(&title),
            abstract_text: non_empty(&abstract_text),
            authors,
            year,
            journal: non_empty(&journal),
            doi,
        })
    }
}
