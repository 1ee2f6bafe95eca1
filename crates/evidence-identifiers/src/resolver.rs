//! Identifier forms for upstream services
//!
//! Maps canonical identifiers onto the paper id form Semantic Scholar accepts.

use crate::identifier::{Identifier, IdentifierKind};

/// Resolve a DOI to a Semantic Scholar paper ID format
pub fn resolve_doi_to_semantic_scholar(doi: &str) -> String {
    format!("DOI:{}", doi)
}

/// Resolve a PubMed ID to a Semantic Scholar paper ID format
pub fn resolve_pmid_to_semantic_scholar(pmid: &str) -> String {
    format!("PMID:{}", pmid)
}

/// Semantic Scholar paper id for any identifier
pub fn semantic_scholar_paper_id(id: &Identifier) -> String {
    match id.kind() {
        IdentifierKind::Doi => resolve_doi_to_semantic_scholar(id.value()),
        IdentifierKind::Pmid => resolve_pmid_to_semantic_scholar(id.value()),
    }
}
