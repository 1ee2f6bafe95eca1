//! Identifier validation functions

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // DOI validation regex
    static ref DOI_PATTERN: Regex = Regex::new(r"^10\.\d{4,}(?:\.\d+)*/\S+$").unwrap();

    // PMIDs are plain positive integers
    static ref PMID_PATTERN: Regex = Regex::new(r"^\d{1,9}$").unwrap();
}

/// Check whether a string is a bare DOI (`10.<registrant>/<suffix>`)
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_PATTERN.is_match(doi)
}

/// Check whether a string is a bare PubMed ID
pub fn is_valid_pmid(pmid: &str) -> bool {
    PMID_PATTERN.is_match(pmid) && pmid.chars().any(|c| c != '0')
}

/// Strip resolver prefixes and trailing punctuation from a DOI string.
///
/// Case is preserved; canonical lowercasing happens in [`crate::Identifier`].
pub fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim();

    // Remove common prefixes
    let prefixes = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi.org/",
        "doi:",
    ];

    for prefix in prefixes {
        let matches = result
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            result = result[prefix.len()..].trim_start();
            break;
        }
    }

    // Remove trailing punctuation
    result
        .trim_end_matches(|c| c == '.' || c == ',' || c == ';')
        .to_string()
}
