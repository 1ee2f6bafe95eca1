//! Canonical reference identifiers
//!
//! An [`Identifier`] is the cache key and request seed for every resolution.
//! Parsing is purely syntactic; a malformed reference is rejected before any
//! network resource is touched.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validators::{is_valid_doi, is_valid_pmid, normalize_doi};

lazy_static! {
    static ref PMID_REFERENCE: Regex = Regex::new(r"(?i)^pmid:\s*(?P<pmid>\d+)$").unwrap();
}

/// Errors raised while parsing a reference string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid identifier: {input:?} is neither PMID:<digits> nor a DOI")]
    InvalidIdentifier { input: String },
}

/// Kind of bibliographic identifier accepted by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// PubMed identifier
    Pmid,
    /// Digital Object Identifier
    Doi,
}

impl IdentifierKind {
    /// Lowercase tag used in cache keys
    pub fn tag(self) -> &'static str {
        match self {
            IdentifierKind::Pmid => "pmid",
            IdentifierKind::Doi => "doi",
        }
    }
}

/// A canonicalized PMID or DOI.
///
/// DOIs are lowercased and stripped of resolver prefixes; PMIDs are reduced
/// to their numeric value without leading zeros. Equality is structural over the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    kind: IdentifierKind,
    value: String,
}

impl Identifier {
    /// Parse a raw reference string.
    ///
    /// Accepts `PMID:<digits>` (any case, optional space after the colon),
    /// `doi:<doi>`, a bare `10.<prefix>/<suffix>` DOI, or a doi.org URL.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();

        if let Some(caps) = PMID_REFERENCE.captures(trimmed) {
            let pmid = &caps["pmid"];
            if is_valid_pmid(pmid) {
                return Ok(Self::pmid_unchecked(pmid));
            }
            return Err(IdentifierError::InvalidIdentifier {
                input: raw.to_string(),
            });
        }

        let doi = normalize_doi(trimmed).to_lowercase();
        if is_valid_doi(&doi) {
            return Ok(Self {
                kind: IdentifierKind::Doi,
                value: doi,
            });
        }

        Err(IdentifierError::InvalidIdentifier {
            input: raw.to_string(),
        })
    }

    /// Build a DOI identifier from a bare DOI (e.g. one found in PubMed metadata)
    pub fn from_doi(doi: &str) -> Result<Self, IdentifierError> {
        let normalized = normalize_doi(doi).to_lowercase();
        if is_valid_doi(&normalized) {
            Ok(Self {
                kind: IdentifierKind::Doi,
                value: normalized,
            })
        } else {
            Err(IdentifierError::InvalidIdentifier {
                input: doi.to_string(),
            })
        }
    }

    fn pmid_unchecked(pmid: &str) -> Self {
        Self {
            kind: IdentifierKind::Pmid,
            value: pmid.trim_start_matches('0').to_string(),
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_doi(&self) -> bool {
        self.kind == IdentifierKind::Doi
    }

    pub fn doi(&self) -> Option<&str> {
        self.is_doi().then_some(self.value.as_str())
    }

    pub fn pmid(&self) -> Option<&str> {
        (self.kind == IdentifierKind::Pmid).then_some(self.value.as_str())
    }

    /// Registrant part of a DOI (`10.3389` for `10.3389/fmicb.2015.00475`)
    pub fn doi_prefix(&self) -> Option<&str> {
        self.doi().and_then(|d| d.split_once('/')).map(|(p, _)| p)
    }

    /// Suffix part of a DOI (`fmicb.2015.00475` for `10.3389/fmicb.2015.00475`)
    pub fn doi_suffix(&self) -> Option<&str> {
        self.doi().and_then(|d| d.split_once('/')).map(|(_, s)| s)
    }

    /// Curated reference form: `PMID:<digits>` or `doi:<doi>`
    pub fn curie(&self) -> String {
        match self.kind {
            IdentifierKind::Pmid => format!("PMID:{}", self.value),
            IdentifierKind::Doi => format!("doi:{}", self.value),
        }
    }

    /// Stable key for the cache store and request coalescing
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind.tag(), self.value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.curie())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.curie()
    }
}

/// Parse a reference string into a canonical identifier
pub fn parse_identifier(raw: &str) -> Result<Identifier, IdentifierError> {
    Identifier::parse(raw)
}
