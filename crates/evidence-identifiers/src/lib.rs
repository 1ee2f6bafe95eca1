//! Identifier normalization for bibliographic references
//!
//! This crate turns curator-supplied reference strings into canonical keys:
//! - PMID parsing (`PMID:12345678`)
//! - DOI parsing (`doi:10.1234/x`, bare `10.1234/x`, `https://doi.org/...`)
//! - DOI/PMID validation helpers
//! - Semantic Scholar paper id forms

pub mod identifier;
pub mod resolver;
pub mod validators;

pub use identifier::*;
pub use resolver::*;
pub use validators::*;
