//! PDF text extraction with pdfium-render

use pdfium_render::prelude::*;

use super::ExtractionError;

/// Decodes a PDF byte stream into plain text, one line break between pages
pub trait PdfTextDecoder: Send + Sync {
    fn decode(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError>;
}

impl From<PdfiumError> for ExtractionError {
    fn from(e: PdfiumError) -> Self {
        ExtractionError::PdfDecode(e.to_string())
    }
}

/// Production decoder backed by the pdfium native library.
///
/// The library is bound per call, so a host without pdfium yields
/// [`ExtractionError::PdfDecode`] instead of aborting the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumDecoder;

impl PdfTextDecoder for PdfiumDecoder {
    fn decode(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractionError::PdfDecode(format!("pdfium not available: {}", e)))?;
        let pdfium = Pdfium::new(bindings);
        extract_with_pdfium(&pdfium, pdf_bytes)
    }
}

fn extract_with_pdfium(pdfium: &Pdfium, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None)?;

    let mut full_text = String::new();
    for page in document.pages().iter() {
        let text = page.text()?;
        if !full_text.is_empty() {
            full_text.push('\n');
        }
        full_text.push_str(&text.all());
    }

    Ok(full_text)
}

/// Check the `%PDF-` magic, tolerating leading whitespace
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_pdf() {
        assert!(looks_like_pdf(b"%PDF-1.7\n%..."));
        assert!(looks_like_pdf(b"\r\n %PDF-1.4"));
        assert!(!looks_like_pdf(b"<html>%PDF-"));
        assert!(!looks_like_pdf(b""));
    }

    // Decoding real documents requires the pdfium library on the host; the
    // resolver tests exercise decoding through a stub decoder instead.
}
