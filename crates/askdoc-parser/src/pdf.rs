//! PDF extraction using pdf-extract
//!
//! Works on in-memory byte blobs because documents arrive as multipart
//! uploads, never as files on disk.

use askdoc_core::{AskdocError, Result};

/// Text extracted from a single PDF
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Extracted text content
    pub text: String,

    /// Rough page count, estimated from form feed characters
    pub page_estimate: Option<u32>,
}

/// Extract text from an in-memory PDF blob.
pub fn extract_pdf(bytes: &[u8]) -> Result<PdfDocument> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AskdocError::UnreadableDocument(e.to_string()))?;

    // pdf-extract emits a form feed between pages
    let breaks = text.matches('\x0C').count() as u32;
    let page_estimate = if breaks > 0 { Some(breaks + 1) } else { None };

    Ok(PdfDocument {
        text,
        page_estimate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = extract_pdf(b"%PDF-1.7 truncated garbage").unwrap_err();
        assert!(matches!(err, AskdocError::UnreadableDocument(_)));
    }

    #[test]
    fn test_empty_input_is_unreadable() {
        assert!(extract_pdf(b"").is_err());
    }
}
