//! Askdoc Parser - PDF text extraction and document loading
//!
//! Turns uploaded PDF blobs into the single text string the retrieval
//! pipeline chunks and embeds. Extraction failures surface as
//! [`AskdocError::UnreadableDocument`]; there are no side effects beyond
//! reading the input bytes.

pub mod pdf;

pub use pdf::{extract_pdf, PdfDocument};

use askdoc_core::Result;

/// The combined text of one ingestion batch.
#[derive(Debug, Clone)]
pub struct LoadedDocuments {
    /// Extracted text of every input document, in input order, separated
    /// by newlines
    pub text: String,

    /// Combined page estimate across all documents, when available
    pub page_estimate: Option<u32>,
}

/// Extract and concatenate a batch of PDF blobs.
///
/// Documents are concatenated in input order with a newline separator.
/// Any unreadable blob fails the whole batch.
pub fn load_documents<B: AsRef<[u8]>>(blobs: &[B]) -> Result<LoadedDocuments> {
    let mut text = String::new();
    let mut page_estimate: Option<u32> = None;

    for blob in blobs {
        let doc = extract_pdf(blob.as_ref())?;

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&doc.text);

        if let Some(pages) = doc.page_estimate {
            page_estimate = Some(page_estimate.unwrap_or(0) + pages);
        }
    }

    tracing::debug!(
        documents = blobs.len(),
        chars = text.len(),
        "loaded document batch"
    );

    Ok(LoadedDocuments {
        text,
        page_estimate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdoc_core::AskdocError;

    #[test]
    fn test_empty_batch_yields_empty_text() {
        let loaded = load_documents::<Vec<u8>>(&[]).unwrap();
        assert!(loaded.text.is_empty());
        assert!(loaded.page_estimate.is_none());
    }

    #[test]
    fn test_unreadable_blob_fails_batch() {
        let blobs = vec![b"definitely not a pdf".to_vec()];
        let err = load_documents(&blobs).unwrap_err();
        assert!(matches!(err, AskdocError::UnreadableDocument(_)));
    }
}
