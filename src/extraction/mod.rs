//! PDF text extraction and fixed-window chunking.
//!
//! Extraction is a pure, synchronous transform: PDF bytes in, ordered chunks out. Callers on the
//! async runtime should run [`extract_document`] on the blocking pool.

pub mod chunking;
pub mod metadata;
pub mod pdf;

pub use chunking::{ChunkSettings, chunk_text, expected_chunk_count};
pub use metadata::{PaperMetadata, extract_metadata};
pub use pdf::{PdfText, extract_pdf_text, looks_like_pdf};

use thiserror::Error;

/// Errors raised while turning an uploaded file into chunks.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input does not carry a PDF header.
    #[error("file is not a PDF document")]
    NotPdf,
    /// The PDF structure could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Malformed(String),
    /// The PDF parsed but none of its pages carry extractable text.
    #[error("PDF contains no extractable text layer")]
    NoTextLayer,
    /// Chunking was configured with an impossible window.
    #[error("invalid chunking window: size {size}, overlap {overlap} (overlap must be smaller than size)")]
    InvalidChunking {
        /// Requested chunk size in characters.
        size: usize,
        /// Requested overlap in characters.
        overlap: usize,
    },
}

/// Contiguous span of extracted text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Identifier of the document this chunk belongs to.
    pub document_id: String,
    /// Zero-based position of the chunk in reading order.
    pub index: usize,
    /// Offset of the first character, counted in Unicode scalar values.
    pub char_start: usize,
    /// Offset one past the last character.
    pub char_end: usize,
    /// Chunk text.
    pub text: String,
}

/// Result of running the full extraction pipeline over one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Number of pages in the PDF, including pages without text.
    pub page_count: usize,
    /// Extracted text in reading order.
    pub text: String,
    /// Heuristic bibliographic metadata.
    pub metadata: PaperMetadata,
    /// Ordered, overlapping chunks covering `text`.
    pub chunks: Vec<Chunk>,
}

/// Extract text from a PDF, derive metadata, and split the text into chunks.
pub fn extract_document(
    document_id: &str,
    bytes: &[u8],
    settings: ChunkSettings,
) -> Result<ExtractedDocument, ExtractionError> {
    settings.validate()?;
    let PdfText { page_count, text } = extract_pdf_text(bytes)?;
    let metadata = extract_metadata(&text);
    let chunks = chunk_text(document_id, &text, settings)?;

    tracing::debug!(
        document_id,
        page_count,
        characters = text.chars().count(),
        chunks = chunks.len(),
        has_title = metadata.title.is_some(),
        "Extracted PDF text"
    );

    Ok(ExtractedDocument {
        page_count,
        text,
        metadata,
        chunks,
    })
}

#[cfg(test)]
#[path = "../../tests/common/pdf.rs"]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use super::test_support::pdf_with_pages;
    use super::*;

    #[test]
    fn extract_document_chunks_multi_page_pdf() {
        let bytes = pdf_with_pages(&[
            "Sparse attention for long documents",
            "We evaluate retrieval quality on scientific papers",
            "Results improve recall over dense baselines",
        ]);
        let settings = ChunkSettings::new(40, 10).expect("settings");

        let document = extract_document("doc-1", &bytes, settings).expect("extraction");

        assert_eq!(document.page_count, 3);
        assert!(document.text.contains("Sparse attention"));
        assert!(!document.chunks.is_empty());
        assert_eq!(
            document.chunks.len(),
            expected_chunk_count(document.text.chars().count(), settings)
        );
        assert!(document.chunks.iter().all(|chunk| chunk.document_id == "doc-1"));
    }

    #[test]
    fn extract_document_rejects_plain_text() {
        let error = extract_document(
            "doc-1",
            b"just some notes, definitely not a pdf",
            ChunkSettings::new(100, 10).expect("settings"),
        )
        .unwrap_err();
        assert!(matches!(error, ExtractionError::NotPdf));
    }

    #[test]
    fn extract_document_rejects_truncated_pdf() {
        let error = extract_document(
            "doc-1",
            b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog",
            ChunkSettings::new(100, 10).expect("settings"),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Malformed(_) | ExtractionError::NoTextLayer
        ));
    }
}
