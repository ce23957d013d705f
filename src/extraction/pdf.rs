//! Page-ordered text extraction backed by `lopdf`.

use lopdf::Document;

use super::ExtractionError;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Readers tolerate leading garbage before the header within the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Text pulled from a PDF together with its page count.
#[derive(Debug, Clone)]
pub struct PdfText {
    /// Number of pages declared by the document.
    pub page_count: usize,
    /// Text of all pages in page order, one newline between pages.
    pub text: String,
}

/// Return `true` when the buffer carries a PDF header near its start.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

/// Extract the text layer of every page, in page order.
///
/// Pages whose text cannot be decoded are skipped with a warning; the call only fails when the
/// document cannot be parsed at all or no page yields any text.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<PdfText, ExtractionError> {
    if !looks_like_pdf(bytes) {
        return Err(ExtractionError::NotPdf);
    }

    let document =
        Document::load_mem(bytes).map_err(|error| ExtractionError::Malformed(error.to_string()))?;
    let pages = document.get_pages();
    let page_count = pages.len();

    let mut texts = Vec::with_capacity(page_count);
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    texts.push(trimmed.to_string());
                }
            }
            Err(error) => {
                tracing::warn!(page = page_number, error = %error, "Skipping unreadable PDF page");
            }
        }
    }

    if texts.is_empty() {
        return Err(ExtractionError::NoTextLayer);
    }

    Ok(PdfText {
        page_count,
        text: texts.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::test_support::pdf_with_pages;

    #[test]
    fn header_detection_tolerates_leading_bytes() {
        assert!(looks_like_pdf(b"%PDF-1.7\n"));
        assert!(looks_like_pdf(b"\xEF\xBB\xBF%PDF-1.4"));
        assert!(!looks_like_pdf(b"PK\x03\x04 zip archive"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn extracts_pages_in_order() {
        let bytes = pdf_with_pages(&["First page text", "Second page text"]);
        let extracted = extract_pdf_text(&bytes).expect("text");
        assert_eq!(extracted.page_count, 2);
        let first = extracted.text.find("First").expect("first page");
        let second = extracted.text.find("Second").expect("second page");
        assert!(first < second);
    }

    #[test]
    fn blank_pages_have_no_text_layer() {
        let bytes = pdf_with_pages(&["   "]);
        let error = extract_pdf_text(&bytes).unwrap_err();
        assert!(matches!(error, ExtractionError::NoTextLayer));
    }
}
