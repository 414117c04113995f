use super::types::FormatExtractor;
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl FormatExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        // Magic bytes first: pdf-extract error messages are not useful to users
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractionError::CorruptDocument(
                "File does not start with a PDF header".into(),
            ));
        }

        // pdf-extract panics on some malformed fonts and xref tables
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| ExtractionError::CorruptDocument("PDF parser aborted".into()))?
            .map_err(|e| ExtractionError::CorruptDocument(format!("PDF parsing failed: {e}")))?;

        if text.trim().is_empty() {
            tracing::warn!(
                size_bytes = bytes.len(),
                "PDF has no text layer (scanned document?)"
            );
        }

        Ok(text)
    }
}
