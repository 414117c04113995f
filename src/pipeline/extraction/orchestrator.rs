use super::html::HtmlExtractor;
use super::office::{DocxExtractor, XlsxExtractor};
use super::pdf::PdfTextExtractor;
use super::sanitize::{sanitize_extracted_text, truncate_chars};
use super::text_only::PlainTextExtractor;
use super::types::{FormatExtractor, TextNormalizer};
use super::ExtractionError;
use crate::models::DocumentFormat;

/// Upper bound on extracted characters handed to the model.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 50_000;

/// Concrete text normalizer: dispatches on the declared format, sanitizes,
/// then truncates to `max_chars`.
pub struct DocumentNormalizer {
    max_chars: usize,
}

impl DocumentNormalizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Same as `extract_text`, with the format given as a free-form tag
    /// (e.g. from an upload form). Unknown tags → `UnsupportedFormat`.
    pub fn extract_tagged(&self, bytes: &[u8], tag: &str) -> Result<String, ExtractionError> {
        let format: DocumentFormat = tag.parse()?;
        self.extract_text(bytes, format)
    }

    fn extractor_for(format: DocumentFormat) -> &'static dyn FormatExtractor {
        match format {
            DocumentFormat::Pdf => &PdfTextExtractor,
            DocumentFormat::Txt => &PlainTextExtractor,
            DocumentFormat::Html => &HtmlExtractor,
            DocumentFormat::Docx => &DocxExtractor,
            DocumentFormat::Xlsx => &XlsxExtractor,
        }
    }
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DOCUMENT_CHARS)
    }
}

impl TextNormalizer for DocumentNormalizer {
    fn extract_text(&self, bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
        tracing::debug!(
            format = format.as_str(),
            size_bytes = bytes.len(),
            "Starting text extraction"
        );

        let raw = Self::extractor_for(format).extract(bytes).map_err(|e| {
            tracing::warn!(format = format.as_str(), error = %e, "Text extraction failed");
            e
        })?;

        let clean = sanitize_extracted_text(&raw);
        let kept = truncate_chars(&clean, self.max_chars);
        if kept.len() < clean.len() {
            tracing::info!(
                format = format.as_str(),
                max_chars = self.max_chars,
                "Extracted text truncated"
            );
        }

        tracing::info!(
            format = format.as_str(),
            chars = kept.chars().count(),
            "Text extraction complete"
        );
        Ok(kept.to_string())
    }
}
