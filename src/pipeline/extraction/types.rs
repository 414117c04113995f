use super::ExtractionError;
use crate::models::DocumentFormat;

/// Text extraction abstraction (allows mocking for tests).
pub trait TextNormalizer: Send + Sync {
    /// Plain text of `bytes` interpreted as `format`.
    fn extract_text(&self, bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError>;
}

/// Per-format extractor used by `DocumentNormalizer`.
pub trait FormatExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}
