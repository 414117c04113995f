use std::sync::OnceLock;

use super::enums::DocumentFormat;
use crate::pipeline::extraction::{ExtractionError, TextNormalizer};

/// An uploaded (or pasted) document.
///
/// Bytes and declared format are fixed at upload. The extracted text is
/// derived once through a `TextNormalizer` and cached for the rest of the
/// session.
#[derive(Debug)]
pub struct Document {
    raw_bytes: Vec<u8>,
    declared_format: DocumentFormat,
    extracted_text: OnceLock<String>,
}

impl Document {
    pub fn new(raw_bytes: Vec<u8>, declared_format: DocumentFormat) -> Self {
        Self {
            raw_bytes,
            declared_format,
            extracted_text: OnceLock::new(),
        }
    }

    /// Document built from text pasted by the user. Already extracted.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let extracted_text = OnceLock::new();
        let _ = extracted_text.set(text.clone());
        Self {
            raw_bytes: text.into_bytes(),
            declared_format: DocumentFormat::Txt,
            extracted_text,
        }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn declared_format(&self) -> DocumentFormat {
        self.declared_format
    }

    /// Cached text, or `None` if extraction has not run yet.
    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.get().map(String::as_str)
    }

    /// Extract (once) and return the document text.
    pub fn extract(&self, normalizer: &dyn TextNormalizer) -> Result<&str, ExtractionError> {
        if let Some(text) = self.extracted_text.get() {
            return Ok(text);
        }
        let text = normalizer.extract_text(&self.raw_bytes, self.declared_format)?;
        Ok(self.extracted_text.get_or_init(|| text).as_str())
    }
}
