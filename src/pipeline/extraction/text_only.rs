use super::types::FormatExtractor;
use super::ExtractionError;

/// Plain UTF-8 text files.
pub struct PlainTextExtractor;

impl FormatExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::CorruptDocument(format!("Text is not valid UTF-8: {e}")))?;
        // Editors on Windows like to prepend a BOM
        Ok(text.trim_start_matches('\u{FEFF}').to_string())
    }
}
