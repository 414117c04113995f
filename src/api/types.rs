//! Shared state and request payloads for the API layer.

use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::locale::{Language, LocaleCatalog};
use crate::models::{Document, DocumentFormat};
use crate::pipeline::DocumentAnalyzer;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared, read-only context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AppConfig>,
    pub analyzer: Arc<DocumentAnalyzer>,
    pub locales: Arc<LocaleCatalog>,
}

impl ApiContext {
    pub fn new(config: Arc<AppConfig>, analyzer: Arc<DocumentAnalyzer>) -> Self {
        let locales = Arc::new(LocaleCatalog::new(config.locale_dir.clone()));
        Self {
            config,
            analyzer,
            locales,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Document payloads
// ═══════════════════════════════════════════════════════════

/// A document as sent by the presentation layer: either pasted `text`, or
/// base64 `data` (data URLs accepted) with a `format` tag or a `file_name`
/// to infer it from.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentPayload {
    pub text: Option<String>,
    pub data: Option<String>,
    pub format: Option<String>,
    pub file_name: Option<String>,
}

impl DocumentPayload {
    pub fn into_document(self) -> Result<Document, ApiError> {
        if let Some(text) = self.text {
            return Ok(Document::from_text(text));
        }

        let data = self
            .data
            .ok_or_else(|| ApiError::BadRequest("Document needs either 'text' or 'data'".into()))?;

        let format = match (self.format.as_deref(), self.file_name.as_deref()) {
            (Some(tag), _) => tag
                .parse::<DocumentFormat>()
                .map_err(|e| ApiError::UnsupportedFormat(e.value))?,
            (None, Some(name)) => DocumentFormat::from_file_name(name)
                .ok_or_else(|| ApiError::UnsupportedFormat(name.to_string()))?,
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "Document needs a 'format' or 'file_name'".into(),
                ))
            }
        };

        let bytes = decode_data_url(&data)
            .map_err(|e| ApiError::BadRequest(format!("Invalid document data: {e}")))?;
        Ok(Document::new(bytes, format))
    }
}

/// Parse an optional UI language code; unknown codes fall back to English.
pub fn parse_language(code: Option<&str>) -> Language {
    code.and_then(Language::from_code).unwrap_or_default()
}

/// Decode a base64 data URL (`data:application/pdf;base64,...`) or raw base64.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn text_payload_is_pre_extracted() {
        let payload = DocumentPayload {
            text: Some("Revenue 100".into()),
            ..Default::default()
        };
        let doc = payload.into_document().unwrap();
        assert_eq!(doc.declared_format(), DocumentFormat::Txt);
        assert_eq!(doc.extracted_text(), Some("Revenue 100"));
    }

    #[test]
    fn data_url_with_format() {
        let payload = DocumentPayload {
            data: Some(format!("data:text/html;base64,{}", b64(b"<p>Hi</p>"))),
            format: Some("HTML".into()),
            ..Default::default()
        };
        let doc = payload.into_document().unwrap();
        assert_eq!(doc.declared_format(), DocumentFormat::Html);
        assert_eq!(doc.raw_bytes(), b"<p>Hi</p>");
        assert_eq!(doc.extracted_text(), None);
    }

    #[test]
    fn format_inferred_from_file_name() {
        let payload = DocumentPayload {
            data: Some(b64(b"PK")),
            file_name: Some("Q3 results.xlsx".into()),
            ..Default::default()
        };
        assert_eq!(payload.into_document().unwrap().declared_format(), DocumentFormat::Xlsx);
    }

    #[test]
    fn unknown_format_is_unsupported() {
        let payload = DocumentPayload {
            data: Some(b64(b"slides")),
            format: Some("pptx".into()),
            ..Default::default()
        };
        assert!(matches!(payload.into_document(), Err(ApiError::UnsupportedFormat(f)) if f == "pptx"));
    }

    #[test]
    fn missing_data_and_format_are_bad_requests() {
        assert!(matches!(
            DocumentPayload::default().into_document(),
            Err(ApiError::BadRequest(_))
        ));
        let payload = DocumentPayload {
            data: Some(b64(b"x")),
            ..Default::default()
        };
        assert!(matches!(payload.into_document(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn invalid_base64_is_bad_request() {
        let payload = DocumentPayload {
            data: Some("not-valid-base64!!!".into()),
            format: Some("pdf".into()),
            ..Default::default()
        };
        assert!(matches!(payload.into_document(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn language_codes() {
        assert_eq!(parse_language(Some("ar")), Language::Ar);
        assert_eq!(parse_language(Some("xx")), Language::En);
        assert_eq!(parse_language(None), Language::En);
    }
}
