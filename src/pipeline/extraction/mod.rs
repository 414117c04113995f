//! Text Normalizer: declared-format bytes → plain text.

pub mod html;
pub mod office;
pub mod orchestrator;
pub mod pdf;
pub mod sanitize;
pub mod text_only;
pub mod types;

pub use orchestrator::*;
pub use sanitize::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt or unreadable document: {0}")]
    CorruptDocument(String),
}

impl From<crate::models::ParseEnumError> for ExtractionError {
    fn from(err: crate::models::ParseEnumError) -> Self {
        ExtractionError::UnsupportedFormat(err.value)
    }
}
