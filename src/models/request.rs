use std::fmt;
use std::sync::Arc;

use super::document::Document;
use super::enums::AnalysisMode;
use crate::locale::Language;

/// One user-initiated analysis or comparison.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    pub documents: Vec<Arc<Document>>,
    pub user_prompt: String,
    /// UI locale of the requester. Cosmetic only: never part of the prompt.
    pub language: Language,
}

impl AnalysisRequest {
    pub fn single(document: Arc<Document>, user_prompt: impl Into<String>) -> Self {
        Self {
            mode: AnalysisMode::Single,
            documents: vec![document],
            user_prompt: user_prompt.into(),
            language: Language::default(),
        }
    }

    pub fn compare(
        first: Arc<Document>,
        second: Arc<Document>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            mode: AnalysisMode::Compare,
            documents: vec![first, second],
            user_prompt: user_prompt.into(),
            language: Language::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Extracted texts in document order. Documents not yet extracted read as empty.
    pub fn document_texts(&self) -> Vec<&str> {
        self.documents
            .iter()
            .map(|d| d.extracted_text().unwrap_or(""))
            .collect()
    }
}

/// The exact string sent to the model. Immutable once composed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelPrompt(String);

impl ModelPrompt {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ModelPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
