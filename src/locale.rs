//! UI languages and their string tables.
//!
//! Locale selection is purely cosmetic: it picks which `<code>.json` string
//! table the presentation layer shows and never reaches the model prompt.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Ar,
    Fr,
    Pt,
    Ru,
    Zh,
    Ja,
    Hi,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Self::En,
        Self::Es,
        Self::Ar,
        Self::Fr,
        Self::Pt,
        Self::Ru,
        Self::Zh,
        Self::Ja,
        Self::Hi,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Ar => "ar",
            Self::Fr => "fr",
            Self::Pt => "pt",
            Self::Ru => "ru",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Hi => "hi",
        }
    }

    /// Name of the language written in that language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
            Self::Ar => "العربية",
            Self::Fr => "Français",
            Self::Pt => "Português",
            Self::Ru => "Русский",
            Self::Zh => "中文",
            Self::Ja => "日本語",
            Self::Hi => "हिन्दी",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.code() == code)
    }
}

/// English strings used whenever a locale file lacks a key.
const DEFAULT_STRINGS: &[(&str, &str)] = &[
    ("app_title", "FinDocGPT"),
    ("subtitle", "AI-powered financial analyst."),
    ("section_1_header", "1. Upload a Document or Paste Text"),
    ("upload_label", "Upload a PDF, TXT, HTML, DOCX, or XLSX file:"),
    ("or_text", "Or, paste the document text here:"),
    ("section_2_header", "2. Ask the AI a question about the document"),
    ("prompt_summarize", "Summarize the main points."),
    ("prompt_risks", "Identify key risks and opportunities."),
    ("prompt_figures", "Extract all financial figures in a table."),
    ("prompt_label", "Enter your analysis prompt here:"),
    ("prompt_placeholder", "e.g., 'Summarize the main risks in 3 bullet points.'"),
    ("analyze_button", "Analyze Document"),
    ("error_file_upload", "Please upload a file or paste text to analyze."),
    ("error_prompt", "Please enter a prompt for the analysis."),
    ("loading_message", "Analyzing your document with AI..."),
    ("result_header", "Analysis Result"),
    (
        "disclaimer",
        "Disclaimer: This tool is for demonstration purposes only and should not be used for making financial decisions.",
    ),
];

/// Resolved string table for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiStrings {
    pub language: Language,
    pub strings: BTreeMap<String, String>,
}

impl UiStrings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }
}

/// Loads `<dir>/<code>.json` string tables over the built-in defaults.
#[derive(Debug, Clone)]
pub struct LocaleCatalog {
    dir: PathBuf,
}

impl LocaleCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn strings(&self, language: Language) -> UiStrings {
        let mut strings: BTreeMap<String, String> = DEFAULT_STRINGS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let path = self.dir.join(format!("{}.json", language.code()));
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(overrides) => strings.extend(overrides),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Malformed locale file, using defaults");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Locale file not found, using defaults");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read locale file, using defaults");
            }
        }

        UiStrings { language, strings }
    }
}
