//! Prompt composition for analysis, comparison, suggestions and summaries.
//!
//! Everything here is pure: the same request always yields the same prompt.
//! The requester's UI language never enters a prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extraction::truncate_chars;
use crate::models::{AnalysisMode, AnalysisRequest, ModelPrompt};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Nothing to analyze: no document text and no question")]
    EmptyInput,

    #[error("{mode} analysis needs {expected} document(s), got {actual}")]
    DocumentCount {
        mode: AnalysisMode,
        expected: usize,
        actual: usize,
    },
}

pub const ANALYST_INSTRUCTION: &str = "You are a financial analyst. The user has provided financial document content and a question about it.
Keep your answer concise and to the point, and base it only on the document content below.
Whenever your answer lists several figures, present them as a table: one header row, then one row per item, cells separated by the | character, for example:
Metric | Value
Revenue | 1200
Put nothing but table cells on table lines.";

/// Appended when the question asks for figures to be extracted.
pub const TABLE_REQUEST: &str =
    "The user wants data extracted: answer with the table, using plain numbers in numeric columns.";

pub const COMPARE_INSTRUCTION: &str =
    "Two documents follow. Compare them and make clear which document each point or figure comes from.";

/// Question fragments that signal a request for tabular data.
pub const EXTRACTION_KEYWORDS: &[&str] = &["table", "figures", "extract data", "json"];

/// Offered when no document is loaded or suggestion generation fails.
pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "Summarize the main points.",
    "Identify key risks and opportunities.",
    "Extract all financial figures in a table.",
];

/// Characters of document text shown to the suggestion prompt.
pub const SUGGESTION_CONTEXT_CHARS: usize = 1_000;

/// Characters of document text shown to the summary prompt.
pub const SUMMARY_CONTEXT_CHARS: usize = 2_000;

/// Whole words only: "profitable" must not ask for a table. Plurals match.
static EXTRACTION_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = EXTRACTION_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternatives})s?\b")).unwrap()
});

pub fn wants_table(question: &str) -> bool {
    EXTRACTION_TRIGGER.is_match(question)
}

/// Single carries one document, Compare two.
pub fn check_document_count(request: &AnalysisRequest) -> Result<(), PromptError> {
    let expected = request.mode.expected_documents();
    let actual = request.documents.len();
    if actual != expected {
        return Err(PromptError::DocumentCount {
            mode: request.mode,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Build the model prompt for one analysis or comparison.
pub fn compose(request: &AnalysisRequest) -> Result<ModelPrompt, PromptError> {
    let texts = request.document_texts();
    let question = request.user_prompt.trim();

    if question.is_empty() && texts.iter().all(|t| t.trim().is_empty()) {
        return Err(PromptError::EmptyInput);
    }
    check_document_count(request)?;

    let mut prompt = String::with_capacity(
        ANALYST_INSTRUCTION.len() + texts.iter().map(|t| t.len()).sum::<usize>() + question.len() + 256,
    );
    prompt.push_str(ANALYST_INSTRUCTION);
    prompt.push('\n');
    if wants_table(question) {
        prompt.push_str(TABLE_REQUEST);
        prompt.push('\n');
    }
    prompt.push('\n');

    match request.mode {
        AnalysisMode::Single => {
            prompt.push_str(&format!("Document:\n{}\n\n", texts[0].trim()));
        }
        AnalysisMode::Compare => {
            prompt.push_str(COMPARE_INSTRUCTION);
            prompt.push_str("\n\n");
            for (i, text) in texts.iter().enumerate() {
                prompt.push_str(&format!("Document {}:\n{}\n\n", i + 1, text.trim()));
            }
        }
    }

    prompt.push_str(&format!("User's question: {question}"));
    Ok(ModelPrompt::new(prompt))
}

// ═══════════════════════════════════════════
// Suggestions
// ═══════════════════════════════════════════

/// Prompt asking for `count` follow-up questions about the document.
pub fn compose_suggestions(document_text: &str, count: usize) -> Result<ModelPrompt, PromptError> {
    let text = document_text.trim();
    if text.is_empty() {
        return Err(PromptError::EmptyInput);
    }
    let count = count.max(1);
    let excerpt = truncate_chars(text, SUGGESTION_CONTEXT_CHARS);
    Ok(ModelPrompt::new(format!(
        "Based on the following financial document, suggest {count} very concise and specific questions a financial analyst might ask.\n\
         Write one question per line, with no numbering and no other text.\n\n\
         Document: {excerpt}..."
    )))
}

/// One suggestion per non-empty line; list markers and quotes are stripped.
/// A JSON array of strings is accepted too.
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    if let Some(items) = json_array(raw) {
        let strings: Vec<String> = items
            .iter()
            .filter_map(|v| v.as_str())
            .map(clean_suggestion)
            .filter(|s| !s.is_empty())
            .collect();
        if !strings.is_empty() {
            return strings;
        }
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(clean_suggestion)
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .collect()
}

fn clean_suggestion(line: &str) -> String {
    let mut s = line.trim();
    s = s.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." / "2)" numbering
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            s = after.trim_start();
        }
    }

    s.trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '`'))
        .trim()
        .to_string()
}

// ═══════════════════════════════════════════
// Summary
// ═══════════════════════════════════════════

/// A titled key section of a document summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySection {
    pub title: String,
    pub summary: String,
}

/// Prompt asking for a 3–5 section breakdown as a JSON array.
pub fn compose_summary(document_text: &str) -> Result<ModelPrompt, PromptError> {
    let text = document_text.trim();
    if text.is_empty() {
        return Err(PromptError::EmptyInput);
    }
    let excerpt = truncate_chars(text, SUMMARY_CONTEXT_CHARS);
    Ok(ModelPrompt::new(format!(
        "Break down the following financial document into 3-5 key sections. \
         For each section, provide a concise title and a short summary. \
         Respond with a JSON array of objects, where each object has keys 'title' and 'summary'.\n\n\
         Document: {excerpt}..."
    )))
}

/// Lenient: prose or code fences around the array are ignored, invalid
/// items are skipped, unparseable output gives an empty list.
pub fn parse_summary(raw: &str) -> Vec<SummarySection> {
    let Some(items) = json_array(raw) else {
        tracing::debug!("Summary response contains no JSON array");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<SummarySection>(v).ok())
        .map(|s| SummarySection {
            title: s.title.trim().to_string(),
            summary: s.summary.trim().to_string(),
        })
        .filter(|s| !s.title.is_empty() && !s.summary.is_empty())
        .collect()
}

/// The outermost `[...]` block of `raw`, if it parses as a JSON array.
fn json_array(raw: &str) -> Option<Vec<serde_json::Value>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(&raw[start..=end]).ok()? {
        serde_json::Value::Array(items) => Some(items),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use crate::models::Document;
    use std::sync::Arc;

    fn doc(text: &str) -> Arc<Document> {
        Arc::new(Document::from_text(text))
    }

    #[test]
    fn single_prompt_layout() {
        let request = AnalysisRequest::single(doc("Revenue: $1.2M"), "What was revenue?");
        let prompt = compose(&request).unwrap();
        let text = prompt.as_str();
        assert!(text.starts_with(ANALYST_INSTRUCTION));
        assert!(text.contains("Document:\nRevenue: $1.2M\n\n"));
        assert!(text.ends_with("User's question: What was revenue?"));
        assert!(!text.contains(TABLE_REQUEST));
        assert!(!text.contains("Document 1:"));
    }

    #[test]
    fn compose_is_deterministic() {
        let first = doc("Q3 net income rose 8%.");
        let second = doc("Q3 net income fell 2%.");
        let a = AnalysisRequest::compare(first.clone(), second.clone(), "Compare net income");
        let b = AnalysisRequest::compare(first, second, "Compare net income");
        assert_eq!(compose(&a).unwrap(), compose(&b).unwrap());
        assert_eq!(compose(&a).unwrap(), compose(&a).unwrap());
    }

    #[test]
    fn language_never_reaches_prompt() {
        let d = doc("Cash flow positive");
        let en = AnalysisRequest::single(d.clone(), "Summarize");
        let ja = AnalysisRequest::single(d, "Summarize").with_language(Language::Ja);
        assert_eq!(compose(&en).unwrap(), compose(&ja).unwrap());
    }

    #[test]
    fn compare_labels_both_documents() {
        let request = AnalysisRequest::compare(doc("Alpha 10-K"), doc("Beta 10-K"), "Which has more debt?");
        let text = compose(&request).unwrap().to_string();
        let first = text.find("Document 1:\nAlpha 10-K").unwrap();
        let second = text.find("Document 2:\nBeta 10-K").unwrap();
        let question = text.find("User's question: Which has more debt?").unwrap();
        assert!(first < second && second < question);
        assert!(text.contains(COMPARE_INSTRUCTION));
    }

    #[test]
    fn extraction_keywords_request_table() {
        for question in [
            "Put the revenue by segment in a TABLE",
            "List the key figures",
            "Please extract data for each quarter",
            "Return JSON",
        ] {
            let request = AnalysisRequest::single(doc("text"), question);
            assert!(compose(&request).unwrap().as_str().contains(TABLE_REQUEST), "{question}");
        }
    }

    #[test]
    fn table_keywords_match_whole_words_only() {
        assert!(wants_table("Compare the tables"));
        assert!(wants_table("figures, please"));
        for question in [
            "Is the company profitable?",
            "Are margins stable?",
            "Any notable events?",
            "Describe the timetable",
            "Explain the jsonb column",
        ] {
            assert!(!wants_table(question), "{question}");
            let request = AnalysisRequest::single(doc("text"), question);
            assert!(!compose(&request).unwrap().as_str().contains(TABLE_REQUEST), "{question}");
        }
    }

    #[test]
    fn empty_input_in_both_modes() {
        let single = AnalysisRequest::single(doc(""), "   ");
        assert_eq!(compose(&single), Err(PromptError::EmptyInput));

        let compare = AnalysisRequest::compare(doc(" "), doc("\n"), "");
        assert_eq!(compose(&compare), Err(PromptError::EmptyInput));
    }

    #[test]
    fn question_alone_is_enough() {
        let request = AnalysisRequest::single(doc(""), "What is EBITDA?");
        assert!(compose(&request).is_ok());
    }

    #[test]
    fn unextracted_document_reads_as_empty() {
        let pending = Arc::new(Document::new(b"%PDF-1.7".to_vec(), crate::models::DocumentFormat::Pdf));
        let request = AnalysisRequest::single(pending, "");
        assert_eq!(compose(&request), Err(PromptError::EmptyInput));
    }

    #[test]
    fn document_count_must_match_mode() {
        let mut request = AnalysisRequest::single(doc("a"), "q");
        request.documents.push(doc("b"));
        assert_eq!(
            compose(&request),
            Err(PromptError::DocumentCount {
                mode: AnalysisMode::Single,
                expected: 1,
                actual: 2
            })
        );

        let mut request = AnalysisRequest::compare(doc("a"), doc("b"), "q");
        request.documents.pop();
        assert!(matches!(
            compose(&request),
            Err(PromptError::DocumentCount { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn suggestion_prompt_uses_excerpt() {
        let long = "x".repeat(5_000);
        let prompt = compose_suggestions(&long, 3).unwrap();
        assert!(prompt.as_str().contains("suggest 3 very concise"));
        assert!(prompt.as_str().contains(&format!("Document: {}...", "x".repeat(1_000))));
        assert!(!prompt.as_str().contains(&"x".repeat(1_001)));
        assert_eq!(compose_suggestions("  ", 3), Err(PromptError::EmptyInput));
    }

    #[test]
    fn suggestions_parse_one_per_line() {
        let raw = "Here are some questions:\n\n1. What drove revenue growth?\n2) How much debt matures in 2025?\n- \"Is the dividend sustainable?\"\n";
        assert_eq!(
            parse_suggestions(raw),
            vec![
                "What drove revenue growth?",
                "How much debt matures in 2025?",
                "Is the dividend sustainable?",
            ]
        );
    }

    #[test]
    fn suggestions_accept_json_array() {
        let raw = "```json\n[\"What is the margin?\", \"Who is the auditor?\"]\n```";
        assert_eq!(
            parse_suggestions(raw),
            vec!["What is the margin?", "Who is the auditor?"]
        );
    }

    #[test]
    fn summary_prompt_uses_excerpt() {
        let long = "y".repeat(3_000);
        let text = compose_summary(&long).unwrap().to_string();
        assert!(text.contains("3-5 key sections"));
        assert!(text.contains(&"y".repeat(2_000)));
        assert!(!text.contains(&"y".repeat(2_001)));
        assert_eq!(compose_summary(""), Err(PromptError::EmptyInput));
    }

    #[test]
    fn summary_tolerates_prose_and_bad_items() {
        let raw = r#"Sure! Here is the breakdown:
```json
[
  {"title": "Revenue", "summary": "Up 12% on services."},
  {"title": "Debt"},
  "not an object",
  {"title": "  ", "summary": "blank title"},
  {"title": "Outlook", "summary": "Guidance raised.", "extra": 1}
]
```"#;
        let sections = parse_summary(raw);
        assert_eq!(
            sections,
            vec![
                SummarySection {
                    title: "Revenue".into(),
                    summary: "Up 12% on services.".into()
                },
                SummarySection {
                    title: "Outlook".into(),
                    summary: "Guidance raised.".into()
                },
            ]
        );
    }

    #[test]
    fn unparseable_summary_is_empty() {
        assert!(parse_summary("I could not summarize this document.").is_empty());
        assert!(parse_summary("[not json]").is_empty());
        assert!(parse_summary(r#"{"title": "x", "summary": "y"}"#).is_empty());
    }
}
