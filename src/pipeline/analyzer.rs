use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::classify::{DelimitedTableClassifier, ResponseShapeClassifier};
use super::extraction::{DocumentNormalizer, ExtractionError, TextNormalizer};
use super::llm::{CallError, GeminiClient, ModelApiError, ResilientModelClient};
use super::prompt::{
    check_document_count, compose, compose_suggestions, compose_summary, parse_suggestions,
    parse_summary, PromptError, SummarySection, DEFAULT_SUGGESTIONS,
};
use crate::config::AppConfig;
use crate::models::{AnalysisRequest, Document, ModelResponse};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Call(#[from] CallError),
}

/// Shaped answer plus the number of model attempts it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub response: ModelResponse,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Generated,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedPrompts {
    pub prompts: Vec<String>,
    pub source: SuggestionSource,
}

impl SuggestedPrompts {
    pub fn defaults() -> Self {
        Self {
            prompts: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            source: SuggestionSource::Default,
        }
    }
}

/// Runs compose → call → classify for one user action.
pub struct DocumentAnalyzer {
    normalizer: Arc<dyn TextNormalizer>,
    client: ResilientModelClient,
    classifier: Box<dyn ResponseShapeClassifier>,
}

impl DocumentAnalyzer {
    pub fn new(normalizer: Arc<dyn TextNormalizer>, client: ResilientModelClient) -> Self {
        Self {
            normalizer,
            client,
            classifier: Box::new(DelimitedTableClassifier::default()),
        }
    }

    /// Gemini-backed analyzer wired from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ModelApiError> {
        let api = GeminiClient::from_config(config)?;
        let client = ResilientModelClient::new(Box::new(api), config.retry.clone());
        let normalizer = Arc::new(DocumentNormalizer::new(config.max_document_chars));
        Ok(Self::new(normalizer, client))
    }

    pub fn with_classifier(mut self, classifier: Box<dyn ResponseShapeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Text of `document`, extracting it on first use.
    pub fn document_text<'a>(&self, document: &'a Document) -> Result<&'a str, ExtractionError> {
        document.extract(self.normalizer.as_ref())
    }

    /// Analyse or compare the request's documents.
    ///
    /// With a `deadline`, retries stop early with `CallError::Timeout` once
    /// the next backoff would overrun it.
    pub fn analyze(
        &self,
        request: &AnalysisRequest,
        deadline: Option<Duration>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "analysis",
            request_id = %request_id,
            mode = request.mode.as_str(),
            documents = request.documents.len()
        );
        let _guard = span.enter();

        check_document_count(request)?;
        for document in &request.documents {
            self.document_text(document)?;
        }

        let prompt = compose(request)?;
        tracing::debug!(prompt_chars = prompt.len(), "Prompt composed");

        let completion = match deadline {
            Some(deadline) => self.client.call_with_deadline(&prompt, deadline),
            None => self.client.call(&prompt),
        }
        .map_err(|e| {
            tracing::warn!(error = %e, attempts = e.attempts(), "Analysis failed");
            e
        })?;

        let response = self.classifier.classify(&completion.text);
        tracing::info!(
            attempts = completion.attempts,
            tabular = response.is_tabular(),
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            response,
            attempts: completion.attempts,
        })
    }

    /// Up to `count` follow-up questions for the document. Falls back to
    /// the static prompts when there is no text or anything goes wrong.
    pub fn suggest_prompts(&self, document_text: &str, count: usize) -> SuggestedPrompts {
        let prompt = match compose_suggestions(document_text, count) {
            Ok(prompt) => prompt,
            Err(_) => return SuggestedPrompts::defaults(),
        };

        match self.client.call(&prompt) {
            Ok(completion) => {
                let prompts: Vec<String> = parse_suggestions(&completion.text)
                    .into_iter()
                    .take(count.max(1))
                    .collect();
                if prompts.is_empty() {
                    tracing::warn!("Model returned no usable suggestions, using defaults");
                    return SuggestedPrompts::defaults();
                }
                SuggestedPrompts {
                    prompts,
                    source: SuggestionSource::Generated,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not generate prompt suggestions, using defaults");
                SuggestedPrompts::defaults()
            }
        }
    }

    /// Key-section summary. Failures are logged and give an empty list.
    pub fn summarize(&self, document_text: &str) -> Vec<SummarySection> {
        let Ok(prompt) = compose_summary(document_text) else {
            return Vec::new();
        };
        match self.client.call(&prompt) {
            Ok(completion) => {
                let sections = parse_summary(&completion.text);
                if sections.is_empty() {
                    tracing::warn!("Summary response had no usable sections");
                }
                sections
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not generate document summary");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, DocumentFormat};
    use crate::pipeline::llm::{ManualClock, RetryPolicy, ScriptedModelApi};

    fn analyzer(api: Arc<ScriptedModelApi>) -> DocumentAnalyzer {
        let client = ResilientModelClient::new(Box::new(api), RetryPolicy::default())
            .with_clock(Arc::new(ManualClock::new()));
        DocumentAnalyzer::new(Arc::new(DocumentNormalizer::default()), client)
    }

    fn text_doc(text: &str) -> Arc<Document> {
        Arc::new(Document::from_text(text))
    }

    #[test]
    fn analysis_returns_table() {
        let api = Arc::new(ScriptedModelApi::replying(
            "Segment | Revenue\n--- | ---\nCloud | 40\nDevices | 25",
        ));
        let analyzer = analyzer(api.clone());
        let request = AnalysisRequest::single(text_doc("Cloud 40, Devices 25"), "Revenue by segment table");

        let outcome = analyzer.analyze(&request, None).unwrap();
        assert_eq!(outcome.attempts, 1);
        let table = outcome.response.parsed_table.expect("table");
        assert_eq!(table.cell(0, "Revenue"), Some(&CellValue::Number(40.0)));
        assert!(table.is_chartable());
        assert!(api.prompts()[0].contains("Cloud 40, Devices 25"));
    }

    #[test]
    fn analysis_extracts_uploaded_bytes() {
        let api = Arc::new(ScriptedModelApi::replying("Net income was $3M."));
        let analyzer = analyzer(api.clone());
        let html = Arc::new(Document::new(
            b"<p>Net income: <b>$3M</b></p>".to_vec(),
            DocumentFormat::Html,
        ));
        let request = AnalysisRequest::single(html.clone(), "What was net income?");

        let outcome = analyzer.analyze(&request, None).unwrap();
        assert!(!outcome.response.is_tabular());
        assert_eq!(html.extracted_text(), Some("Net income: $3M"));
        assert!(api.prompts()[0].contains("Document:\nNet income: $3M"));
    }

    #[test]
    fn corrupt_document_aborts_before_call() {
        let api = Arc::new(ScriptedModelApi::replying("unused"));
        let analyzer = analyzer(api.clone());
        let fake_pdf = Arc::new(Document::new(b"not a pdf".to_vec(), DocumentFormat::Pdf));
        let request = AnalysisRequest::single(fake_pdf, "Summarize");

        let err = analyzer.analyze(&request, None).unwrap_err();
        assert!(matches!(err, AnalysisError::Extraction(ExtractionError::CorruptDocument(_))));
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn document_count_is_checked_before_extraction() {
        let api = Arc::new(ScriptedModelApi::replying("unused"));
        let analyzer = analyzer(api.clone());
        let pdf = Arc::new(Document::new(b"%PDF-1.7 unparsed".to_vec(), DocumentFormat::Pdf));
        let mut request = AnalysisRequest::compare(text_doc("FY23"), text_doc("FY24"), "Compare revenue");
        request.documents.push(pdf.clone());

        let err = analyzer.analyze(&request, None).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Prompt(PromptError::DocumentCount { expected: 2, actual: 3, .. })
        ));
        assert!(pdf.extracted_text().is_none());
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn empty_input_makes_no_call() {
        let api = Arc::new(ScriptedModelApi::replying("unused"));
        let analyzer = analyzer(api.clone());
        let request = AnalysisRequest::compare(text_doc(""), text_doc(""), "");

        let err = analyzer.analyze(&request, None).unwrap_err();
        assert!(matches!(err, AnalysisError::Prompt(PromptError::EmptyInput)));
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn retries_are_counted() {
        let api = Arc::new(ScriptedModelApi::new(vec![
            Err(ModelApiError::RateLimited("quota".into())),
            Err(ModelApiError::Server { status: 500, body: String::new() }),
            Ok("Cash rose.".into()),
        ]));
        let analyzer = analyzer(api);
        let request = AnalysisRequest::single(text_doc("cash"), "What happened to cash?");
        assert_eq!(analyzer.analyze(&request, None).unwrap().attempts, 3);
    }

    #[test]
    fn exhausted_retries_surface() {
        let api = Arc::new(ScriptedModelApi::failing(ModelApiError::RateLimited("quota".into())));
        let analyzer = analyzer(api.clone());
        let request = AnalysisRequest::single(text_doc("x"), "y");

        let err = analyzer.analyze(&request, None).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Call(CallError::ExhaustedRetries { attempts: 5, .. })
        ));
        assert_eq!(api.calls(), 5);
    }

    #[test]
    fn deadline_surfaces_timeout() {
        let api = Arc::new(ScriptedModelApi::failing(ModelApiError::Timeout("slow".into())));
        let analyzer = analyzer(api);
        let request = AnalysisRequest::single(text_doc("x"), "y");

        let err = analyzer
            .analyze(&request, Some(Duration::from_millis(500)))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Call(CallError::Timeout { attempts: 1, .. })));
    }

    #[test]
    fn suggestions_from_model() {
        let api = Arc::new(ScriptedModelApi::replying(
            "1. What drove margin expansion?\n2. How large is the buyback?\n3. What is net debt?\n4. Extra?",
        ));
        let suggested = analyzer(api).suggest_prompts("Annual report text", 3);
        assert_eq!(suggested.source, SuggestionSource::Generated);
        assert_eq!(
            suggested.prompts,
            vec![
                "What drove margin expansion?",
                "How large is the buyback?",
                "What is net debt?",
            ]
        );
    }

    #[test]
    fn suggestions_fall_back_on_failure() {
        let api = Arc::new(ScriptedModelApi::failing(ModelApiError::Unauthorized("bad key".into())));
        let suggested = analyzer(api).suggest_prompts("Annual report text", 3);
        assert_eq!(suggested, SuggestedPrompts::defaults());
        assert_eq!(suggested.prompts[2], "Extract all financial figures in a table.");
    }

    #[test]
    fn suggestions_without_text_use_defaults_without_call() {
        let api = Arc::new(ScriptedModelApi::replying("unused"));
        let suggested = analyzer(api.clone()).suggest_prompts("   ", 3);
        assert_eq!(suggested.source, SuggestionSource::Default);
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn summary_sections() {
        let api = Arc::new(ScriptedModelApi::replying(
            r#"[{"title": "Results", "summary": "Record revenue."}, {"title": "Risks", "summary": "FX exposure."}]"#,
        ));
        let sections = analyzer(api).summarize("Annual report");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].title, "Risks");
    }

    #[test]
    fn summary_failure_is_empty() {
        let api = Arc::new(ScriptedModelApi::failing(ModelApiError::Blocked("SAFETY".into())));
        assert!(analyzer(api).summarize("Annual report").is_empty());
    }
}
