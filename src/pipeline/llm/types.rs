use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::ModelApiError;
use crate::models::ModelPrompt;

/// One request/response exchange with a hosted model. Credentials and
/// endpoint belong to the implementation.
pub trait ModelApi: Send + Sync {
    fn send(&self, prompt: &ModelPrompt) -> Result<String, ModelApiError>;

    /// Model identifier, for logs and health output.
    fn model_name(&self) -> &str;
}

impl<T: ModelApi + ?Sized> ModelApi for Arc<T> {
    fn send(&self, prompt: &ModelPrompt) -> Result<String, ModelApiError> {
        (**self).send(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock model API for testing: replays a script of outcomes in order.
/// Once the script runs out, the last outcome repeats.
pub struct ScriptedModelApi {
    script: Mutex<VecDeque<Result<String, ModelApiError>>>,
    last: Mutex<Option<Result<String, ModelApiError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModelApi {
    pub fn new(script: Vec<Result<String, ModelApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `text`.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Always fails with `error`.
    pub fn failing(error: ModelApiError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl ModelApi for ScriptedModelApi {
    fn send(&self, prompt: &ModelPrompt) -> Result<String, ModelApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.as_str().to_string());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| ModelApiError::Transport("mock state poisoned".into()))?;
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ModelApiError::Transport("empty script".into()))),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
