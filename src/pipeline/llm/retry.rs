//! Resilient model client: bounded retries with exponential backoff.
//!
//! Retryable failures (rate limiting, server errors, timeouts by default) are
//! retried after `min(base_delay * 2^(k-1), max_delay)` where `k` is the
//! 1-based number of the attempt that just failed. Everything else
//! short-circuits as `CallError::Fatal`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;

use super::types::ModelApi;
use super::{ErrorClass, ModelApiError};
use crate::models::ModelPrompt;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Model unavailable after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: ModelApiError },

    #[error("Model call failed: {0}")]
    Fatal(ModelApiError),

    #[error("Model call gave up after {elapsed:?} ({attempts} attempts): {last}")]
    Timeout {
        elapsed: Duration,
        attempts: u32,
        last: ModelApiError,
    },
}

impl CallError {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::ExhaustedRetries { attempts, .. } | Self::Timeout { attempts, .. } => *attempts,
            Self::Fatal(_) => 1,
        }
    }
}

// ═══════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Adds a uniformly random extra in `[0, delay)` to every sleep.
    pub jitter: bool,
    pub retryable: HashSet<ErrorClass>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            jitter: false,
            retryable: default_retryable(),
        }
    }
}

pub fn default_retryable() -> HashSet<ErrorClass> {
    [ErrorClass::RateLimit, ErrorClass::ServerError, ErrorClass::Timeout]
        .into_iter()
        .collect()
}

impl RetryPolicy {
    pub fn is_retryable(&self, class: ErrorClass) -> bool {
        self.retryable.contains(&class)
    }

    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Nominal (jitter-free) sleep after the 1-based attempt `failed_attempt` failed.
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn sleep_for(&self, failed_attempt: u32) -> Duration {
        let delay = self.backoff_delay(failed_attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let extra_nanos = rand::thread_rng().gen_range(0..delay.as_nanos().min(u64::MAX as u128) as u64);
        delay + Duration::from_nanos(extra_nanos)
    }
}

/// Bookkeeping for one logical call. Never outlives it.
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempt_count: u32,
    pub last_error: Option<ModelApiError>,
    pub next_delay: Option<Duration>,
}

impl RetryState {
    /// Remember a retryable failure and the backoff that follows it.
    pub fn record_failure(&mut self, error: ModelApiError, delay: Duration) {
        self.last_error = Some(error);
        self.next_delay = Some(delay);
    }

    /// Class of the failure being retried, if this is not the first attempt.
    pub fn retrying(&self) -> Option<ErrorClass> {
        self.last_error.as_ref().map(ModelApiError::class)
    }
}

// ═══════════════════════════════════════════
// Clocks
// ═══════════════════════════════════════════

/// Source of time for the retry loop.
pub trait RetryClock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; `sleep` blocks the current thread.
pub struct SystemClock;

impl RetryClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for tests: sleeping advances time instantly and is recorded.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every requested sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += duration;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryClock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}

// ═══════════════════════════════════════════
// Client
// ═══════════════════════════════════════════

/// Raw model text plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub attempts: u32,
}

/// Wraps a `ModelApi` with the retry policy. Holds no state between calls.
pub struct ResilientModelClient {
    api: Box<dyn ModelApi>,
    policy: RetryPolicy,
    clock: Arc<dyn RetryClock>,
}

impl ResilientModelClient {
    pub fn new(api: Box<dyn ModelApi>, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn RetryClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model_name(&self) -> &str {
        self.api.model_name()
    }

    pub fn call(&self, prompt: &ModelPrompt) -> Result<Completion, CallError> {
        self.run(prompt, None)
    }

    /// Like `call`, but gives up with `CallError::Timeout` once `deadline`
    /// (measured from the first attempt) has passed or the next backoff
    /// would cross it.
    pub fn call_with_deadline(
        &self,
        prompt: &ModelPrompt,
        deadline: Duration,
    ) -> Result<Completion, CallError> {
        self.run(prompt, Some(deadline))
    }

    fn run(&self, prompt: &ModelPrompt, deadline: Option<Duration>) -> Result<Completion, CallError> {
        let started = self.clock.now();
        let max_attempts = self.policy.effective_max_attempts();
        let mut state = RetryState::default();

        loop {
            state.attempt_count += 1;
            let attempt = state.attempt_count;
            tracing::debug!(
                attempt,
                max_attempts,
                model = self.api.model_name(),
                prompt_chars = prompt.len(),
                retrying = state.retrying().map(|c| c.as_str()),
                waited_ms = state.next_delay.map(|d| d.as_millis() as u64),
                "Calling model"
            );

            let error = match self.api.send(prompt) {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(attempts = attempt, "Model call succeeded after retry");
                    }
                    return Ok(Completion {
                        text,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            let class = error.class();
            if !self.policy.is_retryable(class) {
                tracing::warn!(
                    attempt,
                    class = class.as_str(),
                    error = %error,
                    "Model call failed with non-retryable error"
                );
                return Err(CallError::Fatal(error));
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    class = class.as_str(),
                    error = %error,
                    "Model call retries exhausted"
                );
                return Err(CallError::ExhaustedRetries {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.policy.sleep_for(attempt);

            if let Some(deadline) = deadline {
                let elapsed = self.clock.now().saturating_duration_since(started);
                if elapsed >= deadline || elapsed + delay > deadline {
                    tracing::warn!(
                        attempts = attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        deadline_ms = deadline.as_millis() as u64,
                        "Model call deadline reached"
                    );
                    return Err(CallError::Timeout {
                        elapsed,
                        attempts: attempt,
                        last: error,
                    });
                }
            }

            tracing::warn!(
                attempt,
                class = class.as_str(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Model call failed, retrying"
            );
            state.record_failure(error, delay);
            self.clock.sleep(delay);
        }
    }
}
