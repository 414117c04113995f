use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::extraction::DEFAULT_MAX_DOCUMENT_CHARS;
use crate::pipeline::llm::{ErrorClass, RetryPolicy, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "FinDoc";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_LOCALE_DIR: &str = "locales";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// 20 MB, enough for a scanned annual report.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "findoc=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub bind_addr: SocketAddr,
    pub locale_dir: PathBuf,
    pub max_document_chars: usize,
    pub max_upload_bytes: usize,
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Defaults for everything except the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
            locale_dir: PathBuf::from(DEFAULT_LOCALE_DIR),
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut config = Self::new(api_key);

        if let Some(model) = get("FINDOC_MODEL") {
            config.model = model;
        }
        if let Some(url) = get("FINDOC_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("FINDOC_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_var("FINDOC_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("FINDOC_BIND_ADDR") {
            config.bind_addr = parse_var("FINDOC_BIND_ADDR", &v)?;
        }
        if let Some(dir) = get("FINDOC_LOCALE_DIR") {
            config.locale_dir = PathBuf::from(dir);
        }
        if let Some(v) = get("FINDOC_MAX_DOCUMENT_CHARS") {
            config.max_document_chars = parse_var("FINDOC_MAX_DOCUMENT_CHARS", &v)?;
        }
        if let Some(v) = get("FINDOC_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_var("FINDOC_MAX_UPLOAD_BYTES", &v)?;
        }

        if let Some(v) = get("FINDOC_RETRY_MAX_ATTEMPTS") {
            let attempts: u32 = parse_var("FINDOC_RETRY_MAX_ATTEMPTS", &v)?;
            if attempts == 0 {
                return Err(invalid("FINDOC_RETRY_MAX_ATTEMPTS", &v, "must be at least 1"));
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(v) = get("FINDOC_RETRY_BASE_DELAY_MS") {
            config.retry.base_delay = Duration::from_millis(parse_var("FINDOC_RETRY_BASE_DELAY_MS", &v)?);
        }
        if let Some(v) = get("FINDOC_RETRY_MAX_DELAY_MS") {
            config.retry.max_delay = Duration::from_millis(parse_var("FINDOC_RETRY_MAX_DELAY_MS", &v)?);
        }
        if let Some(v) = get("FINDOC_RETRY_JITTER") {
            config.retry.jitter = parse_bool("FINDOC_RETRY_JITTER", &v)?;
        }
        if let Some(v) = get("FINDOC_RETRY_ON") {
            config.retry.retryable = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<ErrorClass>()
                        .map_err(|e| invalid("FINDOC_RETRY_ON", &v, &e.to_string()))
                })
                .collect::<Result<HashSet<_>, _>>()?;
        }

        if config.retry.max_delay < config.retry.base_delay {
            return Err(invalid(
                "FINDOC_RETRY_MAX_DELAY_MS",
                &config.retry.max_delay.as_millis().to_string(),
                "must not be below the base delay",
            ));
        }

        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("bind_addr", &self.bind_addr)
            .field("locale_dir", &self.locale_dir)
            .field("max_document_chars", &self.max_document_chars)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("retry", &self.retry)
            .finish()
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(var, value, &e.to_string()))
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_only_api_key() {
        let config = AppConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "secret")])).unwrap();
        assert_eq!(config.api_key(), "secret");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.max_document_chars, 50_000);
        assert_eq!(config.max_upload_bytes, 20_971_520);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn missing_or_blank_key_is_rejected() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])), Err(ConfigError::MissingApiKey));
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("FINDOC_MODEL", "gemini-1.5-pro"),
            ("FINDOC_API_BASE_URL", "http://localhost:9000/v1/"),
            ("FINDOC_BIND_ADDR", "0.0.0.0:9090"),
            ("FINDOC_RETRY_MAX_ATTEMPTS", "3"),
            ("FINDOC_RETRY_BASE_DELAY_MS", "250"),
            ("FINDOC_RETRY_MAX_DELAY_MS", "4000"),
            ("FINDOC_RETRY_JITTER", "yes"),
            ("FINDOC_RETRY_ON", "rate_limit, timeout"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.api_base_url, "http://localhost:9000/v1");
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(4));
        assert!(config.retry.jitter);
        assert!(config.retry.is_retryable(ErrorClass::RateLimit));
        assert!(config.retry.is_retryable(ErrorClass::Timeout));
        assert!(!config.retry.is_retryable(ErrorClass::ServerError));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("FINDOC_RETRY_MAX_ATTEMPTS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FINDOC_RETRY_MAX_ATTEMPTS", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("FINDOC_RETRY_ON", "rate_limit,sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FINDOC_RETRY_ON", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("FINDOC_RETRY_BASE_DELAY_MS", "5000"),
            ("FINDOC_RETRY_MAX_DELAY_MS", "1000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "FINDOC_RETRY_MAX_DELAY_MS", .. }));
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("FINDOC_RETRY_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig::new("AIzaSyTopSecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIzaSyTopSecret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_NAME, "FinDoc");
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
