//! Console configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::notify::DEFAULT_DWELL;
use crate::session::default_session_path;

/// Default listen address of the secrets server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7770";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid base URL \"{0}\": expected http(s)://host[:port]")]
    InvalidBaseUrl(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings for the console and its gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
    /// CAPTCHA site key. `None` disables the challenge.
    pub turnstile_site_key: Option<String>,
    /// File holding the session credential.
    pub session_file: PathBuf,
    pub toast_dwell: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            turnstile_site_key: None,
            session_file: default_session_path(),
            toast_dwell: DEFAULT_DWELL,
        }
    }
}

impl ConsoleConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                               |
    /// |--------------------------|---------------------------------------|
    /// | `SECRETS_URL`            | `http://127.0.0.1:7770`               |
    /// | `TURNSTILE_SITE_KEY`     | unset (no CAPTCHA)                    |
    /// | `SECRETS_SESSION_FILE`   | `<data_dir>/secrets-console/session`  |
    /// | `SECRETS_TOAST_DWELL_MS` | `3500`                                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let base_url = match var("SECRETS_URL") {
            Some(raw) => normalize_base_url(&raw)?,
            None => defaults.base_url,
        };
        let toast_dwell = match var("SECRETS_TOAST_DWELL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SECRETS_TOAST_DWELL_MS",
                    value: raw,
                })?,
            None => defaults.toast_dwell,
        };

        Ok(Self {
            base_url,
            turnstile_site_key: var("TURNSTILE_SITE_KEY").map(|k| k.trim().to_string()),
            session_file: var("SECRETS_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            toast_dwell,
        })
    }
}

/// Trim, drop trailing slashes and require an `http(s)://` scheme with a host.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = || ConfigError::InvalidBaseUrl(raw.trim().to_string());
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(invalid());
    };
    if !matches!(scheme, "http" | "https") || rest.trim().is_empty() || rest.starts_with('/') {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}
