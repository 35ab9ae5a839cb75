//! Response envelope and login payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `{message, data}` wrapper used by every response, success or failure.
///
/// Both fields are optional on the wire: failures often carry no `data`, and
/// DELETE endpoints answer with `data: null`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

/// `POST /login` body.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// CAPTCHA proof; sent as an empty string when no challenge is configured.
    #[serde(rename = "captchaToken")]
    pub captcha_token: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("captcha_token", &!self.captcha_token.is_empty())
            .finish()
    }
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
}
