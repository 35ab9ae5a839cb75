//! Gateway contracts between the panels and the secrets server.
//!
//! The HTTP implementation lives in `secrets_api_client`; this module owns
//! the error shape, the envelope decoding rules and the traits panels are
//! written against, so they can run against an in-memory fake.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{Envelope, LoginRequest};
use crate::panel::{EditableResource, Resource};

/// Message used when a failed response carries no usable `message`.
pub const REQUEST_FAILED: &str = "Request failed";

/// Fallback message for the login call.
pub const LOGIN_FAILED: &str = "Login failed";

/// Any failed gateway call: a non-success status, an unreadable body or a
/// transport failure. Always carries a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Generic failure for transport and parse errors.
    pub fn fallback(fallback: &str, status: Option<u16>) -> Self {
        Self::new(fallback, status)
    }

    /// The server rejected the credential.
    pub fn is_auth_failure(&self) -> bool {
        self.status == Some(401)
    }
}

/// Decode a response body according to the envelope rules.
///
/// Success resolves to `data` (an empty body or a missing `data` reads as
/// JSON `null`). Failure yields the envelope `message`, or `fallback` when
/// the body is unparsable or the message is empty.
pub fn decode_response<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
    fallback: &str,
) -> Result<T, ApiError> {
    let success = (200..300).contains(&status);
    let envelope = if body.iter().all(u8::is_ascii_whitespace) {
        Some(Envelope::<serde_json::Value> {
            message: None,
            data: None,
        })
    } else {
        serde_json::from_slice::<Envelope<serde_json::Value>>(body).ok()
    };

    if !success {
        let message = envelope
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty());
        return Err(match message {
            Some(m) => ApiError::new(m, Some(status)),
            None => ApiError::fallback(fallback, Some(status)),
        });
    }

    let Some(envelope) = envelope else {
        return Err(ApiError::fallback(fallback, Some(status)));
    };
    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data).map_err(|e| {
        tracing::warn!(status, error = %e, "response data did not match the expected shape");
        ApiError::fallback(fallback, Some(status))
    })
}

/// Unauthenticated credential exchange.
#[async_trait]
pub trait LoginApi: Send + Sync {
    /// Exchange username, password and optional CAPTCHA proof for a session
    /// credential. Never attaches a stored credential.
    async fn login(&self, request: &LoginRequest) -> Result<String, ApiError>;
}

/// List/create/delete calls for one resource kind.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<R::Record>, ApiError>;

    async fn create(&self, draft: &R::Draft) -> Result<(), ApiError>;

    /// Delete by the resource's delete key (secret key, otherwise id).
    async fn delete(&self, key: &str) -> Result<(), ApiError>;

    /// Side data a panel needs alongside its list (permissions need tokens).
    async fn load_context(&self) -> Result<R::Context, ApiError> {
        Ok(R::Context::default())
    }
}

/// Update call for resource kinds that allow editing.
#[async_trait]
pub trait EditApi<R: EditableResource>: ResourceApi<R> {
    async fn update(&self, key: &str, patch: &R::Patch) -> Result<(), ApiError>;
}
