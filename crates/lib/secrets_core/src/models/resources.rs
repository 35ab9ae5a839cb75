//! Resource records and the request bodies that create or change them.
//!
//! Timestamps are kept as the strings the server sent; they are only ever
//! displayed, never compared.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored secret. `value` is transport-encoded (base64) as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Console user. The password is write-only and never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// API token granting read access to secrets through permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Grants a token access to every secret whose key matches the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub token_id: String,
    pub secret_key_pattern: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// `POST /api/secrets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretDraft {
    pub key: String,
    pub value: String,
}

/// `PUT /api/secrets?key=`. The key itself is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretPatch {
    pub value: String,
}

/// `POST /api/users`
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDraft")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /api/tokens`. A missing expiry is sent as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenDraft {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `POST /api/permissions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionDraft {
    pub token_id: String,
    pub secret_key_pattern: String,
}

/// `PUT /api/permissions/{id}`. The token reference is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionPatch {
    pub secret_key_pattern: String,
}
