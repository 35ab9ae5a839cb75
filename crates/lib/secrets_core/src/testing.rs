//! In-memory backend shared by the panel and console tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::api::{ApiError, EditApi, LoginApi, ResourceApi};
use crate::models::{
    LoginRequest, Permission, PermissionDraft, PermissionPatch, Secret, SecretDraft, SecretPatch,
    Token, TokenDraft, User, UserDraft,
};
use crate::resources::{Permissions, Secrets, Tokens, Users};

#[derive(Default)]
struct Store {
    secrets: Vec<Secret>,
    users: Vec<User>,
    tokens: Vec<Token>,
    permissions: Vec<Permission>,
    next_id: u64,
}

impl Store {
    fn id(&mut self) -> String {
        self.next_id += 1;
        format!("id-{:08}", self.next_id)
    }
}

/// Behaves like the secrets server: stores values base64-encoded, assigns
/// ids and answers with the server's error messages.
#[derive(Default)]
pub(crate) struct FakeBackend {
    store: Mutex<Store>,
    /// Fails the next call with this error.
    pub fail_next: Mutex<Option<ApiError>>,
    /// Held by a test to keep calls pending.
    pub gate: tokio::sync::Mutex<()>,
    pub calls: AtomicUsize,
}

fn not_found(what: &str) -> ApiError {
    ApiError::new(format!("{what} not found"), Some(404))
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_with(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn seed_token(&self, token: &str) -> String {
        let mut store = self.store.lock().unwrap();
        let id = store.id();
        store.tokens.push(Token {
            id: id.clone(),
            token: token.to_string(),
            expires_at: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        });
        id
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<std::sync::MutexGuard<'_, Store>, ApiError> {
        drop(self.gate.lock().await);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.store.lock().unwrap())
    }
}

#[async_trait]
impl LoginApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<String, ApiError> {
        drop(self.enter().await?);
        if request.username == "admin" && request.password == "pw" {
            Ok("jwt-token".into())
        } else {
            Err(ApiError::new("invalid credentials", Some(401)))
        }
    }
}

#[async_trait]
impl ResourceApi<Secrets> for FakeBackend {
    async fn list(&self) -> Result<Vec<Secret>, ApiError> {
        Ok(self.enter().await?.secrets.clone())
    }

    async fn create(&self, draft: &SecretDraft) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        if store.secrets.iter().any(|s| s.key == draft.key) {
            return Err(ApiError::new("secret already exists", Some(409)));
        }
        let id = store.id();
        store.secrets.push(Secret {
            id,
            key: draft.key.clone(),
            value: STANDARD.encode(&draft.value),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let before = store.secrets.len();
        store.secrets.retain(|s| s.key != key);
        if store.secrets.len() == before {
            return Err(not_found("secret"));
        }
        Ok(())
    }
}

#[async_trait]
impl EditApi<Secrets> for FakeBackend {
    async fn update(&self, key: &str, patch: &SecretPatch) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let secret = store
            .secrets
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| not_found("secret"))?;
        secret.value = STANDARD.encode(&patch.value);
        secret.updated_at = "2026-01-02T00:00:00Z".into();
        Ok(())
    }
}

#[async_trait]
impl ResourceApi<Users> for FakeBackend {
    async fn list(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.enter().await?.users.clone())
    }

    async fn create(&self, draft: &UserDraft) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let id = store.id();
        store.users.push(User {
            id,
            username: draft.username.clone(),
            created_at: String::new(),
            updated_at: String::new(),
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let before = store.users.len();
        store.users.retain(|u| u.id != id);
        if store.users.len() == before {
            return Err(not_found("user"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceApi<Tokens> for FakeBackend {
    async fn list(&self) -> Result<Vec<Token>, ApiError> {
        Ok(self.enter().await?.tokens.clone())
    }

    async fn create(&self, draft: &TokenDraft) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let id = store.id();
        store.tokens.push(Token {
            id,
            token: draft.token.clone(),
            expires_at: draft.expires_at.map(|t| t.to_rfc3339()),
            created_at: String::new(),
            updated_at: String::new(),
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let before = store.tokens.len();
        store.tokens.retain(|t| t.id != id);
        if store.tokens.len() == before {
            return Err(not_found("token"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceApi<Permissions> for FakeBackend {
    async fn list(&self) -> Result<Vec<Permission>, ApiError> {
        Ok(self.enter().await?.permissions.clone())
    }

    async fn create(&self, draft: &PermissionDraft) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        if !store.tokens.iter().any(|t| t.id == draft.token_id) {
            return Err(not_found("token"));
        }
        let id = store.id();
        store.permissions.push(Permission {
            id,
            token_id: draft.token_id.clone(),
            secret_key_pattern: draft.secret_key_pattern.clone(),
            created_at: String::new(),
            updated_at: String::new(),
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let before = store.permissions.len();
        store.permissions.retain(|p| p.id != id);
        if store.permissions.len() == before {
            return Err(not_found("permission"));
        }
        Ok(())
    }

    async fn load_context(&self) -> Result<Vec<Token>, ApiError> {
        Ok(self.enter().await?.tokens.clone())
    }
}

#[async_trait]
impl EditApi<Permissions> for FakeBackend {
    async fn update(&self, id: &str, patch: &PermissionPatch) -> Result<(), ApiError> {
        let mut store = self.enter().await?;
        let permission = store
            .permissions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("permission"))?;
        permission.secret_key_pattern = patch.secret_key_pattern.clone();
        Ok(())
    }
}
