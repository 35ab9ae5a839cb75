//! # secrets_api_client
//!
//! reqwest-backed gateway to the secrets server. Implements the
//! `secrets_core` gateway traits so the console panels and login view run
//! against the real backend.
//!
//! Every call reads the credential from the session store at send time and
//! attaches it as a bearer header; login never does. Responses are decoded
//! with [`secrets_core::api::decode_response`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use secrets_core::api::{
    ApiError, EditApi, LOGIN_FAILED, LoginApi, REQUEST_FAILED, ResourceApi, decode_response,
};
use secrets_core::models::{
    LoginData, LoginRequest, Permission, PermissionDraft, PermissionPatch, Secret, SecretDraft,
    SecretPatch, Token, TokenDraft, User, UserDraft,
};
use secrets_core::resources::{Permissions, Secrets, Tokens, Users};
use secrets_core::session::SessionStore;

/// Construction errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL \"{0}\"")]
    InvalidBaseUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Gateway client. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<dyn SessionStore>,
}

impl Client {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Self::with_http(http, base_url, session)
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS roots).
    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidBaseUrl(base_url.to_string());
        let base_url = Url::parse(base_url.trim()).map_err(|_| invalid())?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` plus path segments (each percent-encoded) and query pairs.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.session.credential() {
            Ok(Some(credential)) => builder.bearer_auth(credential),
            Ok(None) => builder,
            Err(e) => {
                warn!(error = %e, "could not read credential, sending request without it");
                builder
            }
        }
    }

    /// Authenticated call. `body`, when present, is sent as JSON.
    pub async fn call<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(%method, %url, "api call");
        let mut builder = self.authorized(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        send(builder, REQUEST_FAILED).await
    }

    async fn get_list<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, ApiError> {
        let url = self.endpoint(segments, &[]);
        let list: Option<Vec<T>> = self.call(Method::GET, url, None::<&()>).await?;
        Ok(list.unwrap_or_default())
    }

    async fn mutate<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.call::<IgnoredAny, B>(method, url, body).await.map(|_| ())
    }
}

/// Send and decode. Transport and body-read failures become `fallback`.
async fn send<T: DeserializeOwned>(builder: RequestBuilder, fallback: &str) -> Result<T, ApiError> {
    let response = builder.send().await.map_err(|e| {
        warn!(error = %e, "request failed");
        ApiError::fallback(fallback, None)
    })?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(|e| {
        warn!(status, error = %e, "could not read response body");
        ApiError::fallback(fallback, Some(status))
    })?;
    debug!(status, bytes = body.len(), "api response");
    decode_response(status, &body, fallback)
}

#[async_trait]
impl LoginApi for Client {
    async fn login(&self, request: &LoginRequest) -> Result<String, ApiError> {
        let url = self.endpoint(&["login"], &[]);
        debug!(%url, username = %request.username, "login call");
        let builder = self.http.post(url).json(request);
        let data: LoginData = send(builder, LOGIN_FAILED).await?;
        Ok(data.token)
    }
}

#[async_trait]
impl ResourceApi<Secrets> for Client {
    async fn list(&self) -> Result<Vec<Secret>, ApiError> {
        self.get_list(&["api", "secrets"]).await
    }

    async fn create(&self, draft: &SecretDraft) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "secrets"], &[]);
        self.mutate(Method::POST, url, Some(draft)).await
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "secrets"], &[("key", key)]);
        self.mutate(Method::DELETE, url, None::<&()>).await
    }
}

#[async_trait]
impl EditApi<Secrets> for Client {
    async fn update(&self, key: &str, patch: &SecretPatch) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "secrets"], &[("key", key)]);
        self.mutate(Method::PUT, url, Some(patch)).await
    }
}

#[async_trait]
impl ResourceApi<Users> for Client {
    async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.get_list(&["api", "users"]).await
    }

    async fn create(&self, draft: &UserDraft) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "users"], &[]);
        self.mutate(Method::POST, url, Some(draft)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "users", id], &[]);
        self.mutate(Method::DELETE, url, None::<&()>).await
    }
}

#[async_trait]
impl ResourceApi<Tokens> for Client {
    async fn list(&self) -> Result<Vec<Token>, ApiError> {
        self.get_list(&["api", "tokens"]).await
    }

    async fn create(&self, draft: &TokenDraft) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "tokens"], &[]);
        self.mutate(Method::POST, url, Some(draft)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "tokens", id], &[]);
        self.mutate(Method::DELETE, url, None::<&()>).await
    }
}

#[async_trait]
impl ResourceApi<Permissions> for Client {
    async fn list(&self) -> Result<Vec<Permission>, ApiError> {
        self.get_list(&["api", "permissions"]).await
    }

    async fn create(&self, draft: &PermissionDraft) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "permissions"], &[]);
        self.mutate(Method::POST, url, Some(draft)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "permissions", id], &[]);
        self.mutate(Method::DELETE, url, None::<&()>).await
    }

    /// Tokens back the selector and the token previews.
    async fn load_context(&self) -> Result<Vec<Token>, ApiError> {
        self.get_list(&["api", "tokens"]).await
    }
}

#[async_trait]
impl EditApi<Permissions> for Client {
    async fn update(&self, id: &str, patch: &PermissionPatch) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "permissions", id], &[]);
        self.mutate(Method::PUT, url, Some(patch)).await
    }
}
