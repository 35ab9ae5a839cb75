//! Login negotiation.
//!
//! Drives the optional CAPTCHA challenge and the credential exchange:
//!
//! ```text
//! Idle -> CaptchaPending -> CaptchaSolved -> Submitting -> Authenticated
//!                ^                                     \-> Failed
//!                \---------- expiry / widget error
//! ```
//!
//! Without a site key the CAPTCHA states are skipped and `Idle` accepts a
//! submission directly. Persisting the credential is the caller's job.

mod captcha;

pub use captcha::{
    CaptchaCallbacks, CaptchaError, CaptchaHost, CaptchaProvider, WidgetConfig, WidgetHandle,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, LoginApi};
use crate::models::LoginRequest;

/// Message shown when a challenge is configured but unsolved.
pub const CAPTCHA_REQUIRED: &str = "Please complete the captcha";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("{}", CAPTCHA_REQUIRED)]
    CaptchaRequired,

    #[error("A login attempt is already in progress")]
    InProgress,

    /// The login view was torn down before the server answered.
    #[error("Login abandoned")]
    Discarded,

    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    /// The server refused the exchange; carries its message.
    #[error(transparent)]
    Rejected(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    CaptchaPending,
    CaptchaSolved,
    Submitting,
    Authenticated,
    /// Last attempt failed with this message.
    Failed(String),
}

enum WidgetSlot {
    Empty,
    /// Script loading or render in progress.
    Rendering,
    Mounted(WidgetHandle),
}

pub(crate) struct Shared {
    state: LoginState,
    proof: Option<String>,
    widget: WidgetSlot,
    /// Bumped on teardown; callbacks and renders from older generations are
    /// ignored.
    generation: u64,
}

impl Shared {
    /// Drop the proof and ask for a new solve.
    fn regress(&mut self) {
        self.proof = None;
        if !matches!(
            self.state,
            LoginState::Submitting | LoginState::Authenticated
        ) {
            self.state = LoginState::CaptchaPending;
        }
    }
}

struct CaptchaSetup {
    host: Arc<CaptchaHost>,
    config: WidgetConfig,
    mount: String,
}

/// Login view controller.
pub struct LoginNegotiator {
    api: Arc<dyn LoginApi>,
    captcha: Option<CaptchaSetup>,
    shared: Arc<Mutex<Shared>>,
}

impl LoginNegotiator {
    pub fn new(api: Arc<dyn LoginApi>) -> Self {
        Self {
            api,
            captcha: None,
            shared: Arc::new(Mutex::new(Shared {
                state: LoginState::Idle,
                proof: None,
                widget: WidgetSlot::Empty,
                generation: 0,
            })),
        }
    }

    /// Gate submission behind a challenge rendered into `mount`.
    /// A blank site key leaves the challenge disabled.
    pub fn with_captcha(
        mut self,
        host: Arc<CaptchaHost>,
        site_key: &str,
        mount: impl Into<String>,
    ) -> Self {
        let site_key = site_key.trim();
        if !site_key.is_empty() {
            self.captcha = Some(CaptchaSetup {
                host,
                config: WidgetConfig::new(site_key),
                mount: mount.into(),
            });
        }
        self
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn requires_captcha(&self) -> bool {
        self.captcha.is_some()
    }

    pub fn state(&self) -> LoginState {
        self.shared().state.clone()
    }

    pub fn has_proof(&self) -> bool {
        self.shared().proof.is_some()
    }

    /// Show the login view: load and render the challenge when configured.
    ///
    /// Renders at most one widget; calling again while one is rendering or
    /// mounted does nothing.
    pub async fn mount(&self) -> Result<(), LoginError> {
        let Some(captcha) = &self.captcha else {
            return Ok(());
        };

        let generation = {
            let mut shared = self.shared();
            if !matches!(shared.widget, WidgetSlot::Empty) {
                return Ok(());
            }
            shared.widget = WidgetSlot::Rendering;
            if shared.proof.is_none() {
                shared.state = LoginState::CaptchaPending;
            }
            shared.generation
        };

        if let Err(e) = captcha.host.ensure_loaded().await {
            warn!(error = %e, "captcha unavailable");
            self.abandon_render(generation);
            return Err(e.into());
        }
        if self.shared().generation != generation {
            debug!("login view torn down before the captcha loaded");
            return Ok(());
        }

        let callbacks = CaptchaCallbacks::new(Arc::downgrade(&self.shared), generation);
        let provider = captcha.host.provider();
        match provider.render(&captcha.mount, &captcha.config, callbacks) {
            Ok(handle) => {
                let mut shared = self.shared();
                if shared.generation == generation {
                    debug!(widget = %handle.0, "captcha rendered");
                    shared.widget = WidgetSlot::Mounted(handle);
                } else {
                    drop(shared);
                    provider.remove(&handle);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "captcha render failed");
                self.abandon_render(generation);
                Err(e.into())
            }
        }
    }

    fn abandon_render(&self, generation: u64) {
        let mut shared = self.shared();
        if shared.generation == generation {
            shared.widget = WidgetSlot::Empty;
        }
    }

    /// Exchange the credentials for a session credential.
    ///
    /// Fails locally, without a request, when a challenge is configured and
    /// unsolved. A rejected attempt resets the widget since proofs are
    /// single-use.
    pub async fn submit(&self, username: &str, password: &str) -> Result<String, LoginError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let (request, generation) = {
            let mut shared = self.shared();
            if shared.state == LoginState::Submitting {
                return Err(LoginError::InProgress);
            }
            if self.captcha.is_some() && shared.proof.is_none() {
                return Err(LoginError::CaptchaRequired);
            }
            shared.state = LoginState::Submitting;
            let request = LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
                captcha_token: shared.proof.clone().unwrap_or_default(),
            };
            (request, shared.generation)
        };

        let result = self.api.login(&request).await;
        if self.shared().generation != generation {
            debug!(username, "login view torn down before the server answered");
            return Err(LoginError::Discarded);
        }

        match result {
            Ok(credential) => {
                let mut shared = self.shared();
                shared.state = LoginState::Authenticated;
                shared.proof = None;
                info!(username, "login succeeded");
                Ok(credential)
            }
            Err(e) => {
                warn!(username, error = %e, "login failed");
                let mounted = {
                    let mut shared = self.shared();
                    shared.state = LoginState::Failed(e.message.clone());
                    shared.proof = None;
                    match &shared.widget {
                        WidgetSlot::Mounted(handle) => Some(handle.clone()),
                        _ => None,
                    }
                };
                if let (Some(captcha), Some(handle)) = (&self.captcha, mounted) {
                    captcha.host.provider().reset(&handle);
                }
                Err(LoginError::Rejected(e))
            }
        }
    }

    /// Leave the login view: remove any live widget. The next [`mount`]
    /// renders a fresh one.
    ///
    /// [`mount`]: Self::mount
    pub fn teardown(&self) {
        let mounted = {
            let mut shared = self.shared();
            shared.generation += 1;
            shared.proof = None;
            shared.state = LoginState::Idle;
            match std::mem::replace(&mut shared.widget, WidgetSlot::Empty) {
                WidgetSlot::Mounted(handle) => Some(handle),
                _ => None,
            }
        };
        if let (Some(captcha), Some(handle)) = (&self.captcha, mounted) {
            debug!(widget = %handle.0, "removing captcha");
            captcha.host.provider().remove(&handle);
        }
    }
}
