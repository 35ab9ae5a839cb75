//! CAPTCHA widget capability.
//!
//! The third-party widget is reached only through [`CaptchaProvider`], so a
//! browser binding, a terminal prompt and a test fake are interchangeable.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{LoginState, Shared};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptchaError {
    #[error("Failed to load captcha: {0}")]
    Load(String),
    #[error("Failed to render captcha: {0}")]
    Render(String),
}

/// Provider-issued identity of a rendered widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub site_key: String,
}

impl WidgetConfig {
    pub fn new(site_key: impl Into<String>) -> Self {
        Self {
            site_key: site_key.into(),
        }
    }
}

/// A challenge widget implementation.
#[async_trait]
pub trait CaptchaProvider: Send + Sync {
    /// Make the widget available. [`CaptchaHost`] calls this until it
    /// succeeds once.
    async fn load(&self) -> Result<(), CaptchaError>;

    /// Render a widget into `mount`. Outcomes are reported via `callbacks`.
    fn render(
        &self,
        mount: &str,
        config: &WidgetConfig,
        callbacks: CaptchaCallbacks,
    ) -> Result<WidgetHandle, CaptchaError>;

    /// Discard the current proof and require a new solve.
    fn reset(&self, handle: &WidgetHandle);

    /// Unmount the widget and release its handle.
    fn remove(&self, handle: &WidgetHandle);
}

/// Page-wide owner of a provider; loads its script at most once.
pub struct CaptchaHost {
    provider: Arc<dyn CaptchaProvider>,
    loaded: OnceCell<()>,
}

impl CaptchaHost {
    pub fn new(provider: Arc<dyn CaptchaProvider>) -> Self {
        Self {
            provider,
            loaded: OnceCell::new(),
        }
    }

    pub fn provider(&self) -> &dyn CaptchaProvider {
        self.provider.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load the provider once. A failed load is retried on the next call.
    pub async fn ensure_loaded(&self) -> Result<(), CaptchaError> {
        self.loaded
            .get_or_try_init(|| async {
                self.provider.load().await?;
                info!("captcha provider loaded");
                Ok::<(), CaptchaError>(())
            })
            .await
            .map(|_| ())
    }
}

/// Widget callbacks bound to one render of one negotiator.
///
/// Callbacks from a widget that has since been torn down are ignored.
#[derive(Clone)]
pub struct CaptchaCallbacks {
    shared: Weak<Mutex<Shared>>,
    generation: u64,
}

impl CaptchaCallbacks {
    pub(super) fn new(shared: Weak<Mutex<Shared>>, generation: u64) -> Self {
        Self { shared, generation }
    }

    fn apply(&self, f: impl FnOnce(&mut Shared)) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.generation != self.generation {
            debug!("ignoring callback from a removed captcha widget");
            return;
        }
        f(&mut shared);
    }

    /// The operator solved the challenge.
    pub fn solved(&self, proof: impl Into<String>) {
        let proof = proof.into();
        self.apply(|shared| {
            shared.proof = Some(proof);
            if shared.state != LoginState::Submitting {
                shared.state = LoginState::CaptchaSolved;
            }
        });
    }

    /// The proof timed out before it was used.
    pub fn expired(&self) {
        self.apply(Shared::regress);
    }

    /// The widget reported an error.
    pub fn errored(&self) {
        self.apply(Shared::regress);
    }
}
