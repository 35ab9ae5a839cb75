//! Session credential storage.
//!
//! The credential is an opaque bearer string. Its presence is the only
//! signal for "logged in"; whether it is still valid is decided by the
//! server on the next request.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// Session storage errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable home of the bearer credential.
pub trait SessionStore: Send + Sync {
    fn credential(&self) -> Result<Option<String>, SessionError>;
    fn set_credential(&self, credential: &str) -> Result<(), SessionError>;
    fn clear_credential(&self) -> Result<(), SessionError>;
}

/// Credential kept in a single file so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory.
    pub fn in_data_dir() -> Self {
        Self::new(default_session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn credential(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_credential(&self, credential: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten a file left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(credential.as_bytes())?;
        Ok(())
    }

    fn clear_credential(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Default credential file: `<data_dir>/secrets-console/session`.
pub fn default_session_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("secrets-console")
        .join("session")
}

/// Process-local store, used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: &str) -> Self {
        Self {
            credential: Mutex::new(Some(credential.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn credential(&self) -> Result<Option<String>, SessionError> {
        Ok(self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set_credential(&self, credential: &str) -> Result<(), SessionError> {
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(credential.to_string());
        Ok(())
    }

    fn clear_credential(&self) -> Result<(), SessionError> {
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Logged-in state shared by the views.
///
/// Wraps a [`SessionStore`] and broadcasts the authenticated flag so the
/// login view and the dashboard can swap when it changes.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    authenticated: Arc<watch::Sender<bool>>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let present = match store.credential() {
            Ok(credential) => credential.is_some(),
            Err(e) => {
                warn!(error = %e, "could not read stored credential");
                false
            }
        };
        let (tx, _) = watch::channel(present);
        Self {
            store,
            authenticated: Arc::new(tx),
        }
    }

    /// Underlying store, handed to the gateway so every call can read it.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    /// Persist a freshly issued credential.
    pub fn establish(&self, credential: &str) -> Result<(), SessionError> {
        self.store.set_credential(credential)?;
        self.authenticated.send_replace(true);
        info!("session established");
        Ok(())
    }

    /// Drop the credential, on logout or after the server rejected it.
    ///
    /// The in-memory flag flips even if the store fails to forget.
    pub fn end(&self) -> Result<(), SessionError> {
        let was_authenticated = self.authenticated.send_replace(false);
        if was_authenticated {
            info!("session ended");
        }
        self.store.clear_credential()
    }
}
