//! Command handlers. Each resource command mounts the matching panel
//! controller for the lifetime of the command and drives one operation.

mod auth;
mod resources;

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use secrets_api_client::Client;
use secrets_core::api::ResourceApi;
use secrets_core::config::{ConsoleConfig, normalize_base_url};
use secrets_core::notify::{NotificationQueue, Severity};
use secrets_core::panel::{
    Clipboard, Confirm, PanelController, PanelDeps, PanelOutcome, Resource,
};
use secrets_core::resources::generate_token;
use secrets_core::session::{FileSessionStore, Session, SessionStore};

use crate::cli::{Cli, Commands, TokensCommand};
use crate::{Error, Result};

pub async fn dispatch(args: Cli) -> Result<()> {
    let Cli {
        url,
        session_file,
        command,
    } = args;
    let ctx = || Context::new(url.as_deref(), session_file.as_deref());

    match command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Status => auth::status(&ctx()?),
        Commands::Login(login) => auth::login(&ctx()?, login).await,
        Commands::Logout => auth::logout(&ctx()?),
        Commands::Secrets(cmd) => resources::secrets(&ctx()?, cmd).await,
        Commands::Users(cmd) => resources::users(&ctx()?, cmd).await,
        Commands::Tokens(TokensCommand::Generate) => {
            println!("{}", generate_token());
            Ok(())
        }
        Commands::Tokens(cmd) => resources::tokens(&ctx()?, cmd).await,
        Commands::Permissions(cmd) => resources::permissions(&ctx()?, cmd).await,
    }
}

/// Everything a command needs, built from the environment and the global
/// flags.
pub struct Context {
    pub config: ConsoleConfig,
    pub session: Session,
    pub client: Arc<Client>,
    pub notifications: NotificationQueue,
}

impl Context {
    fn new(url: Option<&str>, session_file: Option<&Path>) -> Result<Self> {
        let mut config = ConsoleConfig::from_env()?;
        if let Some(url) = url {
            config.base_url = normalize_base_url(url)?;
        }
        if let Some(path) = session_file {
            config.session_file = path.to_path_buf();
        }
        debug!("using {} with session file {}", config.base_url, config.session_file.display());

        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session_file));
        let session = Session::new(store.clone());
        let client = Arc::new(Client::new(&config.base_url, store)?);
        let notifications = NotificationQueue::with_dwell(config.toast_dwell);

        Ok(Self {
            config,
            session,
            client,
            notifications,
        })
    }

    fn deps(&self) -> PanelDeps {
        PanelDeps {
            notifications: self.notifications.clone(),
            session: self.session.clone(),
        }
    }

    /// Mount and load the panel for `R`. Requires a stored credential.
    pub async fn panel<R>(&self) -> Result<PanelController<R, Client>>
    where
        R: Resource,
        Client: ResourceApi<R>,
    {
        if !self.session.is_authenticated() {
            return Err(Error::NotLoggedIn);
        }
        let panel = PanelController::new(self.client.clone(), self.deps());
        let outcome = panel.load().await;
        self.finish(outcome)?;
        Ok(panel)
    }

    /// Print pending toasts, then turn the outcome into a command result.
    pub fn finish(&self, outcome: PanelOutcome) -> Result<()> {
        let (lines, warnings) = drain_toasts(&self.notifications, &outcome);
        for line in lines {
            println!("{line}");
        }
        self.settle(outcome, warnings)
    }

    /// Like [`Self::finish`], but toasts go to the log so stdout carries
    /// only the command's payload.
    pub fn finish_logged(&self, outcome: PanelOutcome) -> Result<()> {
        let (lines, warnings) = drain_toasts(&self.notifications, &outcome);
        for line in lines {
            info!("{line}");
        }
        self.settle(outcome, warnings)
    }

    fn settle(&self, outcome: PanelOutcome, warnings: Vec<String>) -> Result<()> {
        for warning in warnings {
            warn!("{warning}");
        }

        match outcome {
            PanelOutcome::Applied => Ok(()),
            PanelOutcome::Rejected(message) => Err(Error::Custom(message)),
            PanelOutcome::Failed(e) if e.is_auth_failure() => Err(Error::SessionRejected(e)),
            PanelOutcome::Failed(e) => Err(Error::Api(e)),
            PanelOutcome::Busy => Err(Error::Custom("Another request is still pending".into())),
            PanelOutcome::Declined => Err(Error::Custom("Cancelled".into())),
            PanelOutcome::Discarded => Err(Error::Custom("Request abandoned".into())),
        }
    }
}

/// Empty the queue into stdout lines (success and info) and warnings.
///
/// Error toasts become warnings only when the operation itself applied,
/// e.g. a reload that failed after a successful mutation. Otherwise the
/// returned error already carries the same message.
fn drain_toasts(
    notifications: &NotificationQueue,
    outcome: &PanelOutcome,
) -> (Vec<String>, Vec<String>) {
    let mut lines = Vec::new();
    let mut warnings = Vec::new();
    for toast in notifications.toasts() {
        match toast.severity {
            Severity::Error if outcome.is_applied() => warnings.push(toast.message),
            Severity::Error => {}
            Severity::Success | Severity::Info => lines.push(toast.message),
        }
        notifications.dismiss(toast.id);
    }
    (lines, warnings)
}

/// A terminal has no clipboard; copied text is written to stdout.
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) -> core::result::Result<(), String> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{text}")
            .and_then(|()| stdout.flush())
            .map_err(|e| e.to_string())
    }
}

/// Delete confirmation read from the terminal. Anything but `y`/`yes`
/// declines, including a closed stdin.
pub struct TerminalConfirm {
    assume_yes: bool,
}

impl TerminalConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut stdout = std::io::stdout();
        if write!(stdout, "{prompt} [y/N] ").and_then(|()| stdout.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
