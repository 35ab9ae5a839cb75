//! Console orchestration.
//!
//! Ties the session, router, notification queue and login negotiator to the
//! four resource panels. Exactly one panel is mounted at a time: the one the
//! current route names, and only while a session exists.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{EditApi, LoginApi, ResourceApi};
use crate::login::{CaptchaHost, LoginError, LoginNegotiator};
use crate::notify::NotificationQueue;
use crate::panel::{PanelController, PanelDeps, PanelOutcome};
use crate::resources::{Permissions, Secrets, Tokens, Users};
use crate::router::{HashRouter, Route};
use crate::session::{Session, SessionError};

/// Mount point handed to the CAPTCHA provider.
pub const CAPTCHA_MOUNT: &str = "captcha";

/// Every gateway call the console needs.
pub trait ConsoleApi:
    LoginApi
    + EditApi<Secrets>
    + ResourceApi<Users>
    + ResourceApi<Tokens>
    + EditApi<Permissions>
    + 'static
{
}

impl<T> ConsoleApi for T where
    T: LoginApi
        + EditApi<Secrets>
        + ResourceApi<Users>
        + ResourceApi<Tokens>
        + EditApi<Permissions>
        + 'static
{
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The mounted panel.
pub enum ActivePanel<A: ConsoleApi> {
    Secrets(Arc<PanelController<Secrets, A>>),
    Users(Arc<PanelController<Users, A>>),
    Tokens(Arc<PanelController<Tokens, A>>),
    Permissions(Arc<PanelController<Permissions, A>>),
}

impl<A: ConsoleApi> Clone for ActivePanel<A> {
    fn clone(&self) -> Self {
        match self {
            ActivePanel::Secrets(p) => ActivePanel::Secrets(p.clone()),
            ActivePanel::Users(p) => ActivePanel::Users(p.clone()),
            ActivePanel::Tokens(p) => ActivePanel::Tokens(p.clone()),
            ActivePanel::Permissions(p) => ActivePanel::Permissions(p.clone()),
        }
    }
}

impl<A: ConsoleApi> ActivePanel<A> {
    fn build(route: Route, api: Arc<A>, deps: PanelDeps) -> Self {
        match route {
            Route::Secrets => ActivePanel::Secrets(Arc::new(PanelController::new(api, deps))),
            Route::Users => ActivePanel::Users(Arc::new(PanelController::new(api, deps))),
            Route::Tokens => ActivePanel::Tokens(Arc::new(PanelController::new(api, deps))),
            Route::Permissions => {
                ActivePanel::Permissions(Arc::new(PanelController::new(api, deps)))
            }
        }
    }

    pub fn route(&self) -> Route {
        match self {
            ActivePanel::Secrets(_) => Route::Secrets,
            ActivePanel::Users(_) => Route::Users,
            ActivePanel::Tokens(_) => Route::Tokens,
            ActivePanel::Permissions(_) => Route::Permissions,
        }
    }

    pub async fn load(&self) -> PanelOutcome {
        match self {
            ActivePanel::Secrets(p) => p.load().await,
            ActivePanel::Users(p) => p.load().await,
            ActivePanel::Tokens(p) => p.load().await,
            ActivePanel::Permissions(p) => p.load().await,
        }
    }

    pub fn unmount(&self) {
        match self {
            ActivePanel::Secrets(p) => p.unmount(),
            ActivePanel::Users(p) => p.unmount(),
            ActivePanel::Tokens(p) => p.unmount(),
            ActivePanel::Permissions(p) => p.unmount(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        match self {
            ActivePanel::Secrets(p) => p.is_mounted(),
            ActivePanel::Users(p) => p.is_mounted(),
            ActivePanel::Tokens(p) => p.is_mounted(),
            ActivePanel::Permissions(p) => p.is_mounted(),
        }
    }
}

pub struct Console<A: ConsoleApi> {
    api: Arc<A>,
    session: Session,
    router: HashRouter,
    notifications: NotificationQueue,
    login: LoginNegotiator,
    active: Mutex<Option<ActivePanel<A>>>,
}

impl<A: ConsoleApi> Console<A> {
    pub fn new(
        api: Arc<A>,
        session: Session,
        router: HashRouter,
        notifications: NotificationQueue,
    ) -> Self {
        let login_api: Arc<dyn LoginApi> = api.clone();
        Self {
            login: LoginNegotiator::new(login_api),
            api,
            session,
            router,
            notifications,
            active: Mutex::new(None),
        }
    }

    /// Require a CAPTCHA on login. A blank site key is ignored.
    pub fn with_captcha(mut self, host: Arc<CaptchaHost>, site_key: &str) -> Self {
        self.login = self.login.with_captcha(host, site_key, CAPTCHA_MOUNT);
        self
    }

    fn active(&self) -> MutexGuard<'_, Option<ActivePanel<A>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn router(&self) -> &HashRouter {
        &self.router
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn login_view(&self) -> &LoginNegotiator {
        &self.login
    }

    pub fn active_panel(&self) -> Option<ActivePanel<A>> {
        self.active().clone()
    }

    fn unmount_active(&self) {
        if let Some(panel) = self.active().take() {
            panel.unmount();
        }
    }

    /// Mount the panel for `route`, replacing the current one, and run its
    /// first load. Returns `None` while logged out.
    pub async fn show(&self, route: Route) -> Option<ActivePanel<A>> {
        self.unmount_active();
        if !self.session.is_authenticated() {
            debug!(%route, "not showing panel while logged out");
            return None;
        }

        let deps = PanelDeps {
            notifications: self.notifications.clone(),
            session: self.session.clone(),
        };
        let panel = ActivePanel::build(route, self.api.clone(), deps);
        *self.active() = Some(panel.clone());
        info!(%route, "panel shown");
        panel.load().await;
        Some(panel)
    }

    /// Bring the mounted panel in line with the route and session.
    pub async fn sync_route(&self) -> Option<ActivePanel<A>> {
        let route = self.router.current_route();
        let current = self.active_panel();
        match current {
            Some(panel) if panel.route() == route && self.session.is_authenticated() => {
                Some(panel)
            }
            _ => self.show(route).await,
        }
    }

    /// Follow route changes until `cancel` fires or the location goes away.
    pub async fn follow_routes(&self, cancel: CancellationToken) {
        let mut changes = self.router.changes();
        self.sync_route().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = changes.next() => match next {
                    Some(_) => {
                        self.sync_route().await;
                    }
                    None => break,
                },
            }
        }
        debug!("stopped following routes");
    }

    /// Render the login challenge, if one is configured.
    pub async fn show_login(&self) -> Result<(), LoginError> {
        self.login.mount().await
    }

    /// Log in, persist the credential and show the routed panel.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ConsoleError> {
        let credential = self.login.submit(username, password).await?;
        self.session.establish(&credential)?;
        self.login.teardown();
        self.sync_route().await;
        Ok(())
    }

    /// Drop the credential and unmount the dashboard.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.unmount_active();
        info!("logged out");
        self.session.end()
    }
}
