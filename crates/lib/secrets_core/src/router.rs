//! Fragment-based routing.
//!
//! The visible section is always derived from the location fragment; the
//! router keeps no route of its own. `navigate` only writes the fragment and
//! the location's change event is what moves the view, so back/forward and
//! bookmarks need no extra handling.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

/// Dashboard sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Secrets,
    Users,
    Tokens,
    Permissions,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Secrets, Route::Users, Route::Tokens, Route::Permissions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Secrets => "secrets",
            Route::Users => "users",
            Route::Tokens => "tokens",
            Route::Permissions => "permissions",
        }
    }

    /// Exact, case-sensitive match against the known routes.
    pub fn parse(name: &str) -> Option<Route> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// Route for a raw fragment, with or without the leading `#`.
    /// Empty or unknown fragments resolve to the default route.
    pub fn from_fragment(fragment: &str) -> Route {
        let name = fragment.strip_prefix('#').unwrap_or(fragment);
        Self::parse(name).unwrap_or_default()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The address bar: a readable, writable fragment with change events.
pub trait Location: Send + Sync {
    /// Current fragment without the leading `#`.
    fn fragment(&self) -> String;

    /// Write the fragment. Writing the current value fires no change event.
    fn set_fragment(&self, fragment: &str);

    /// Receives the new fragment on every change.
    fn subscribe(&self) -> watch::Receiver<String>;
}

struct History {
    entries: Vec<String>,
    index: usize,
}

/// In-memory location with a browser-like history stack.
pub struct MemoryLocation {
    history: Mutex<History>,
    changes: watch::Sender<String>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::with_fragment("")
    }

    /// Start as if the page had been opened at `#fragment`.
    pub fn with_fragment(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment).to_string();
        let (changes, _) = watch::channel(fragment.clone());
        Self {
            history: Mutex::new(History {
                entries: vec![fragment],
                index: 0,
            }),
            changes,
        }
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Step back one entry. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        self.step(-1)
    }

    /// Step forward one entry. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        self.step(1)
    }

    fn step(&self, delta: isize) -> bool {
        let fragment = {
            let mut history = self.history();
            let Some(index) = history.index.checked_add_signed(delta) else {
                return false;
            };
            if index >= history.entries.len() {
                return false;
            }
            history.index = index;
            history.entries[index].clone()
        };
        self.changes.send_replace(fragment);
        true
    }

    /// Number of history entries, including ones ahead of the cursor.
    pub fn len(&self) -> usize {
        self.history().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> String {
        let history = self.history();
        history.entries[history.index].clone()
    }

    fn set_fragment(&self, fragment: &str) {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        {
            let mut history = self.history();
            if history.entries[history.index] == fragment {
                return;
            }
            let next = history.index + 1;
            history.entries.truncate(next);
            history.entries.push(fragment.to_string());
            history.index = next;
        }
        self.changes.send_replace(fragment.to_string());
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        self.changes.subscribe()
    }
}

/// Maps the location fragment to a [`Route`].
#[derive(Clone)]
pub struct HashRouter {
    location: Arc<dyn Location>,
}

impl HashRouter {
    pub fn new(location: Arc<dyn Location>) -> Self {
        Self { location }
    }

    pub fn current_route(&self) -> Route {
        Route::from_fragment(&self.location.fragment())
    }

    /// Write the route's fragment. The view follows the resulting change
    /// event, not this call.
    pub fn navigate(&self, route: Route) {
        debug!(%route, "navigate");
        self.location.set_fragment(route.as_str());
    }

    /// Stream of route changes, starting after the current one.
    pub fn changes(&self) -> RouteChanges {
        let mut rx = self.location.subscribe();
        rx.mark_unchanged();
        RouteChanges { rx }
    }
}

/// Route change events derived from fragment changes.
pub struct RouteChanges {
    rx: watch::Receiver<String>,
}

impl RouteChanges {
    /// Wait for the next fragment change. `None` once the location is gone.
    pub async fn next(&mut self) -> Option<Route> {
        self.rx.changed().await.ok()?;
        Some(Route::from_fragment(&self.rx.borrow_and_update()))
    }
}
