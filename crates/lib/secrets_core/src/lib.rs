//! # secrets_core
//!
//! Client-side core of the secrets console: credential storage, the gateway
//! contracts, the login negotiator, the toast queue, the hash router and the
//! generic resource panel shared by secrets, users, tokens and permissions.

pub mod api;
pub mod config;
pub mod console;
pub mod login;
pub mod models;
pub mod notify;
pub mod panel;
pub mod resources;
pub mod router;
pub mod session;

#[cfg(test)]
mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
