use secrets_api_client::ClientError;
use secrets_core::api::ApiError;
use secrets_core::config::ConfigError;
use secrets_core::console::ConsoleError;
use secrets_core::session::SessionError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("Not logged in; run `login` first")]
    NotLoggedIn,

    /// The server refused the stored credential and the session was ended.
    #[error("{}; log in again", .0)]
    SessionRejected(ApiError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),
}
