use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Operator console for a secrets server", long_about = None)]
pub struct Cli {
    /// Server base URL
    #[arg(long, global = true, env = "SECRETS_URL")]
    pub url: Option<String>,

    /// File holding the session credential
    #[arg(long, global = true, env = "SECRETS_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,
    /// Show whether a session credential is stored
    Status,
    /// Log in and store the session credential
    Login(LoginArgs),
    /// Forget the session credential
    Logout,
    /// Manage secrets
    #[command(subcommand)]
    Secrets(SecretsCommand),
    /// Manage console users
    #[command(subcommand)]
    Users(UsersCommand),
    /// Manage API tokens
    #[command(subcommand)]
    Tokens(TokensCommand),
    /// Manage token permissions
    #[command(subcommand)]
    Permissions(PermissionsCommand),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long, short)]
    pub username: String,

    /// Prompted for when omitted
    #[arg(long, env = "SECRETS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Solved challenge proof, when the server requires a captcha
    #[arg(long)]
    pub captcha_token: Option<String>,

    /// Captcha site key; enables the challenge
    #[arg(long, env = "TURNSTILE_SITE_KEY")]
    pub site_key: Option<String>,
}

/// Skips the confirmation prompt of a delete.
#[derive(Args, Debug)]
pub struct ConfirmArgs {
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    List {
        /// Only keys containing this text (case-insensitive)
        #[arg(long, short)]
        filter: Option<String>,
        /// Show decoded values instead of a mask
        #[arg(long)]
        reveal: bool,
    },
    /// Print the decoded value of one secret
    Get { key: String },
    Create {
        key: String,
        value: String,
    },
    /// Replace the value of an existing secret
    Update {
        key: String,
        value: String,
    },
    Delete {
        key: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    List,
    Create {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    Delete {
        id: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokensCommand {
    List {
        /// Show full token values
        #[arg(long)]
        reveal: bool,
    },
    /// Print the full value of one token
    Show { id: String },
    Create {
        /// Token value; a random one is generated when omitted
        #[arg(long)]
        token: Option<String>,
        /// RFC 3339 or `YYYY-MM-DDTHH:MM[:SS]` (UTC); never expires when omitted
        #[arg(long)]
        expires_at: Option<String>,
    },
    Delete {
        id: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
    },
    /// Print a random token without contacting the server
    Generate,
}

#[derive(Subcommand, Debug)]
pub enum PermissionsCommand {
    List,
    Create {
        #[arg(long)]
        token_id: String,
        /// Secret key pattern the token may read
        #[arg(long)]
        pattern: String,
    },
    /// Change the pattern of a permission; its token stays fixed
    Update {
        id: String,
        #[arg(long)]
        pattern: String,
    },
    Delete {
        id: String,
        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}
