//! Descriptors for the four resource kinds, plus their display helpers.

pub mod permissions;
pub mod secrets;
pub mod tokens;
pub mod users;

pub use permissions::{Permissions, token_options, token_preview};
pub use secrets::{Secrets, SecretsView, decode_value};
pub use tokens::{
    TOKEN_ALPHABET, TOKEN_LENGTH, Tokens, TokensView, expiry_label, generate_token, parse_expiry,
};
pub use users::{Users, id_preview};

/// Shown in place of a value that has not been revealed.
pub const MASK: &str = "••••••••";

/// First `chars` characters of `value` followed by `...`.
///
/// Counts characters, not bytes. The ellipsis is appended even when nothing
/// was cut so previews line up in a table.
pub fn preview(value: &str, chars: usize) -> String {
    let mut out: String = value.chars().take(chars).collect();
    out.push_str("...");
    out
}
