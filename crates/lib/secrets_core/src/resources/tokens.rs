//! API tokens. Created and deleted, never updated.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::RngCore;

use super::MASK;
use crate::api::ResourceApi;
use crate::models::{Token, TokenDraft};
use crate::panel::{Clipboard, PanelController, Resource, required};

/// Length of a generated token.
pub const TOKEN_LENGTH: usize = 32;

/// Characters a generated token is drawn from.
pub const TOKEN_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Descriptor for the tokens panel.
#[derive(Debug, Clone, Copy)]
pub struct Tokens;

#[derive(Debug, Clone, Default)]
pub struct TokensView {
    /// Ids of tokens shown in clear.
    pub revealed: HashSet<String>,
}

impl Resource for Tokens {
    type Record = Token;
    type Draft = TokenDraft;
    type Patch = ();
    type Context = ();
    type View = TokensView;

    const LABEL: &'static str = "Token";
    const PLURAL: &'static str = "tokens";

    fn id(record: &Token) -> &str {
        &record.id
    }

    /// Every open starts from a fresh random value and no expiry.
    fn prepare_draft(draft: &mut TokenDraft, _: &()) {
        draft.token = generate_token();
        draft.expires_at = None;
    }

    fn validate_draft(draft: &TokenDraft, _: &()) -> Result<(), String> {
        required(&draft.token, "Token is required")
    }
}

/// Random token of [`TOKEN_LENGTH`] characters over [`TOKEN_ALPHABET`].
///
/// Each byte from the OS-seeded CSPRNG is mapped by remainder, so the
/// first few letters are very slightly favoured. This is a pre-fill
/// convenience; the server accepts any token string.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LENGTH];
    rand::rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| TOKEN_ALPHABET[usize::from(*b) % TOKEN_ALPHABET.len()] as char)
        .collect()
}

/// Expiry column text: the timestamp in UTC, or `Never`.
pub fn expiry_label(token: &Token) -> String {
    match token.expires_at.as_deref() {
        None | Some("") => "Never".to_string(),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|_| raw.to_string()),
    }
}

/// Parse an operator-entered expiry.
///
/// Blank input means no expiry. Accepts RFC 3339 or a zone-less
/// `YYYY-MM-DDTHH:MM[:SS]`, read as UTC.
pub fn parse_expiry(input: &str) -> Result<Option<DateTime<Utc>>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(t.with_timezone(&Utc)));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|t| Some(t.and_utc()))
        .ok_or_else(|| format!("Invalid expiry \"{input}\""))
}

impl<A> PanelController<Tokens, A>
where
    A: ResourceApi<Tokens> + ?Sized,
{
    /// Replace the create dialog's token with a new random value.
    pub fn regenerate_token(&self) -> String {
        let token = generate_token();
        self.edit_create(|draft| draft.token = token.clone());
        token
    }

    pub fn toggle_reveal(&self, id: &str) -> bool {
        self.update_view(|view| {
            if view.revealed.remove(id) {
                false
            } else {
                view.revealed.insert(id.to_string());
                true
            }
        })
    }

    pub fn copy_token(&self, token: &Token, clipboard: &dyn Clipboard) -> bool {
        self.copy_text(&token.token, clipboard, "Token copied")
    }

    pub fn displayed_token(&self, token: &Token) -> String {
        if self.view().revealed.contains(&token.id) {
            token.token.clone()
        } else {
            MASK.to_string()
        }
    }
}
