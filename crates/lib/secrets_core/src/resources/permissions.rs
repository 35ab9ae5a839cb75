//! Permissions: a token plus a secret-key pattern. Only the pattern can be
//! edited. Creating one requires at least one token, so the token list is
//! loaded alongside the permissions.

use super::preview;
use crate::api::ResourceApi;
use crate::models::{Permission, PermissionDraft, PermissionPatch, Token};
use crate::panel::{EditableResource, PanelController, Resource, required};

#[derive(Debug, Clone, Copy)]
pub struct Permissions;

/// Validation message while no token exists.
pub const NO_TOKENS: &str = "Create a token first to add permissions";

impl Resource for Permissions {
    type Record = Permission;
    type Draft = PermissionDraft;
    type Patch = PermissionPatch;
    /// Tokens loaded with the list, for selection and previews.
    type Context = Vec<Token>;
    type View = ();

    const LABEL: &'static str = "Permission";
    const PLURAL: &'static str = "permissions";

    fn id(record: &Permission) -> &str {
        &record.id
    }

    fn can_create(tokens: &Vec<Token>) -> Result<(), String> {
        if tokens.is_empty() {
            Err(NO_TOKENS.to_string())
        } else {
            Ok(())
        }
    }

    fn validate_draft(draft: &PermissionDraft, tokens: &Vec<Token>) -> Result<(), String> {
        required(&draft.token_id, "Select a token")?;
        if !tokens.iter().any(|t| t.id == draft.token_id) {
            return Err("Select a token".to_string());
        }
        required(&draft.secret_key_pattern, "Pattern is required")
    }
}

impl EditableResource for Permissions {
    fn edit_key(record: &Permission) -> &str {
        &record.id
    }

    fn edit_label(record: &Permission, tokens: &Vec<Token>) -> String {
        token_preview(&record.token_id, tokens)
    }

    fn initial_patch(record: &Permission) -> PermissionPatch {
        PermissionPatch {
            secret_key_pattern: record.secret_key_pattern.clone(),
        }
    }

    fn validate_patch(patch: &PermissionPatch) -> Result<(), String> {
        required(&patch.secret_key_pattern, "Pattern is required")
    }
}

/// Display form of a permission's token: the first 12 characters of the
/// token value, or the first 8 of the id when the token is not loaded.
pub fn token_preview(token_id: &str, tokens: &[Token]) -> String {
    match tokens.iter().find(|t| t.id == token_id) {
        Some(token) => preview(&token.token, 12),
        None => preview(token_id, 8),
    }
}

/// `(id, label)` choices for the token selector.
pub fn token_options(tokens: &[Token]) -> Vec<(String, String)> {
    tokens
        .iter()
        .map(|t| (t.id.clone(), preview(&t.token, 20)))
        .collect()
}

impl<A> PanelController<Permissions, A>
where
    A: ResourceApi<Permissions> + ?Sized,
{
    /// Token column text for one loaded permission.
    pub fn token_label(&self, permission: &Permission) -> String {
        self.with_records(|_, tokens, _| token_preview(&permission.token_id, tokens))
    }

    pub fn token_options(&self) -> Vec<(String, String)> {
        self.with_records(|_, tokens, _| token_options(tokens))
    }
}
