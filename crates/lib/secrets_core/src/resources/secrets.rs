//! Secrets: key/value pairs. The key is immutable after creation.

use std::collections::HashSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::MASK;
use crate::api::ResourceApi;
use crate::models::{Secret, SecretDraft, SecretPatch};
use crate::panel::{Clipboard, EditableResource, PanelController, Resource, required};

/// Descriptor for the secrets panel.
#[derive(Debug, Clone, Copy)]
pub struct Secrets;

/// Derived state of the secrets list.
#[derive(Debug, Clone, Default)]
pub struct SecretsView {
    /// Case-insensitive substring matched against keys.
    pub filter: String,
    /// Ids of secrets whose value is shown in clear.
    pub revealed: HashSet<String>,
}

impl Resource for Secrets {
    type Record = Secret;
    type Draft = SecretDraft;
    type Patch = SecretPatch;
    type Context = ();
    type View = SecretsView;

    const LABEL: &'static str = "Secret";
    const PLURAL: &'static str = "secrets";

    fn id(record: &Secret) -> &str {
        &record.id
    }

    fn delete_key(record: &Secret) -> &str {
        &record.key
    }

    fn delete_prompt(key: &str) -> String {
        format!("Delete secret \"{key}\"?")
    }

    fn validate_draft(draft: &SecretDraft, _: &()) -> Result<(), String> {
        required(&draft.key, "Key is required")?;
        required(&draft.value, "Value is required")
    }
}

impl EditableResource for Secrets {
    fn edit_key(record: &Secret) -> &str {
        &record.key
    }

    fn edit_label(record: &Secret, _: &()) -> String {
        record.key.clone()
    }

    fn initial_patch(record: &Secret) -> SecretPatch {
        SecretPatch {
            value: decode_value(&record.value),
        }
    }

    fn validate_patch(patch: &SecretPatch) -> Result<(), String> {
        required(&patch.value, "Value is required")
    }
}

/// Decode a transport-encoded value for display.
///
/// The encoding is plain base64, not a protection layer. Values that do not
/// decode to UTF-8 text are returned as received.
pub fn decode_value(raw: &str) -> String {
    STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn matches_filter(secret: &Secret, filter: &str) -> bool {
    filter.is_empty() || secret.key.to_lowercase().contains(&filter.to_lowercase())
}

impl<A> PanelController<Secrets, A>
where
    A: ResourceApi<Secrets> + ?Sized,
{
    pub fn set_filter(&self, filter: impl Into<String>) {
        let filter = filter.into();
        self.update_view(|view| view.filter = filter);
    }

    /// Loaded secrets whose key matches the current filter, in server order.
    pub fn visible_records(&self) -> Vec<Secret> {
        self.with_records(|records, _, view| {
            records
                .iter()
                .filter(|s| matches_filter(s, &view.filter))
                .cloned()
                .collect()
        })
    }

    /// Flip the reveal state of one secret. Returns whether it is now shown.
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

    pub fn copy_key(&self, secret: &Secret, clipboard: &dyn Clipboard) -> bool {
        self.copy_text(&secret.key, clipboard, "Key copied")
    }

    /// Copies the decoded value, whether or not it is revealed.
    pub fn copy_value(&self, secret: &Secret, clipboard: &dyn Clipboard) -> bool {
        self.copy_text(&decode_value(&secret.value), clipboard, "Value copied")
    }

    /// The value as it should be displayed: masked unless revealed.
    pub fn displayed_value(&self, secret: &Secret) -> String {
        if self.view().revealed.contains(&secret.id) {
            decode_value(&secret.value)
        } else {
            MASK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(key: &str, value: &str) -> Secret {
        Secret {
            id: format!("id-{key}"),
            key: key.to_string(),
            value: STANDARD.encode(value),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn draft_requires_key_and_value() {
        let mut draft = SecretDraft::default();
        assert_eq!(
            Secrets::validate_draft(&draft, &()).unwrap_err(),
            "Key is required"
        );
        draft.key = "DATABASE_URL".into();
        assert_eq!(
            Secrets::validate_draft(&draft, &()).unwrap_err(),
            "Value is required"
        );
        draft.value = "postgres://x".into();
        assert!(Secrets::validate_draft(&draft, &()).is_ok());
    }

    #[test]
    fn edit_prefills_decoded_value() {
        let s = secret("API_KEY", "hunter2");
        assert_eq!(Secrets::initial_patch(&s).value, "hunter2");
        assert_eq!(Secrets::edit_key(&s), "API_KEY");
        assert_eq!(Secrets::edit_label(&s, &()), "API_KEY");
    }

    #[test]
    fn undecodable_value_is_shown_raw() {
        assert_eq!(decode_value("not base64!"), "not base64!");
        // Valid base64, invalid UTF-8.
        assert_eq!(decode_value("/w=="), "/w==");
    }

    #[test]
    fn delete_is_addressed_by_key() {
        let s = secret("API_KEY", "v");
        assert_eq!(Secrets::delete_key(&s), "API_KEY");
        assert_eq!(Secrets::delete_prompt("API_KEY"), "Delete secret \"API_KEY\"?");
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let s = secret("DATABASE_URL", "v");
        assert!(matches_filter(&s, ""));
        assert!(matches_filter(&s, "base"));
        assert!(matches_filter(&s, "_URL"));
        assert!(!matches_filter(&s, "redis"));
    }
}
