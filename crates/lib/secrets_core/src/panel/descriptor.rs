//! Per-resource descriptors consumed by the panel controller.

/// Field set, validation rules and display names of one resource kind.
pub trait Resource: Send + Sync + 'static {
    /// Record as returned by the list call.
    type Record: Clone + Send + Sync + 'static;
    /// Create dialog fields.
    type Draft: Clone + Default + Send + Sync + 'static;
    /// Edit dialog fields; `()` for kinds without an update call.
    type Patch: Clone + Default + Send + Sync + 'static;
    /// Side data loaded together with the list.
    type Context: Clone + Default + Send + Sync + 'static;
    /// Derived, display-only state (filters, reveal toggles).
    type View: Clone + Default + Send + Sync + 'static;

    /// Singular display name, e.g. `"Secret"`.
    const LABEL: &'static str;
    /// Plural name used in logs, e.g. `"secrets"`.
    const PLURAL: &'static str;

    /// Backend identity of a record.
    fn id(record: &Self::Record) -> &str;

    /// Key the delete call is addressed to.
    fn delete_key(record: &Self::Record) -> &str {
        Self::id(record)
    }

    /// Confirmation question shown before deleting `key`.
    fn delete_prompt(_key: &str) -> String {
        format!("Delete this {}?", Self::LABEL.to_lowercase())
    }

    /// Whether the create dialog may open at all.
    fn can_create(_context: &Self::Context) -> Result<(), String> {
        Ok(())
    }

    /// Called every time the create dialog opens.
    fn prepare_draft(_draft: &mut Self::Draft, _context: &Self::Context) {}

    fn validate_draft(draft: &Self::Draft, context: &Self::Context) -> Result<(), String>;
}

/// Resource kinds with an update call. The edit key is immutable.
pub trait EditableResource: Resource {
    /// Key the update call is addressed to.
    fn edit_key(record: &Self::Record) -> &str;

    /// Read-only identification shown in the edit dialog.
    fn edit_label(record: &Self::Record, context: &Self::Context) -> String;

    fn initial_patch(record: &Self::Record) -> Self::Patch;

    fn validate_patch(patch: &Self::Patch) -> Result<(), String>;
}

/// Explicit human confirmation before a destructive call.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Destination of the copy actions.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), String>;
}

impl<F> Clipboard for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn write_text(&self, text: &str) -> Result<(), String> {
        self(text)
    }
}

/// Fails with `message` when `value` is blank.
pub(crate) fn required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}
