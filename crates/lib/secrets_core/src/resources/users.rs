//! Console users. Created and deleted; passwords are write-only.

use super::preview;
use crate::models::{User, UserDraft};
use crate::panel::{Resource, required};

#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    type Record = User;
    type Draft = UserDraft;
    type Patch = ();
    type Context = ();
    type View = ();

    const LABEL: &'static str = "User";
    const PLURAL: &'static str = "users";

    fn id(record: &User) -> &str {
        &record.id
    }

    fn validate_draft(draft: &UserDraft, _: &()) -> Result<(), String> {
        required(&draft.username, "Username is required")?;
        required(&draft.password, "Password is required")
    }
}

/// Short form of a user id for the list.
pub fn id_preview(user: &User) -> String {
    preview(&user.id, 8)
}
