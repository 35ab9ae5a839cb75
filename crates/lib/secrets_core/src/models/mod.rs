//! Wire models mirrored from the secrets server.
//!
//! Records are owned by the backend; the console only ever holds the copy
//! returned by the most recent list call.

pub mod envelope;
pub mod resources;

pub use envelope::{Envelope, LoginData, LoginRequest};
pub use resources::{
    Permission, PermissionDraft, PermissionPatch, Secret, SecretDraft, SecretPatch, Token,
    TokenDraft, User, UserDraft,
};
