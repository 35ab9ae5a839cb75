use std::sync::{Arc, Mutex};

use super::*;
use crate::models::{SecretDraft, Token, TokenDraft};
use crate::resources::permissions::NO_TOKENS;
use crate::resources::{
    MASK, Permissions, Secrets, TOKEN_LENGTH, Tokens, Users, decode_value, expiry_label,
};
use crate::session::MemorySessionStore;
use crate::testing::FakeBackend;

fn deps() -> PanelDeps {
    PanelDeps {
        notifications: NotificationQueue::new(),
        session: Session::new(Arc::new(MemorySessionStore::with_credential("jwt"))),
    }
}

fn messages(deps: &PanelDeps) -> Vec<String> {
    deps.notifications
        .toasts()
        .into_iter()
        .map(|t| t.message)
        .collect()
}

fn last_toast(deps: &PanelDeps) -> (String, Severity) {
    let toast = deps.notifications.toasts().pop().unwrap();
    (toast.message, toast.severity)
}

fn accept(_: &str) -> bool {
    true
}

async fn secrets_panel(
    backend: &Arc<FakeBackend>,
    deps: &PanelDeps,
) -> PanelController<Secrets, FakeBackend> {
    PanelController::mount(backend.clone(), deps.clone()).await
}

async fn add_secret(panel: &PanelController<Secrets, FakeBackend>, key: &str, value: &str) {
    panel.open_create();
    panel.edit_create(|draft| {
        draft.key = key.into();
        draft.value = value.into();
    });
    assert_eq!(panel.submit_create().await, PanelOutcome::Applied);
}

#[tokio::test]
async fn unloaded_panel_is_loading() {
    let panel: PanelController<Secrets, FakeBackend> =
        PanelController::new(Arc::new(FakeBackend::new()), deps());
    assert_eq!(panel.display(), DisplayState::Loading);
    panel.load().await;
    assert_eq!(panel.display(), DisplayState::Ready);
}

#[tokio::test]
async fn secret_lifecycle_round_trips_through_the_server() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    assert_eq!(panel.display(), DisplayState::Ready);
    assert!(panel.records().is_empty());

    assert!(panel.open_create().is_applied());
    panel.edit_create(|draft| {
        draft.key = "DATABASE_URL".into();
        draft.value = "postgres://x".into();
    });
    assert_eq!(panel.submit_create().await, PanelOutcome::Applied);

    let dialog = panel.create_dialog();
    assert!(!dialog.open);
    assert_eq!(dialog.fields, SecretDraft::default());

    let records = panel.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "DATABASE_URL");
    assert_eq!(decode_value(&records[0].value), "postgres://x");

    panel.open_edit(&records[0]);
    let edit = panel.edit_dialog().unwrap();
    assert_eq!(edit.key, "DATABASE_URL");
    assert_eq!(edit.label, "DATABASE_URL");
    assert_eq!(edit.fields.value, "postgres://x");

    panel.edit_patch(|patch| patch.value = "postgres://y".into());
    assert_eq!(panel.submit_edit().await, PanelOutcome::Applied);
    assert!(panel.edit_dialog().is_none());

    let records = panel.records();
    assert_eq!(records.len(), 1);
    assert_eq!(decode_value(&records[0].value), "postgres://y");

    assert_eq!(
        panel.delete("DATABASE_URL", &accept).await,
        PanelOutcome::Applied
    );
    assert!(panel.records().is_empty());
    assert_eq!(
        messages(&deps),
        vec!["Secret created", "Secret updated", "Secret deleted"]
    );
}

#[tokio::test]
async fn invalid_draft_sends_nothing() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    let calls = backend.call_count();

    panel.open_create();
    panel.edit_create(|draft| draft.value = "orphan".into());
    assert_eq!(
        panel.submit_create().await,
        PanelOutcome::Rejected("Key is required".into())
    );
    assert_eq!(backend.call_count(), calls);
    assert_eq!(
        last_toast(&deps),
        ("Key is required".to_string(), Severity::Error)
    );
    assert!(panel.create_dialog().open);
}

#[tokio::test]
async fn failed_create_keeps_the_dialog_open() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    backend.fail_next_with(ApiError::new("secret already exists", Some(409)));

    panel.open_create();
    panel.edit_create(|draft| {
        draft.key = "API_KEY".into();
        draft.value = "v".into();
    });
    let outcome = panel.submit_create().await;
    assert!(matches!(outcome, PanelOutcome::Failed(ref e) if e.status == Some(409)));

    let dialog = panel.create_dialog();
    assert!(dialog.open);
    assert!(!dialog.busy);
    assert_eq!(dialog.fields.key, "API_KEY");
    assert_eq!(
        last_toast(&deps),
        ("secret already exists".to_string(), Severity::Error)
    );
    assert!(deps.session.is_authenticated());
}

#[tokio::test]
async fn failed_edit_keeps_the_dialog_open() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    add_secret(&panel, "API_KEY", "old").await;

    panel.open_edit(&panel.records()[0]);
    panel.edit_patch(|patch| patch.value = "new".into());
    backend.fail_next_with(ApiError::new("secret not found", Some(404)));

    assert!(matches!(panel.submit_edit().await, PanelOutcome::Failed(_)));
    let edit = panel.edit_dialog().unwrap();
    assert_eq!(edit.fields.value, "new");
    assert!(!edit.busy);
}

#[tokio::test]
async fn second_submission_is_refused_while_one_is_pending() {
    let backend = Arc::new(FakeBackend::new());
    let panel = Arc::new(secrets_panel(&backend, &deps()).await);
    panel.open_create();
    panel.edit_create(|draft| {
        draft.key = "API_KEY".into();
        draft.value = "v".into();
    });

    let gate = backend.gate.lock().await;
    let pending = tokio::spawn({
        let panel = panel.clone();
        async move { panel.submit_create().await }
    });
    while !panel.create_dialog().busy {
        tokio::task::yield_now().await;
    }

    assert_eq!(panel.submit_create().await, PanelOutcome::Busy);
    drop(gate);
    assert_eq!(pending.await.unwrap(), PanelOutcome::Applied);
    assert_eq!(panel.records().len(), 1);
}

#[tokio::test]
async fn failed_load_keeps_the_previous_collection() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    add_secret(&panel, "API_KEY", "v").await;

    backend.fail_next_with(ApiError::new("database unavailable", Some(500)));
    assert!(matches!(panel.load().await, PanelOutcome::Failed(_)));
    assert_eq!(panel.records().len(), 1);
    assert_eq!(
        last_toast(&deps),
        ("database unavailable".to_string(), Severity::Error)
    );
}

#[tokio::test]
async fn declined_delete_issues_no_call() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    add_secret(&panel, "API_KEY", "v").await;
    let calls = backend.call_count();

    let prompts = Mutex::new(Vec::new());
    let decline = |prompt: &str| {
        prompts.lock().unwrap().push(prompt.to_string());
        false
    };
    assert_eq!(panel.delete("API_KEY", &decline).await, PanelOutcome::Declined);
    assert_eq!(backend.call_count(), calls);
    assert_eq!(panel.records().len(), 1);
    assert_eq!(
        prompts.lock().unwrap().as_slice(),
        ["Delete secret \"API_KEY\"?".to_string()]
    );
}

#[tokio::test]
async fn failed_delete_leaves_state_unchanged() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    add_secret(&panel, "API_KEY", "v").await;

    assert!(matches!(
        panel.delete("MISSING", &accept).await,
        PanelOutcome::Failed(_)
    ));
    assert_eq!(panel.records().len(), 1);
    assert_eq!(
        last_toast(&deps),
        ("secret not found".to_string(), Severity::Error)
    );
}

#[tokio::test]
async fn results_after_unmount_are_discarded() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = Arc::new(secrets_panel(&backend, &deps).await);

    // Another view adds a secret the unmounted panel must not pick up.
    let other = secrets_panel(&backend, &deps).await;
    add_secret(&other, "API_KEY", "v").await;
    let toasts_before = deps.notifications.toasts().len();

    let gate = backend.gate.lock().await;
    let pending = tokio::spawn({
        let panel = panel.clone();
        async move { panel.load().await }
    });
    tokio::task::yield_now().await;
    panel.unmount();
    drop(gate);

    assert_eq!(pending.await.unwrap(), PanelOutcome::Discarded);
    assert!(panel.records().is_empty());
    assert!(!panel.is_mounted());
    assert_eq!(deps.notifications.toasts().len(), toasts_before);
}

#[tokio::test]
async fn rejection_after_unmount_does_not_end_the_session() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    panel.unmount();

    backend.fail_next_with(ApiError::new("invalid token", Some(401)));
    assert_eq!(panel.load().await, PanelOutcome::Discarded);
    assert!(deps.session.is_authenticated());
}

#[tokio::test]
async fn rejected_credential_ends_the_session() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    let mut logged_in = deps.session.subscribe();

    backend.fail_next_with(ApiError::new("invalid token", Some(401)));
    assert!(matches!(panel.load().await, PanelOutcome::Failed(_)));
    assert!(!deps.session.is_authenticated());
    assert!(logged_in.has_changed().unwrap());
    assert!(!*logged_in.borrow_and_update());
}

#[tokio::test]
async fn secrets_filter_and_reveal() {
    let backend = Arc::new(FakeBackend::new());
    let panel = secrets_panel(&backend, &deps()).await;
    add_secret(&panel, "DATABASE_URL", "postgres://x").await;
    add_secret(&panel, "REDIS_URL", "redis://y").await;

    panel.set_filter("data");
    let visible = panel.visible_records();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].key, "DATABASE_URL");

    panel.set_filter("");
    assert_eq!(panel.visible_records().len(), 2);

    let secret = &visible[0];
    assert_eq!(panel.displayed_value(secret), MASK);
    assert!(panel.toggle_reveal(&secret.id));
    assert_eq!(panel.displayed_value(secret), "postgres://x");
    assert!(!panel.toggle_reveal(&secret.id));
    assert_eq!(panel.displayed_value(secret), MASK);
}

#[tokio::test]
async fn copies_secret_key_and_decoded_value() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel = secrets_panel(&backend, &deps).await;
    add_secret(&panel, "DATABASE_URL", "postgres://x").await;
    let secret = panel.records()[0].clone();

    let copied = Mutex::new(Vec::new());
    let clipboard = |text: &str| -> Result<(), String> {
        copied.lock().unwrap().push(text.to_string());
        Ok(())
    };
    assert!(panel.copy_key(&secret, &clipboard));
    assert_eq!(last_toast(&deps), ("Key copied".to_string(), Severity::Success));
    // Masked on screen, but the copy carries the plain value.
    assert_eq!(panel.displayed_value(&secret), MASK);
    assert!(panel.copy_value(&secret, &clipboard));
    assert_eq!(last_toast(&deps), ("Value copied".to_string(), Severity::Success));
    assert_eq!(*copied.lock().unwrap(), ["DATABASE_URL", "postgres://x"]);
}

#[tokio::test]
async fn failed_copy_publishes_nothing() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel: PanelController<Tokens, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;
    let token = Token {
        id: "t1".into(),
        token: "ABC".into(),
        expires_at: None,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let broken = |_: &str| -> Result<(), String> { Err("no clipboard".into()) };
    assert!(!panel.copy_token(&token, &broken));
    assert!(deps.notifications.is_empty());

    let working = |_: &str| -> Result<(), String> { Ok(()) };
    assert!(panel.copy_token(&token, &working));
    assert_eq!(last_toast(&deps), ("Token copied".to_string(), Severity::Success));
}

#[tokio::test]
async fn token_dialog_is_prefilled_and_regenerated() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel: PanelController<Tokens, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;

    panel.open_create();
    let first = panel.create_dialog().fields.token;
    assert_eq!(first.len(), TOKEN_LENGTH);

    let regenerated = panel.regenerate_token();
    assert_ne!(regenerated, first);
    assert_eq!(panel.create_dialog().fields.token, regenerated);

    panel.close_create();
    panel.open_create();
    assert_ne!(panel.create_dialog().fields.token, regenerated);

    assert_eq!(panel.submit_create().await, PanelOutcome::Applied);
    assert_eq!(panel.create_dialog().fields, TokenDraft::default());
    let tokens = panel.records();
    assert_eq!(tokens.len(), 1);
    assert_eq!(expiry_label(&tokens[0]), "Never");
    assert_eq!(panel.displayed_token(&tokens[0]), MASK);
    assert_eq!(last_toast(&deps).0, "Token created");
}

#[tokio::test]
async fn users_are_created_and_deleted() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let panel: PanelController<Users, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;

    panel.open_create();
    panel.edit_create(|draft| draft.username = "ops".into());
    assert_eq!(
        panel.submit_create().await,
        PanelOutcome::Rejected("Password is required".into())
    );

    panel.edit_create(|draft| draft.password = "hunter2".into());
    assert_eq!(panel.submit_create().await, PanelOutcome::Applied);
    let user = panel.records().pop().unwrap();
    assert_eq!(user.username, "ops");

    let prompts = Mutex::new(Vec::new());
    let confirm = |prompt: &str| {
        prompts.lock().unwrap().push(prompt.to_string());
        true
    };
    assert_eq!(panel.delete(&user.id, &confirm).await, PanelOutcome::Applied);
    assert!(panel.records().is_empty());
    assert_eq!(
        prompts.lock().unwrap().as_slice(),
        ["Delete this user?".to_string()]
    );
}

#[tokio::test]
async fn permissions_require_an_existing_token() {
    let backend = Arc::new(FakeBackend::new());
    let deps = deps();
    let tokens: PanelController<Tokens, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;
    let permissions: PanelController<Permissions, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;

    assert_eq!(
        permissions.open_create(),
        PanelOutcome::Rejected(NO_TOKENS.into())
    );
    assert!(!permissions.create_dialog().open);

    tokens.open_create();
    assert!(tokens.submit_create().await.is_applied());
    let token = tokens.records().pop().unwrap();

    permissions.load().await;
    assert!(permissions.open_create().is_applied());
    assert_eq!(permissions.token_options().len(), 1);
    permissions.edit_create(|draft| {
        draft.token_id = token.id.clone();
        draft.secret_key_pattern = "app/*".into();
    });
    assert!(permissions.submit_create().await.is_applied());

    let permission = permissions.records().pop().unwrap();
    assert_eq!(
        permissions.token_label(&permission),
        format!("{}...", &token.token[..12])
    );

    // Deleting the last token blocks new permissions again.
    assert!(tokens.delete(&token.id, &accept).await.is_applied());
    permissions.load().await;
    assert_eq!(
        permissions.open_create(),
        PanelOutcome::Rejected(NO_TOKENS.into())
    );
    assert_eq!(
        permissions.submit_create().await,
        PanelOutcome::Rejected(NO_TOKENS.into())
    );
    // The orphaned permission falls back to its token id.
    assert_eq!(
        permissions.token_label(&permission),
        format!("{}...", &token.id[..8])
    );
}

#[tokio::test]
async fn permission_pattern_is_editable_but_token_is_not() {
    let backend = Arc::new(FakeBackend::new());
    let token_id = backend.seed_token("ABCDEFGHIJKLMNOPQRSTUVWXYZ012345");
    let deps = deps();
    let panel: PanelController<Permissions, FakeBackend> =
        PanelController::mount(backend.clone(), deps.clone()).await;

    panel.open_create();
    panel.edit_create(|draft| {
        draft.token_id = token_id.clone();
        draft.secret_key_pattern = "app/*".into();
    });
    assert!(panel.submit_create().await.is_applied());

    let permission = panel.records().pop().unwrap();
    panel.open_edit(&permission);
    let edit = panel.edit_dialog().unwrap();
    assert_eq!(edit.key, permission.id);
    assert_eq!(edit.label, "ABCDEFGHIJKL...");
    assert_eq!(edit.fields.secret_key_pattern, "app/*");

    panel.edit_patch(|patch| patch.secret_key_pattern = "app/prod/*".into());
    assert!(panel.submit_edit().await.is_applied());

    let updated = panel.records().pop().unwrap();
    assert_eq!(updated.secret_key_pattern, "app/prod/*");
    assert_eq!(updated.token_id, token_id);
    assert_eq!(last_toast(&deps).0, "Permission updated");
}

#[tokio::test]
async fn edit_without_open_dialog_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    let panel = secrets_panel(&backend, &deps()).await;
    assert_eq!(panel.edit_patch(|patch| patch.value.clear()), None);
    assert!(matches!(
        panel.submit_edit().await,
        PanelOutcome::Rejected(_)
    ));
}

#[tokio::test]
async fn edit_cannot_reopen_while_an_update_is_pending() {
    let backend = Arc::new(FakeBackend::new());
    let panel = Arc::new(secrets_panel(&backend, &deps()).await);
    add_secret(&panel, "API_KEY", "old").await;
    let record = panel.records()[0].clone();
    panel.open_edit(&record);
    panel.edit_patch(|patch| patch.value = "new".into());

    let before = backend.call_count();
    let gate = backend.gate.lock().await;
    let pending = tokio::spawn({
        let panel = panel.clone();
        async move { panel.submit_edit().await }
    });
    while !panel.edit_dialog().is_some_and(|d| d.busy) {
        tokio::task::yield_now().await;
    }

    assert_eq!(panel.open_edit(&record), PanelOutcome::Busy);
    assert!(panel.edit_dialog().unwrap().busy);
    panel.close_edit();
    assert_eq!(panel.open_edit(&record), PanelOutcome::Busy);
    assert_eq!(panel.submit_edit().await, PanelOutcome::Busy);

    drop(gate);
    assert_eq!(pending.await.unwrap(), PanelOutcome::Applied);
    // One update and its reload.
    assert_eq!(backend.call_count(), before + 2);
    assert_eq!(panel.open_edit(&panel.records()[0]), PanelOutcome::Applied);
    assert_eq!(panel.edit_dialog().unwrap().fields.value, "new");
}
