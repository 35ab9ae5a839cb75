//! Resource panel controller.
//!
//! One generic controller drives the list/create/edit/delete lifecycle of
//! every resource kind. A small descriptor ([`Resource`], plus
//! [`EditableResource`] for kinds with an update call) supplies the field
//! set and the validation rules.
//!
//! The server is the only source of truth: every successful mutation is
//! followed by a full reload instead of a local insert or patch.

mod descriptor;

pub use descriptor::{Clipboard, Confirm, EditableResource, Resource};
pub(crate) use descriptor::required;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, EditApi, ResourceApi};
use crate::notify::{NotificationQueue, Severity};
use crate::session::Session;

/// Whether the first load has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Loading,
    Ready,
}

/// Result of a panel operation. Failures have already been reported through
/// the notification queue by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    Applied,
    /// Local validation failed; no request was sent.
    Rejected(String),
    Failed(ApiError),
    /// A submission for the same dialog is still pending.
    Busy,
    /// The operator did not confirm a delete.
    Declined,
    /// The panel was unmounted before the response arrived.
    Discarded,
}

impl PanelOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PanelOutcome::Applied)
    }
}

/// Create dialog state.
#[derive(Debug, Clone, Default)]
pub struct Dialog<F> {
    pub open: bool,
    pub fields: F,
    pub busy: bool,
}

/// Edit dialog state, scoped to one existing record.
#[derive(Debug, Clone)]
pub struct EditDialog<P> {
    /// Key the update is addressed to.
    pub key: String,
    /// Read-only identification of the record (secret key, token preview).
    pub label: String,
    pub fields: P,
    pub busy: bool,
}

/// Collaborators shared by all panels.
#[derive(Clone)]
pub struct PanelDeps {
    pub notifications: NotificationQueue,
    pub session: Session,
}

struct PanelState<R: Resource> {
    display: DisplayState,
    records: Vec<R::Record>,
    context: R::Context,
    create: Dialog<R::Draft>,
    edit: Option<EditDialog<R::Patch>>,
    /// An update is in flight, whether or not its dialog is still open.
    edit_pending: bool,
    view: R::View,
}

/// Generic list/create/edit/delete controller for resource kind `R`.
pub struct PanelController<R: Resource, A: ?Sized> {
    api: Arc<A>,
    deps: PanelDeps,
    state: Mutex<PanelState<R>>,
    mounted: CancellationToken,
}

impl<R, A> PanelController<R, A>
where
    R: Resource,
    A: ResourceApi<R> + ?Sized,
{
    /// Build an unloaded controller. Most callers want [`Self::mount`].
    pub fn new(api: Arc<A>, deps: PanelDeps) -> Self {
        Self {
            api,
            deps,
            state: Mutex::new(PanelState {
                display: DisplayState::Loading,
                records: Vec::new(),
                context: R::Context::default(),
                create: Dialog::default(),
                edit: None,
                edit_pending: false,
                view: R::View::default(),
            }),
            mounted: CancellationToken::new(),
        }
    }

    /// Build the controller and run the initial load.
    pub async fn mount(api: Arc<A>, deps: PanelDeps) -> Self {
        let panel = Self::new(api, deps);
        info!(panel = R::PLURAL, "panel mounted");
        panel.load().await;
        panel
    }

    /// Tear the panel down. Responses still in flight are discarded.
    pub fn unmount(&self) {
        if !self.mounted.is_cancelled() {
            info!(panel = R::PLURAL, "panel unmounted");
        }
        self.mounted.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.mounted.is_cancelled()
    }

    fn state(&self) -> MutexGuard<'_, PanelState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discarded(&self, op: &str) -> bool {
        if self.mounted.is_cancelled() {
            debug!(panel = R::PLURAL, op, "discarding result for unmounted panel");
            true
        } else {
            false
        }
    }

    fn report_failure(&self, err: &ApiError) {
        self.deps
            .notifications
            .publish(err.message.clone(), Severity::Error);
        if err.is_auth_failure() {
            warn!(panel = R::PLURAL, "credential rejected, ending session");
            if let Err(e) = self.deps.session.end() {
                warn!(error = %e, "failed to clear rejected credential");
            }
        }
    }

    /// Copy `text`; a success toast confirms it. Failures are only logged.
    pub(crate) fn copy_text(&self, text: &str, clipboard: &dyn Clipboard, message: &str) -> bool {
        match clipboard.write_text(text) {
            Ok(()) => {
                self.deps.notifications.publish(message, Severity::Success);
                true
            }
            Err(e) => {
                warn!(panel = R::PLURAL, error = %e, "copy failed");
                false
            }
        }
    }

    fn reject(&self, message: String) -> PanelOutcome {
        self.deps
            .notifications
            .publish(message.clone(), Severity::Error);
        PanelOutcome::Rejected(message)
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Refetch the collection (and its context) and replace it wholesale.
    ///
    /// On failure the previous collection stays displayed.
    pub async fn load(&self) -> PanelOutcome {
        let result = tokio::try_join!(self.api.list(), self.api.load_context());
        if self.discarded("load") {
            return PanelOutcome::Discarded;
        }

        match result {
            Ok((records, context)) => {
                debug!(panel = R::PLURAL, count = records.len(), "loaded");
                let mut state = self.state();
                state.records = records;
                state.context = context;
                state.display = DisplayState::Ready;
                PanelOutcome::Applied
            }
            Err(e) => {
                self.state().display = DisplayState::Ready;
                self.report_failure(&e);
                PanelOutcome::Failed(e)
            }
        }
    }

    pub fn display(&self) -> DisplayState {
        self.state().display
    }

    /// Records from the last successful load, in server order.
    pub fn records(&self) -> Vec<R::Record> {
        self.state().records.clone()
    }

    pub fn context(&self) -> R::Context {
        self.state().context.clone()
    }

    pub fn view(&self) -> R::View {
        self.state().view.clone()
    }

    /// Mutate the panel's derived view state (filters, reveal toggles).
    pub fn update_view<T>(&self, f: impl FnOnce(&mut R::View) -> T) -> T {
        f(&mut self.state().view)
    }

    /// Run `f` over the loaded records and their context without cloning.
    pub fn with_records<T>(&self, f: impl FnOnce(&[R::Record], &R::Context, &R::View) -> T) -> T {
        let state = self.state();
        f(&state.records, &state.context, &state.view)
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Open the create dialog, unless the loaded context forbids creation.
    pub fn open_create(&self) -> PanelOutcome {
        let mut state = self.state();
        if let Err(message) = R::can_create(&state.context) {
            drop(state);
            return self.reject(message);
        }
        let PanelState {
            create, context, ..
        } = &mut *state;
        R::prepare_draft(&mut create.fields, context);
        create.open = true;
        PanelOutcome::Applied
    }

    /// Close the create dialog, keeping whatever was typed.
    pub fn close_create(&self) {
        self.state().create.open = false;
    }

    pub fn create_dialog(&self) -> Dialog<R::Draft> {
        self.state().create.clone()
    }

    /// Edit the create dialog's fields in place.
    pub fn edit_create<T>(&self, f: impl FnOnce(&mut R::Draft) -> T) -> T {
        f(&mut self.state().create.fields)
    }

    /// Submit the create dialog.
    ///
    /// Success closes and clears the dialog and reloads; failure leaves the
    /// dialog open with its values intact.
    pub async fn submit_create(&self) -> PanelOutcome {
        let draft = {
            let mut state = self.state();
            if state.create.busy {
                return PanelOutcome::Busy;
            }
            let checked = R::can_create(&state.context)
                .and_then(|()| R::validate_draft(&state.create.fields, &state.context));
            if let Err(message) = checked {
                drop(state);
                return self.reject(message);
            }
            state.create.busy = true;
            state.create.fields.clone()
        };

        let result = self.api.create(&draft).await;
        self.state().create.busy = false;
        if self.discarded("create") {
            return PanelOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                self.deps
                    .notifications
                    .publish(format!("{} created", R::LABEL), Severity::Success);
                {
                    let mut state = self.state();
                    state.create.open = false;
                    state.create.fields = R::Draft::default();
                }
                self.load().await;
                PanelOutcome::Applied
            }
            Err(e) => {
                self.report_failure(&e);
                PanelOutcome::Failed(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete by key after the operator confirms. Reloads on success.
    pub async fn delete(&self, key: &str, confirm: &dyn Confirm) -> PanelOutcome {
        if !confirm.confirm(&R::delete_prompt(key)) {
            return PanelOutcome::Declined;
        }

        let result = self.api.delete(key).await;
        if self.discarded("delete") {
            return PanelOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                self.deps
                    .notifications
                    .publish(format!("{} deleted", R::LABEL), Severity::Success);
                self.load().await;
                PanelOutcome::Applied
            }
            Err(e) => {
                self.report_failure(&e);
                PanelOutcome::Failed(e)
            }
        }
    }
}

impl<R, A> PanelController<R, A>
where
    R: EditableResource,
    A: EditApi<R> + ?Sized,
{
    /// Open the edit dialog for one record, pre-filled from it.
    ///
    /// Refused with `Busy` while an update is still pending.
    pub fn open_edit(&self, record: &R::Record) -> PanelOutcome {
        let mut state = self.state();
        if state.edit_pending {
            return PanelOutcome::Busy;
        }
        let label = R::edit_label(record, &state.context);
        state.edit = Some(EditDialog {
            key: R::edit_key(record).to_string(),
            label,
            fields: R::initial_patch(record),
            busy: false,
        });
        PanelOutcome::Applied
    }

    pub fn close_edit(&self) {
        self.state().edit = None;
    }

    pub fn edit_dialog(&self) -> Option<EditDialog<R::Patch>> {
        self.state().edit.clone()
    }

    /// Edit the open edit dialog's fields. Returns `None` when it is closed.
    pub fn edit_patch<T>(&self, f: impl FnOnce(&mut R::Patch) -> T) -> Option<T> {
        self.state().edit.as_mut().map(|dialog| f(&mut dialog.fields))
    }

    /// Submit the edit dialog. Same success/failure handling as create.
    pub async fn submit_edit(&self) -> PanelOutcome {
        let (key, patch) = {
            let mut state = self.state();
            if state.edit_pending {
                return PanelOutcome::Busy;
            }
            let Some(dialog) = state.edit.as_mut() else {
                return self.reject(format!("No {} is being edited", R::LABEL.to_lowercase()));
            };
            if dialog.busy {
                return PanelOutcome::Busy;
            }
            if let Err(message) = R::validate_patch(&dialog.fields) {
                return self.reject(message);
            }
            dialog.busy = true;
            let pending = (dialog.key.clone(), dialog.fields.clone());
            state.edit_pending = true;
            pending
        };

        let result = self.api.update(&key, &patch).await;
        {
            let mut state = self.state();
            state.edit_pending = false;
            if let Some(dialog) = state.edit.as_mut() {
                dialog.busy = false;
            }
        }
        if self.discarded("update") {
            return PanelOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                self.deps
                    .notifications
                    .publish(format!("{} updated", R::LABEL), Severity::Success);
                self.state().edit = None;
                self.load().await;
                PanelOutcome::Applied
            }
            Err(e) => {
                self.report_failure(&e);
                PanelOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests;
