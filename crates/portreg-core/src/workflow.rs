//! Confirm-then-commit workflow for creating, editing and deleting records.
//!
//! ```text
//! edit:   Idle -> Editing -> { Committing -> Idle | Cancelled -> Idle }
//! delete: Idle -> ConfirmingDelete -> { Deleted -> Idle | Cancelled -> Idle }
//! ```
//!
//! `Committing`, `Deleted` and `Cancelled` are transient: they exist only
//! for the duration of a call and are reported through
//! [`WorkflowOutcome`]. Every mutation goes through a
//! [`PortRegistry`], so the same workflow drives a local store or a
//! backend-mirrored one.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{NewPortRecord, PortField, PortId, PortRecord};
use crate::ports::{ConfirmRequest, ConfirmationPort, Notification, NotificationPort};
use crate::registry::PortRegistry;
use crate::validation::{validate, ValidationErrors};

/// A pending edit of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// The record as it was when editing started
    pub original: PortRecord,
    pub draft: NewPortRecord,
    /// Errors for the current draft, refreshed on every change
    pub errors: ValidationErrors,
}

impl EditSession {
    fn new(original: PortRecord) -> Self {
        let draft = original.to_new();
        let errors = validate(&draft).err().unwrap_or_default();
        Self {
            original,
            draft,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.original.to_new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Editing(EditSession),
    ConfirmingDelete(PortRecord),
}

/// How a workflow step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Created(PortRecord),
    Committed(PortRecord),
    Deleted(PortId),
    Cancelled,
}

/// Drives create/edit/delete interactions against a registry.
///
/// Holding the workflow by `&mut` serializes its steps: a second mutating
/// action cannot start while one is awaiting the registry.
pub struct Workflow {
    registry: Arc<dyn PortRegistry>,
    confirmation: Arc<dyn ConfirmationPort>,
    notifier: Arc<dyn NotificationPort>,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(
        registry: Arc<dyn PortRegistry>,
        confirmation: Arc<dyn ConfirmationPort>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            registry,
            confirmation,
            notifier,
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    pub fn registry(&self) -> &Arc<dyn PortRegistry> {
        &self.registry
    }

    /// The pending edit, if any.
    pub fn edit_session(&self) -> Option<&EditSession> {
        match &self.state {
            WorkflowState::Editing(session) => Some(session),
            _ => None,
        }
    }

    /// Validates and creates a manually entered record.
    ///
    /// Creation needs no confirmation. A validation failure is returned
    /// without a notification, since it belongs next to the form fields;
    /// registry failures are notified.
    pub async fn submit_new(&mut self, draft: NewPortRecord) -> Result<WorkflowOutcome, AppError> {
        validate(&draft).map_err(AppError::Validation)?;

        match self.registry.create(draft).await {
            Ok(record) => {
                info!(id = record.id, "port {} added", record.port_number);
                self.notifier.notify(Notification::success(
                    "Port added",
                    format!("Port {} ({}) was added.", record.port_number, record.project_name),
                ));
                Ok(WorkflowOutcome::Created(record))
            }
            Err(e) => Err(self.fail("Could not add port", e)),
        }
    }

    /// Starts editing the record with the given id.
    ///
    /// Any previous pending step is discarded.
    pub fn begin_edit(&mut self, id: PortId) -> Result<&EditSession, AppError> {
        let Some(record) = self.registry.get(id) else {
            return Err(self.fail("Cannot edit port", AppError::NotFound(id)));
        };
        debug!(id, "editing");
        self.state = WorkflowState::Editing(EditSession::new(record));
        self.edit_session()
            .ok_or_else(|| AppError::InvalidState("edit session vanished".to_string()))
    }

    /// Changes one draft field and revalidates the whole draft.
    ///
    /// Returns the refreshed errors, or `None` when nothing is being edited.
    pub fn set_field(&mut self, field: PortField, value: impl Into<String>) -> Option<&ValidationErrors> {
        let WorkflowState::Editing(session) = &mut self.state else {
            return None;
        };
        session.draft.set_field(field, value);
        session.errors = validate(&session.draft).err().unwrap_or_default();
        Some(&session.errors)
    }

    /// Abandons the pending edit or delete.
    pub fn cancel(&mut self) -> WorkflowOutcome {
        if !self.is_idle() {
            debug!("pending step cancelled");
        }
        self.state = WorkflowState::Idle;
        WorkflowOutcome::Cancelled
    }

    /// Asks for confirmation and writes the draft back.
    ///
    /// An invalid draft keeps the workflow in `Editing` and returns
    /// `AppError::Validation`. Declining returns to `Idle` with no change.
    pub async fn commit_edit(&mut self) -> Result<WorkflowOutcome, AppError> {
        let session = match std::mem::take(&mut self.state) {
            WorkflowState::Editing(session) => session,
            other => {
                self.state = other;
                return Err(AppError::InvalidState("nothing is being edited".to_string()));
            }
        };

        if !session.is_valid() {
            let errors = session.errors.clone();
            self.state = WorkflowState::Editing(session);
            return Err(AppError::Validation(errors));
        }

        let request = ConfirmRequest::new(
            "Update port",
            format!(
                "Save changes to port {} ({})?",
                session.original.port_number, session.original.project_name
            ),
        );
        if !self.confirmation.confirm(&request) {
            debug!(id = session.original.id, "update declined");
            return Ok(WorkflowOutcome::Cancelled);
        }

        let record = session.draft.with_id(session.original.id);
        match self.registry.update(record.clone()).await {
            Ok(()) => {
                info!(id = record.id, "port record updated");
                self.notifier.notify(Notification::success(
                    "Port updated",
                    format!("Port {} was updated.", record.port_number),
                ));
                Ok(WorkflowOutcome::Committed(record))
            }
            Err(e) => Err(self.fail("Could not update port", e)),
        }
    }

    /// Selects a record for deletion.
    pub fn request_delete(&mut self, id: PortId) -> Result<&PortRecord, AppError> {
        let Some(record) = self.registry.get(id) else {
            return Err(self.fail("Cannot delete port", AppError::NotFound(id)));
        };
        self.state = WorkflowState::ConfirmingDelete(record);
        match &self.state {
            WorkflowState::ConfirmingDelete(record) => Ok(record),
            _ => Err(AppError::InvalidState("delete selection vanished".to_string())),
        }
    }

    /// Asks for confirmation and deletes the selected record.
    pub async fn resolve_delete(&mut self) -> Result<WorkflowOutcome, AppError> {
        let record = match std::mem::take(&mut self.state) {
            WorkflowState::ConfirmingDelete(record) => record,
            other => {
                self.state = other;
                return Err(AppError::InvalidState("no deletion is pending".to_string()));
            }
        };

        let request = ConfirmRequest::new(
            "Delete port",
            format!(
                "Delete port {} ({} / {})?",
                record.port_number, record.project_name, record.application_name
            ),
        );
        if !self.confirmation.confirm(&request) {
            debug!(id = record.id, "delete declined");
            return Ok(WorkflowOutcome::Cancelled);
        }

        match self.registry.remove(record.id).await {
            Ok(()) => {
                info!(id = record.id, "port record deleted");
                self.notifier.notify(Notification::success(
                    "Port deleted",
                    format!("Port {} was deleted.", record.port_number),
                ));
                Ok(WorkflowOutcome::Deleted(record.id))
            }
            Err(e) => Err(self.fail("Could not delete port", e)),
        }
    }

    /// `request_delete` followed by `resolve_delete`.
    pub async fn delete(&mut self, id: PortId) -> Result<WorkflowOutcome, AppError> {
        self.request_delete(id)?;
        self.resolve_delete().await
    }

    /// Reports a failure and returns to `Idle`.
    fn fail(&mut self, summary: &str, err: AppError) -> AppError {
        self.state = WorkflowState::Idle;
        self.notifier
            .notify(Notification::error(summary, err.user_message()));
        err
    }
}
