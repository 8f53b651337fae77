//! Portreg Core - Record store, import reconciliation, edit workflow and
//! remote sync for the port registry.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod query;
pub mod reconcile;
pub mod registry;
pub mod remote;
pub mod store;
pub mod sync;
pub mod validation;
pub mod workflow;

pub use config::{
    default_config_path, load_config, ExportConfig, HttpConfig, PortregConfig, SyncConfig,
};
pub use error::AppError;
pub use models::{NewPortRecord, PortField, PortId, PortRecord};
pub use ports::{
    ConfirmRequest, ConfirmationPort, FixedAnswer, Notification, NotificationLevel,
    NotificationLog, NotificationPort,
};
pub use query::{PortPage, PortQuery, SortOrder};
pub use reconcile::{import_rows, rows_to_candidates, Row};
pub use registry::PortRegistry;
pub use remote::{PortBackend, RemoteSync};
pub use store::{RecordStore, Snapshot};
pub use sync::{ForwardFailure, ForwardOutcome, ForwardStats, ImportSummary};
pub use validation::{validate, ValidationErrors};
pub use workflow::{EditSession, Workflow, WorkflowOutcome, WorkflowState};
