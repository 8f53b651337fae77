use thiserror::Error;

use crate::models::PortId;
use crate::validation::ValidationErrors;

/// Application-wide error types.
///
/// This enum represents every failure the port registry can report. None of
/// them is fatal: each one leaves the record collection in its last valid
/// state and is meant to be surfaced to the user as a notification or an
/// inline form message.
///
/// # Error Conversion
///
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```
/// use portreg_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::NotFound(42))
/// }
///
/// assert_eq!(example().unwrap_err().to_string(), "Port record not found: 42");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more form fields failed validation.
    ///
    /// Raised before a manually entered record enters the collection. The
    /// wrapped value carries one message per offending field.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A store operation referenced an id that is not in the collection.
    #[error("Port record not found: {0}")]
    NotFound(PortId),

    /// An id was supplied that already belongs to another record.
    ///
    /// This only happens when ids come from outside the store, e.g. a
    /// backend listing that contains the same id twice.
    #[error("Duplicate port record id: {0}")]
    DuplicateId(PortId),

    /// A backend request failed.
    ///
    /// Covers connection failures, non-success HTTP statuses and responses
    /// carrying an explicit `success: false` flag.
    #[error("Backend error: {0}")]
    Transport(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// There was nothing to act on.
    ///
    /// Export of an empty collection, or import of a sheet without data
    /// rows. No partial action is taken.
    #[error("Nothing to process: {0}")]
    EmptyInput(String),

    /// An export file name was blank or otherwise unusable.
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Reading or writing a spreadsheet file failed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A workflow step was requested that does not apply to its current
    /// state, e.g. committing while nothing is being edited.
    #[error("Invalid workflow step: {0}")]
    InvalidState(String),

    /// A response arrived after its adapter was torn down and was ignored.
    #[error("Sync adapter detached, response ignored")]
    Detached,

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns a user-friendly error message suitable for notifications.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(errors) => {
                format!("Please fix the form before saving:\n{}", errors.render())
            }
            AppError::NotFound(id) => {
                format!("Port record {} no longer exists. Refresh the list and try again.", id)
            }
            AppError::Transport(msg) => {
                if msg.contains("connect") {
                    format!(
                        "Cannot reach the port registry backend: {}\n   Check the API URL and try again.",
                        msg
                    )
                } else {
                    format!("The backend rejected the request: {}\n   Nothing was changed locally.", msg)
                }
            }
            AppError::Timeout(secs) => {
                format!(
                    "The backend did not answer within {} seconds.\n   Nothing was changed locally; try again later.",
                    secs
                )
            }
            AppError::EmptyInput(what) => format!("Nothing to do: {}.", what),
            AppError::InvalidFileName(_) => "File name is not valid.".to_string(),
            AppError::Spreadsheet(msg) => {
                format!("Could not process the spreadsheet: {}\n   Only .xlsx files are supported.", msg)
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if the user may simply try the same action again.
    ///
    /// Nothing in the registry retries on its own; this only drives the
    /// wording of failure notifications.
    ///
    /// # Examples
    ///
    /// ```
    /// use portreg_core::error::AppError;
    ///
    /// assert!(AppError::Transport("connection reset".to_string()).is_user_retriable());
    /// assert!(AppError::Timeout(30).is_user_retriable());
    /// assert!(!AppError::NotFound(7).is_user_retriable());
    /// ```
    pub fn is_user_retriable(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Timeout(_))
    }

    /// Returns the validation details if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortField;

    #[test]
    fn test_error_display() {
        let err = AppError::NotFound(3);
        assert_eq!(err.to_string(), "Port record not found: 3");
    }

    #[test]
    fn test_empty_input_error() {
        let err = AppError::EmptyInput("no records to export".to_string());
        assert_eq!(err.to_string(), "Nothing to process: no records to export");
        assert_eq!(err.user_message(), "Nothing to do: no records to export.");
    }

    #[test]
    fn test_user_message_transport_connect() {
        let err = AppError::Transport("Connection failed: refused".to_string());
        assert!(err.user_message().contains("Cannot reach"));
    }

    #[test]
    fn test_user_message_transport_rejected() {
        let err = AppError::Transport("port already registered".to_string());
        let msg = err.user_message();
        assert!(msg.contains("rejected"));
        assert!(msg.contains("port already registered"));
    }

    #[test]
    fn test_user_message_validation_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.push(PortField::ProjectName, "Project name is required");
        let err = AppError::Validation(errors);
        assert!(err.user_message().contains("Project name is required"));
        assert!(err.validation_errors().is_some());
    }

    #[test]
    fn test_error_from_serde() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{ invalid json }");
        let app_err: AppError = result.unwrap_err().into();
        assert!(matches!(app_err, AppError::SerializationError(_)));
    }

    #[test]
    fn test_is_user_retriable() {
        assert!(AppError::Transport("boom".to_string()).is_user_retriable());
        assert!(!AppError::EmptyInput("x".to_string()).is_user_retriable());
        assert!(!AppError::DuplicateId(1).is_user_retriable());
    }

    #[test]
    fn test_timeout_error() {
        let err = AppError::Timeout(30);
        assert_eq!(err.to_string(), "Request timed out after 30 seconds");
    }
}
