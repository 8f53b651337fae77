//! Required-field rules shared by manual creation and editing.
//!
//! Imported rows deliberately bypass these rules; see [`crate::reconcile`].

use std::fmt;

use crate::models::{NewPortRecord, PortField};

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: PortField,
    pub message: String,
}

/// All failed rules for one draft, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: PortField, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message for the given field, if any.
    pub fn for_field(&self, field: PortField) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// One line per failed rule, for notifications.
    pub fn render(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("  - {}", e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Returns true if the token is a non-empty run of ASCII digits.
pub fn is_port_token(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Checks a draft against the creation rules.
///
/// Whitespace-only values count as missing. The port number must consist
/// of digits only, without surrounding spaces; its numeric range is not
/// checked.
pub fn validate(draft: &NewPortRecord) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    for field in PortField::ALL {
        let value = draft.field(field).trim();
        if field.is_required() && value.is_empty() {
            errors.push(field, format!("{} is required", field.label()));
            continue;
        }
        if field == PortField::PortNumber && !is_port_token(draft.field(field)) {
            errors.push(field, "Port number must contain digits only");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        let draft = NewPortRecord::new("8080", "Alpha", "Web", "");
        assert!(validate(&draft).is_ok());
    }

    #[test]
    fn test_all_required_missing() {
        let errors = validate(&NewPortRecord::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.for_field(PortField::PortNumber),
            Some("Port number is required")
        );
        assert!(errors.for_field(PortField::Description).is_none());
    }

    #[test]
    fn test_whitespace_counts_as_missing() {
        let draft = NewPortRecord::new("80", "   ", "Web", "");
        let errors = validate(&draft).unwrap_err();
        assert_eq!(
            errors.for_field(PortField::ProjectName),
            Some("Project name is required")
        );
    }

    #[test]
    fn test_port_number_must_be_digits() {
        for bad in ["80a", "-1", "8 080", " 80", "١٢٣"] {
            let draft = NewPortRecord::new(bad, "Alpha", "Web", "");
            let errors = validate(&draft).unwrap_err();
            assert_eq!(
                errors.for_field(PortField::PortNumber),
                Some("Port number must contain digits only"),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_render_lists_each_error() {
        let errors = validate(&NewPortRecord::new("x", "", "App", "")).unwrap_err();
        let rendered = errors.render();
        assert!(rendered.contains("digits only"));
        assert!(rendered.contains("Project name is required"));
        assert_eq!(rendered.lines().count(), 2);
    }
}
