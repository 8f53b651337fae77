//! Port record types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a record inside the registry.
pub type PortId = u64;

/// One entry of the port registry as held by the store.
///
/// Field names serialize in camelCase; the snake_case wire names of the
/// backend are translated in the client crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRecord {
    pub id: PortId,
    pub port_number: String,
    pub project_name: String,
    pub application_name: String,
    #[serde(default)]
    pub description: String,
}

/// A record that has not been given an id yet.
///
/// Used for form drafts and import candidates alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortRecord {
    pub port_number: String,
    pub project_name: String,
    pub application_name: String,
    #[serde(default)]
    pub description: String,
}

impl NewPortRecord {
    pub fn new(
        port_number: impl Into<String>,
        project_name: impl Into<String>,
        application_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            port_number: port_number.into(),
            project_name: project_name.into(),
            application_name: application_name.into(),
            description: description.into(),
        }
    }

    /// Attaches an id, producing a stored record.
    pub fn with_id(self, id: PortId) -> PortRecord {
        PortRecord {
            id,
            port_number: self.port_number,
            project_name: self.project_name,
            application_name: self.application_name,
            description: self.description,
        }
    }

    pub fn field(&self, field: PortField) -> &str {
        match field {
            PortField::PortNumber => &self.port_number,
            PortField::ProjectName => &self.project_name,
            PortField::ApplicationName => &self.application_name,
            PortField::Description => &self.description,
        }
    }

    pub fn set_field(&mut self, field: PortField, value: impl Into<String>) {
        let value = value.into();
        match field {
            PortField::PortNumber => self.port_number = value,
            PortField::ProjectName => self.project_name = value,
            PortField::ApplicationName => self.application_name = value,
            PortField::Description => self.description = value,
        }
    }
}

impl PortRecord {
    /// Splits the record into its id and the id-less payload.
    pub fn into_parts(self) -> (PortId, NewPortRecord) {
        (
            self.id,
            NewPortRecord {
                port_number: self.port_number,
                project_name: self.project_name,
                application_name: self.application_name,
                description: self.description,
            },
        )
    }

    /// Clones the payload without the id.
    pub fn to_new(&self) -> NewPortRecord {
        self.clone().into_parts().1
    }

    pub fn field(&self, field: PortField) -> &str {
        match field {
            PortField::PortNumber => &self.port_number,
            PortField::ProjectName => &self.project_name,
            PortField::ApplicationName => &self.application_name,
            PortField::Description => &self.description,
        }
    }

    /// The tuple that identifies a record's content regardless of its id.
    pub fn content(&self) -> (&str, &str, &str, &str) {
        (
            &self.port_number,
            &self.project_name,
            &self.application_name,
            &self.description,
        )
    }
}

/// The user-editable fields of a port record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortField {
    PortNumber,
    ProjectName,
    ApplicationName,
    Description,
}

impl PortField {
    pub const ALL: [PortField; 4] = [
        PortField::PortNumber,
        PortField::ProjectName,
        PortField::ApplicationName,
        PortField::Description,
    ];

    /// Column header used in exported sheets and listings.
    pub fn header(self) -> &'static str {
        match self {
            PortField::PortNumber => "Port No",
            PortField::ProjectName => "Proje Adı",
            PortField::ApplicationName => "Uygulama Adı",
            PortField::Description => "Açıklama",
        }
    }

    /// Column names accepted on import, in priority order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            PortField::PortNumber => &["Port No", "portNumber", "port_number"],
            PortField::ProjectName => &["Proje Adı", "projectName", "project_name"],
            PortField::ApplicationName => {
                &["Uygulama Adı", "applicationName", "application_name"]
            }
            PortField::Description => &["Açıklama", "description"],
        }
    }

    /// Human-readable label for prompts and messages.
    pub fn label(self) -> &'static str {
        match self {
            PortField::PortNumber => "Port number",
            PortField::ProjectName => "Project name",
            PortField::ApplicationName => "Application name",
            PortField::Description => "Description",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, PortField::Description)
    }

    /// Parses a field name as typed on the command line.
    ///
    /// Accepts the camelCase name, the snake_case name, or a dashed form.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "port" | "portnumber" | "portno" => Some(PortField::PortNumber),
            "project" | "projectname" => Some(PortField::ProjectName),
            "application" | "app" | "applicationname" => Some(PortField::ApplicationName),
            "description" | "desc" => Some(PortField::Description),
            _ => None,
        }
    }
}

impl fmt::Display for PortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let record = NewPortRecord::new("8080", "Alpha", "Web", "").with_id(1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["portNumber"], "8080");
        assert_eq!(json["projectName"], "Alpha");
        assert_eq!(json["applicationName"], "Web");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_description_defaults_to_empty() {
        let json = r#"{"id": 4, "portNumber": "22", "projectName": "Ops", "applicationName": "ssh"}"#;
        let record: PortRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_into_parts_and_back() {
        let record = NewPortRecord::new("443", "Edge", "Proxy", "tls").with_id(9);
        let (id, new) = record.clone().into_parts();
        assert_eq!(id, 9);
        assert_eq!(new.with_id(id), record);
    }

    #[test]
    fn test_set_field() {
        let mut draft = NewPortRecord::default();
        draft.set_field(PortField::ApplicationName, "Batch");
        assert_eq!(draft.field(PortField::ApplicationName), "Batch");
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!(PortField::parse("portNumber"), Some(PortField::PortNumber));
        assert_eq!(PortField::parse("project_name"), Some(PortField::ProjectName));
        assert_eq!(PortField::parse("app"), Some(PortField::ApplicationName));
        assert_eq!(PortField::parse("DESC"), Some(PortField::Description));
        assert_eq!(PortField::parse("owner"), None);
    }

    #[test]
    fn test_only_description_is_optional() {
        let optional: Vec<_> = PortField::ALL
            .iter()
            .filter(|f| !f.is_required())
            .collect();
        assert_eq!(optional, vec![&PortField::Description]);
    }
}
