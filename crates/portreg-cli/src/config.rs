use clap::{Parser, Subcommand, ValueEnum};
use portreg_core::{PortField, PortQuery, SortOrder};
use std::path::PathBuf;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "portreg")]
#[command(author, version, about = "Port registry with spreadsheet import and export")]
#[command(after_help = "Examples:
  portreg shell
  portreg --api-url http://localhost:3000/api list --sort port
  portreg import ports.xlsx
  portreg delete 12 --yes")]
pub struct Config {
    /// Base URL of the port registry REST backend
    #[arg(long, env = "PORTREG_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Custom path to config.toml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive session
    #[command(after_help = "Without --api-url the session works on an in-memory collection.")]
    Shell,
    /// List port records
    #[command(after_help = "Examples:
  portreg list --search billing
  portreg list --project alpha --sort port --desc --page 2
  portreg list --format json > ports.json")]
    List {
        /// Match against any field
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by port number
        #[arg(long)]
        port: Option<String>,
        /// Filter by project name
        #[arg(long)]
        project: Option<String>,
        /// Filter by application name
        #[arg(long)]
        application: Option<String>,
        /// Sort by a field
        #[arg(long)]
        sort: Option<SortField>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Rows per page
        #[arg(long, default_value = "5")]
        page_size: usize,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: ListFormat,
    },
    /// Add a port record
    Add {
        /// Port number (digits only)
        #[arg(long)]
        port: String,
        #[arg(long)]
        project: String,
        #[arg(long)]
        application: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Change fields of an existing record
    Update {
        /// Record id
        id: u64,
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        application: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete a record
    Delete {
        /// Record id
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import records from an .xlsx file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Export all records to an .xlsx file
    Export {
        /// File name; `.xlsx` is appended when missing
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Command {
    /// Whether the command can run without a backend.
    pub fn is_local(&self) -> bool {
        matches!(self, Command::Shell)
    }

    /// The query described by `list` arguments.
    pub fn list_query(&self) -> Option<PortQuery> {
        let Command::List {
            search,
            port,
            project,
            application,
            sort,
            desc,
            page,
            page_size,
            ..
        } = self
        else {
            return None;
        };

        let mut query = PortQuery::default().page(*page).page_size(*page_size);
        if let Some(search) = search {
            query = query.search(search.clone());
        }
        for (field, needle) in [
            (PortField::PortNumber, port),
            (PortField::ProjectName, project),
            (PortField::ApplicationName, application),
        ] {
            if let Some(needle) = needle {
                query = query.filter(field, needle.clone());
            }
        }
        if let Some(sort) = sort {
            query = query.sort_by((*sort).into(), sort_order(*desc));
        }
        Some(query)
    }

    /// Field changes requested by `update`, in column order.
    pub fn update_changes(&self) -> Vec<(PortField, String)> {
        let Command::Update {
            port,
            project,
            application,
            description,
            ..
        } = self
        else {
            return Vec::new();
        };
        [
            (PortField::PortNumber, port),
            (PortField::ProjectName, project),
            (PortField::ApplicationName, application),
            (PortField::Description, description),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.clone().map(|v| (field, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Port,
    Project,
    Application,
    Description,
}

impl From<SortField> for PortField {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Port => PortField::PortNumber,
            SortField::Project => PortField::ProjectName,
            SortField::Application => PortField::ApplicationName,
            SortField::Description => PortField::Description,
        }
    }
}

/// Supported list output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Aligned text table
    Table,
    /// JSON array of the records on the page
    Json,
}

pub fn sort_order(desc: bool) -> SortOrder {
    if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_sort() {
        let config = Config::try_parse_from([
            "portreg", "list", "--project", "alpha", "--sort", "port", "--desc", "--page", "2",
        ])
        .unwrap();
        match config.command {
            Command::List {
                project,
                sort,
                desc,
                page,
                page_size,
                format,
                ..
            } => {
                assert_eq!(project.as_deref(), Some("alpha"));
                assert_eq!(sort, Some(SortField::Port));
                assert!(desc);
                assert_eq!(page, 2);
                assert_eq!(page_size, 5);
                assert_eq!(format, ListFormat::Table);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_desc_requires_sort() {
        assert!(Config::try_parse_from(["portreg", "list", "--desc"]).is_err());
    }

    #[test]
    fn test_parse_delete_and_global_flags() {
        let config = Config::try_parse_from([
            "portreg", "delete", "7", "--yes", "--api-url", "http://localhost:3000/api",
        ])
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:3000/api"));
        assert!(matches!(config.command, Command::Delete { id: 7, yes: true }));
        assert!(!config.command.is_local());
    }

    #[test]
    fn test_add_requires_fields() {
        assert!(Config::try_parse_from(["portreg", "add", "--port", "80"]).is_err());
        let config = Config::try_parse_from([
            "portreg", "add", "--port", "80", "--project", "Web", "--application", "nginx",
        ])
        .unwrap();
        match config.command {
            Command::Add { description, .. } => assert_eq!(description, ""),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_query() {
        let config = Config::try_parse_from([
            "portreg", "list", "--search", "web", "--application", "nginx", "--sort", "project",
        ])
        .unwrap();
        let query = config.command.list_query().unwrap();
        assert_eq!(query.search.as_deref(), Some("web"));
        assert_eq!(query.filters, vec![(PortField::ApplicationName, "nginx".to_string())]);
        assert_eq!(query.sort, Some((PortField::ProjectName, SortOrder::Ascending)));
        assert_eq!(query.page, 1);
        assert!(Command::Shell.list_query().is_none());
    }

    #[test]
    fn test_update_changes() {
        let config = Config::try_parse_from([
            "portreg", "update", "3", "--description", "", "--port", "81",
        ])
        .unwrap();
        assert_eq!(
            config.command.update_changes(),
            vec![
                (PortField::PortNumber, "81".to_string()),
                (PortField::Description, String::new()),
            ]
        );
    }

    #[test]
    fn test_sort_field_mapping() {
        assert_eq!(PortField::from(SortField::Port), PortField::PortNumber);
        assert_eq!(PortField::from(SortField::Application), PortField::ApplicationName);
        assert_eq!(sort_order(true), SortOrder::Descending);
    }
}
