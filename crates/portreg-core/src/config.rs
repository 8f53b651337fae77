//! Configuration types for Portreg components.
//!
//! Values come from, in increasing priority: built-in defaults, the
//! optional `config.toml` file, and command-line flags / environment
//! variables handled by the CLI.
//!
//! ```toml
//! [api]
//! url = "http://localhost:3001/api/"
//! timeout_secs = 10
//!
//! [sync]
//! forward_concurrency = 4
//!
//! [export]
//! file_name = "Port_Listesi"
//! sheet_name = "Portlar"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;

/// Default export file name, without extension.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "Port_Listesi";

/// Name of the single sheet written on export.
pub const DEFAULT_SHEET_NAME: &str = "Portlar";

/// HTTP client configuration for backend calls.
///
/// There is deliberately no retry setting: failed requests are reported
/// to the user, who may try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Forwarding of imported records to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of create requests in flight during an import
    pub forward_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            forward_concurrency: 10,
        }
    }
}

/// Spreadsheet export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub default_file_name: String,
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    pub forward_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    pub file_name: Option<String>,
    pub sheet_name: Option<String>,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PortregConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub export: ExportSection,
}

impl PortregConfig {
    /// Backend URL: `explicit` (flag or environment) when set, otherwise
    /// `[api] url` from the file. Blank values count as unset.
    pub fn api_url(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .or(self.api.url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    pub fn http(&self) -> HttpConfig {
        let mut http = HttpConfig::default();
        if let Some(secs) = self.api.timeout_secs {
            http.timeout = Duration::from_secs(secs);
        }
        http
    }

    pub fn sync(&self) -> SyncConfig {
        let mut sync = SyncConfig::default();
        if let Some(n) = self.sync.forward_concurrency {
            sync.forward_concurrency = n.max(1);
        }
        sync
    }

    pub fn export(&self) -> ExportConfig {
        let mut export = ExportConfig::default();
        if let Some(name) = &self.export.file_name {
            export.default_file_name = name.clone();
        }
        if let Some(sheet) = &self.export.sheet_name {
            export.sheet_name = sheet.clone();
        }
        export
    }
}

/// `<config dir>/portreg/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("portreg").join("config.toml"))
}

/// Loads the configuration file.
///
/// With `path` set, the file must exist. Without it, the default path is
/// tried and a missing file yields the defaults.
///
/// # Errors
///
/// Returns `AppError::Config` if the file cannot be read or is not valid
/// TOML for [`PortregConfig`].
pub fn load_config(path: Option<&Path>) -> Result<PortregConfig, AppError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(PortregConfig::default()),
        },
    };

    if !required && !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(PortregConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
    let config: PortregConfig = toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.forward_concurrency, 10);
    }

    #[test]
    fn test_export_config_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.default_file_name, "Port_Listesi");
        assert_eq!(config.sheet_name, "Portlar");
    }

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
url = "http://localhost:3001/api/"
timeout_secs = 5

[sync]
forward_concurrency = 0

[export]
file_name = "ports"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.api.url.as_deref(), Some("http://localhost:3001/api/"));
        assert_eq!(config.http().timeout, Duration::from_secs(5));
        assert_eq!(config.sync().forward_concurrency, 1);
        assert_eq!(config.export().default_file_name, "ports");
        assert_eq!(config.export().sheet_name, "Portlar");
    }

    #[test]
    fn test_api_url_falls_back_to_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nurl = \"http://files.example/api\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.api_url(None).as_deref(), Some("http://files.example/api"));
        assert_eq!(
            config.api_url(Some("http://flag.example/api")).as_deref(),
            Some("http://flag.example/api")
        );
        assert_eq!(PortregConfig::default().api_url(None), None);
        assert_eq!(PortregConfig::default().api_url(Some("  ")), None);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config, PortregConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nendpoint = \"x\"").unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(AppError::Config(_))
        ));
    }
}
