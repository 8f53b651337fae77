use async_trait::async_trait;
use portreg_core::config::HttpConfig;
use portreg_core::error::AppError;
use portreg_core::models::{PortId, PortRecord};
use portreg_core::remote::PortBackend;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Response of `GET /ports`.
///
/// ```json
/// { "data": [ { "id": 1, "port_number": "8080", ... } ] }
/// ```
#[derive(Deserialize, Debug)]
struct ListResponse {
    data: Vec<WirePort>,
}

/// Response of `POST`, `PUT` and `DELETE`.
///
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": "port already registered" }
/// ```
#[derive(Deserialize, Debug)]
struct MutationResponse {
    success: bool,
    #[serde(default)]
    data: Option<WirePort>,
    #[serde(default)]
    error: Option<String>,
}

/// A port record as the backend spells it.
///
/// Field names are snake_case on the wire. The backend may send port
/// numbers as JSON numbers and descriptions as `null`; both are read as
/// strings.
///
/// # Examples
///
/// ```
/// use portreg_client::api::WirePort;
///
/// let json = r#"{
///     "id": 3,
///     "port_number": 8080,
///     "project_name": "Alpha",
///     "application_name": "Web",
///     "description": null
/// }"#;
///
/// let wire: WirePort = serde_json::from_str(json).unwrap();
/// let record = wire.into_record().unwrap();
/// assert_eq!(record.port_number, "8080");
/// assert_eq!(record.description, "");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WirePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PortId>,
    #[serde(deserialize_with = "lenient_string")]
    pub port_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub project_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub application_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl From<&PortRecord> for WirePort {
    fn from(record: &PortRecord) -> Self {
        Self {
            id: Some(record.id),
            port_number: record.port_number.clone(),
            project_name: record.project_name.clone(),
            application_name: record.application_name.clone(),
            description: record.description.clone(),
        }
    }
}

impl WirePort {
    /// Converts into the local schema.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the backend omitted the id.
    pub fn into_record(self) -> Result<PortRecord, AppError> {
        let id = self.id.ok_or_else(|| {
            AppError::Transport(format!(
                "backend returned port {} without an id",
                self.port_number
            ))
        })?;
        Ok(self.into_record_or(id))
    }

    /// Converts into the local schema, using `fallback` when the backend
    /// omitted the id.
    pub fn into_record_or(self, fallback: PortId) -> PortRecord {
        PortRecord {
            id: self.id.unwrap_or(fallback),
            port_number: self.port_number,
            project_name: self.project_name,
            application_name: self.application_name,
            description: self.description,
        }
    }
}

/// HTTP client for the port registry REST backend.
///
/// Requests are never retried: every failure is returned to the caller,
/// which leaves local state alone and tells the user.
///
/// # Examples
///
/// ```no_run
/// use portreg_client::PortApiClient;
/// use portreg_core::config::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PortApiClient::new("http://localhost:3001/api", &HttpConfig::default())?;
/// let ports = client.list_ports().await?;
/// println!("Backend holds {} ports", ports.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PortApiClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

impl PortApiClient {
    /// Creates a client for the backend rooted at `base_url_str`.
    ///
    /// A trailing slash is added to the base path so that `ports` is
    /// resolved below it rather than replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed or cannot
    /// carry a path, and `AppError::Transport` if the HTTP client cannot be
    /// built.
    pub fn new(base_url_str: &str, config: &HttpConfig) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(base_url_str.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::InvalidUrl(base_url_str.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent("Portreg/0.1")
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))
    }

    /// Fetches every record (`GET /ports`).
    pub async fn list_ports(&self) -> Result<Vec<PortRecord>, AppError> {
        let url = self.endpoint("ports")?;
        let resp = self.send(self.client.get(url)).await?;

        let list: ListResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Invalid port listing: {}", e)))?;

        list.data.into_iter().map(WirePort::into_record).collect()
    }

    /// Creates a record (`POST /ports`), sending its local id.
    pub async fn create_port(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        let url = self.endpoint("ports")?;
        let resp = self
            .send(self.client.post(url).json(&WirePort::from(record)))
            .await?;
        let data = Self::accept(resp, "create").await?;
        Ok(data.map(|wire| wire.into_record_or(record.id)))
    }

    /// Replaces a record (`PUT /ports/{id}`).
    pub async fn update_port(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        let url = self.endpoint(&format!("ports/{}", record.id))?;
        let resp = self
            .send(self.client.put(url).json(&WirePort::from(record)))
            .await?;
        let data = Self::accept(resp, "update").await?;
        Ok(data.map(|wire| wire.into_record_or(record.id)))
    }

    /// Deletes a record (`DELETE /ports/{id}`).
    pub async fn delete_port(&self, id: PortId) -> Result<(), AppError> {
        let url = self.endpoint(&format!("ports/{}", id))?;
        let resp = self.send(self.client.delete(url)).await?;
        Self::accept(resp, "delete").await.map(|_| ())
    }

    /// Sends a request once, mapping transport failures and error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::Transport(format!("Connection failed: {}", e))
            } else {
                AppError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "backend response");
        if status.is_success() {
            return Ok(resp);
        }

        // Error bodies usually follow the mutation envelope
        let body = resp.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<MutationResponse>(&body)
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(AppError::Transport(reason))
    }

    /// Validates a mutation envelope and returns its `data`.
    ///
    /// An empty body (e.g. `204 No Content`) counts as success.
    async fn accept(resp: Response, action: &str) -> Result<Option<WirePort>, AppError> {
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let envelope: MutationResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Transport(format!("Invalid {} response: {}", action, e)))?;
        if !envelope.success {
            return Err(AppError::Transport(
                envelope
                    .error
                    .unwrap_or_else(|| format!("backend reported {} failure", action)),
            ));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl PortBackend for PortApiClient {
    async fn fetch_all(&self) -> Result<Vec<PortRecord>, AppError> {
        self.list_ports().await
    }

    async fn create(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        self.create_port(record).await
    }

    async fn update(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        self.update_port(record).await
    }

    async fn delete(&self, id: PortId) -> Result<(), AppError> {
        self.delete_port(id).await
    }
}
