use poolbench_common::{BenchError, ClientError, ResourceClient, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use uuid::Uuid;

/// Acquisition wait used when the target file does not set `max_wait_millis`.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(30_000);

/// Connection properties that feed credentials instead of request headers.
const CREDENTIAL_PROPERTIES: [&str; 3] = ["user", "username", "password"];

/// Target description read from the `--properties` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub connection_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Upper bound on how long `acquire` waits for a free connection.
    #[serde(default)]
    pub max_wait_millis: Option<u64>,
    /// Path drained on every acquisition before the handle is handed out.
    #[serde(default)]
    pub validation_query: Option<String>,
    /// Extra properties; sent as request headers except for the credential keys.
    #[serde(default)]
    pub connection_properties: BTreeMap<String, String>,
}

impl TargetConfig {
    /// Read and validate a target file. A missing or unreadable file is an I/O
    /// failure; malformed content or a blank `connection_url` is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BenchError::Io(format!(
                "Properties file does not exist: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| BenchError::Io(e.to_string()))?;
        let config: TargetConfig =
            serde_json::from_str(&text).map_err(|e| BenchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection_url.trim().is_empty() {
            return Err(BenchError::InvalidConfig(
                "Property 'connection_url' is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective credentials. `connection_properties.user`/`username`/`password`
    /// take precedence over the top-level fields.
    pub fn credentials(&self) -> Option<(String, Option<String>)> {
        let props = &self.connection_properties;
        let user = props
            .get("username")
            .or_else(|| props.get("user"))
            .or(self.username.as_ref())?;
        let password = props.get("password").or(self.password.as_ref());
        Some((user.clone(), password.cloned()))
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait_millis
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MAX_WAIT)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.connection_properties {
            if CREDENTIAL_PROPERTIES.contains(&name.as_str()) {
                continue;
            }
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                BenchError::InvalidConfig(format!("Invalid connection property name: {name}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                BenchError::InvalidConfig(format!("Invalid value for connection property {name}"))
            })?;
            headers.insert(header, value);
        }
        Ok(headers)
    }
}

/// A checked-out connection. Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct PooledConnection {
    _permit: OwnedSemaphorePermit,
}

/// HTTP connection pool bounded to `connections` concurrent checkouts.
/// The operation string is a request path appended to `connection_url`.
pub struct HttpPool {
    base_url: String,
    permits: Arc<Semaphore>,
    http_client: reqwest::Client,
    max_wait: Duration,
    credentials: Option<(String, Option<String>)>,
    validation_query: Option<String>,
}

impl HttpPool {
    pub fn new(config: &TargetConfig, connections: u32) -> Result<Self> {
        config.validate()?;
        let size = connections as usize;
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(size)
            .default_headers(config.headers()?)
            .build()
            .map_err(|e| BenchError::InvalidConfig(e.to_string()))?;

        tracing::debug!(
            url = %config.connection_url,
            connections,
            max_wait_ms = config.max_wait().as_millis() as u64,
            "http pool configured"
        );

        Ok(Self {
            base_url: config.connection_url.trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(size)),
            http_client,
            max_wait: config.max_wait(),
            credentials: config.credentials(),
            validation_query: config.validation_query.clone(),
        })
    }

    /// Build the URL for an operation path against the pool's target.
    pub fn build_url(&self, operation: &str) -> String {
        if operation.starts_with('/') {
            format!("{}{}", self.base_url, operation)
        } else {
            format!("{}/{}", self.base_url, operation)
        }
    }

    /// Connections currently free to check out.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Issue a GET for `operation` and read the body to the end.
    /// Returns the number of body bytes consumed.
    async fn drain(&self, operation: &str) -> std::result::Result<u64, ClientError> {
        let mut request = self
            .http_client
            .get(self.build_url(operation))
            .header("X-Request-Id", Uuid::new_v4().to_string());
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            return Err(ClientError::Status(status.as_u16(), reason.to_string()));
        }

        let mut consumed = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?
        {
            consumed += chunk.len() as u64;
        }
        Ok(consumed)
    }
}

impl ResourceClient for HttpPool {
    type Handle = PooledConnection;

    async fn acquire(&self) -> std::result::Result<PooledConnection, ClientError> {
        let permit = timeout(self.max_wait, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| ClientError::AcquireTimeout(self.max_wait.as_millis() as u64))?
            .map_err(|_| ClientError::Network("connection pool closed".to_string()))?;

        if let Some(query) = &self.validation_query {
            self.drain(query)
                .await
                .map_err(|e| ClientError::Validation(e.to_string()))?;
        }

        Ok(PooledConnection { _permit: permit })
    }

    async fn execute(
        &self,
        handle: PooledConnection,
        operation: &str,
    ) -> std::result::Result<(), ClientError> {
        let consumed = self.drain(operation).await;
        drop(handle);
        tracing::trace!(?consumed, operation, "operation finished");
        consumed.map(|_| ())
    }
}
