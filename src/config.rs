use crate::{RecommendError, Result};
use std::path::PathBuf;
use std::time::Duration;

// ================================================================================================
// SERVER CONFIGURATION
// ================================================================================================

/// Port the server listens on and the connector dials by default.
pub const DEFAULT_PORT: u16 = 8888;

/// Configuration for [`SessionServer`](crate::SessionServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind (0 picks an ephemeral port)
    pub port: u16,
    /// File every received request line is appended to, if set
    pub request_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_log: None,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_request_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.request_log = Some(path.into());
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ================================================================================================
// CONNECTOR CONFIGURATION
// ================================================================================================

/// Configuration for [`Connector`](crate::Connector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Upper bound for establishing a TCP connection
    pub connect_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ================================================================================================
// LAST.FM API CONFIGURATION
// ================================================================================================

/// Environment variable holding the Last.fm API key.
pub const API_KEY_ENV: &str = "LASTFM_API_KEY";

/// Older name for [`API_KEY_ENV`], still honoured.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Configuration for [`LastFmApiClient`](crate::LastFmApiClient).
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Last.fm API key, sent as a query parameter
    pub api_key: String,
    /// Base URL of the Last.fm REST endpoint
    pub base_url: String,
    /// Upper bound for a single provider call
    pub timeout: Duration,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://ws.audioscrobbler.com/2.0/";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Read the API key from `LASTFM_API_KEY`, falling back to `API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        [API_KEY_ENV, LEGACY_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .map(Self::new)
            .ok_or_else(|| {
                RecommendError::Config(format!(
                    "Last.fm API key not set; export {API_KEY_ENV}=your_api_key"
                ))
            })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
