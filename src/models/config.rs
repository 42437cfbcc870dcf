use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default feed host, the public test server for the passenger feed
pub const DEFAULT_HOST: &str = "ltnm.learncppthroughprojects.com";
/// Default STOMP virtual host sent in the handshake
pub const DEFAULT_STOMP_HOST: &str = "transportforlondon.com";
/// Default WebSocket endpoint carrying the STOMP feed
pub const DEFAULT_STOMP_ENDPOINT: &str = "/network-events";
/// Default WebSocket echo endpoint used by the connectivity check
pub const DEFAULT_ECHO_ENDPOINT: &str = "/echo";
/// Default URL of the published network layout file
pub const DEFAULT_LAYOUT_URL: &str =
    "https://ltnm.learncppthroughprojects.com/network-layout.json";

/// Errors produced while loading or saving the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration failed semantic validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Configuration file could not be written
    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `[server]` section: where the live feed lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Feed server hostname
    pub host: String,
    /// Feed server port
    pub port: u16,
    /// Whether to wrap the WebSocket in TLS
    pub use_tls: bool,
    /// WebSocket endpoint carrying the STOMP feed
    pub stomp_endpoint: String,
    /// WebSocket endpoint echoing messages back, for connectivity checks
    pub echo_endpoint: String,
    /// Virtual host sent in the STOMP handshake (not the TCP host)
    pub stomp_host: String,
    /// STOMP destination publishing passenger events
    pub stomp_destination: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 443,
            use_tls: true,
            stomp_endpoint: DEFAULT_STOMP_ENDPOINT.to_string(),
            echo_endpoint: DEFAULT_ECHO_ENDPOINT.to_string(),
            stomp_host: DEFAULT_STOMP_HOST.to_string(),
            stomp_destination: "/passengers".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// `[auth]` section: feed credentials for the STOMP handshake
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// STOMP login
    pub login: String,
    /// STOMP passcode
    pub passcode: String,
}

/// `[layout]` section: where the network layout file comes from and where
/// it is cached locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// HTTPS URL of the published layout file
    pub url: String,
    /// Local path the layout file is downloaded to
    pub file: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LAYOUT_URL.to_string(),
            file: PathBuf::from("network-layout.json"),
        }
    }
}

/// `[tls]` section: optional CA bundle override
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM bundle to verify the server against; system/webpki roots are
    /// used when unset
    pub ca_cert_file: Option<PathBuf>,
}

/// Complete monitor configuration, read from `netmon.toml`.
///
/// Every section and field is optional in the file; missing values fall
/// back to the defaults pointing at the public test feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Feed server settings
    pub server: ServerConfig,
    /// Feed credentials
    pub auth: AuthConfig,
    /// Network layout source
    pub layout: LayoutConfig,
    /// TLS trust settings
    pub tls: TlsConfig,
}

impl MonitorConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, falling back to defaults when the file
    /// does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check structural rules that hold for every command
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Invalid("server.host cannot be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port cannot be 0".to_string()));
        }
        if self.server.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.connect_timeout_secs cannot be 0".to_string(),
            ));
        }
        if !self.server.stomp_endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.stomp_endpoint must start with '/' (got '{}')",
                self.server.stomp_endpoint
            )));
        }
        if !self.server.echo_endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.echo_endpoint must start with '/' (got '{}')",
                self.server.echo_endpoint
            )));
        }
        if !self.server.stomp_destination.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.stomp_destination must start with '/' (got '{}')",
                self.server.stomp_destination
            )));
        }
        if self.layout.url.is_empty() {
            return Err(ConfigError::Invalid("layout.url cannot be empty".to_string()));
        }
        Ok(())
    }

    /// The live feed requires credentials; reject an empty login or
    /// passcode before attempting a handshake the server will refuse
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.auth.login.is_empty() || self.auth.passcode.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.login and auth.passcode are required to connect to the feed \
                 (set them in netmon.toml)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
