//! Configuration loading and constants.
//!
//! Loads service configuration from TOML files and defines constants for
//! HTTP cache headers, the greeting endpoint, ConfigMap lookup and default
//! paths. `AppConfig` is the root configuration struct containing all settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// HTTP Response Cache Control
// =============================================================================

/// Greetings change whenever the ConfigMap does, so upstream caches must not
/// hold on to them.
pub const CACHE_CONTROL_API: &str = "no-store";

/// Static assets (HTML, CSS, JS)
pub const CACHE_CONTROL_STATIC: &str = "public, max-age=3600";

// =============================================================================
// Greeting Constants
// =============================================================================

/// Placeholder in the message template replaced by the caller's name
pub const NAME_MARKER: &str = "%s";

/// Name substituted when the request carries no `name` parameter
pub const DEFAULT_NAME: &str = "World";

/// Body returned while no configuration is loaded
pub const NO_CONFIG_MESSAGE: &str = "no config map";

// =============================================================================
// ConfigMap Source Constants
// =============================================================================

/// Name of the ConfigMap holding the greeting configuration
pub const DEFAULT_CONFIG_MAP_NAME: &str = "app-config";

/// Key inside the ConfigMap's `data` holding the YAML payload
pub const DEFAULT_CONFIG_MAP_KEY: &str = "app-config.yml";

/// Service account token mounted into every pod
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Namespace of the pod, mounted next to the token
pub const DEFAULT_NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Timeout for a single ConfigMap request
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// Interval between two ConfigMap fetches
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Directory for static files
pub const STATIC_DIR: &str = "public";

/// Default static log filter when RUST_LOG is not set.
///
/// The effective verbosity is additionally capped by the level carried in
/// the ConfigMap, see [`crate::logging`].
pub const DEFAULT_LOG_FILTER: &str = "configmap_greeter=trace,tower_http=debug,info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Verbosity used until the first ConfigMap is applied
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Polling loop settings
    #[serde(default)]
    pub poller: PollerConfig,
    /// Where the greeting configuration comes from
    #[serde(default)]
    pub source: SourceConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Directory served for every path not claimed by the API
    #[serde(default = "HttpServerConfig::default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: Self::default_static_dir(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_static_dir() -> PathBuf {
        PathBuf::from(STATIC_DIR)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Milliseconds between two fetches (default: 2000)
    #[serde(default = "PollerConfig::default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
        }
    }
}

impl PollerConfig {
    fn default_interval_ms() -> u64 {
        DEFAULT_POLL_INTERVAL_MS
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Greeting configuration source
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// ConfigMap read from the Kubernetes API
    Kubernetes(KubernetesSourceConfig),
    /// YAML file on disk, e.g. a ConfigMap mounted as a volume
    File(FileSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Kubernetes(KubernetesSourceConfig::default())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KubernetesSourceConfig {
    #[serde(default = "KubernetesSourceConfig::default_config_map")]
    pub config_map: String,
    #[serde(default = "KubernetesSourceConfig::default_data_key")]
    pub data_key: String,
    /// Namespace override. Read from `namespace_path` when unset.
    pub namespace: Option<String>,
    /// API server override. Derived from the in-cluster environment when unset.
    pub api_server: Option<String>,
    #[serde(default = "KubernetesSourceConfig::default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "KubernetesSourceConfig::default_namespace_path")]
    pub namespace_path: PathBuf,
    /// Skip TLS certificate verification (default: true)
    #[serde(default = "KubernetesSourceConfig::default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default = "KubernetesSourceConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for KubernetesSourceConfig {
    fn default() -> Self {
        Self {
            config_map: Self::default_config_map(),
            data_key: Self::default_data_key(),
            namespace: None,
            api_server: None,
            token_path: Self::default_token_path(),
            namespace_path: Self::default_namespace_path(),
            accept_invalid_certs: Self::default_accept_invalid_certs(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

impl KubernetesSourceConfig {
    fn default_config_map() -> String {
        DEFAULT_CONFIG_MAP_NAME.to_string()
    }

    fn default_data_key() -> String {
        DEFAULT_CONFIG_MAP_KEY.to_string()
    }

    fn default_token_path() -> PathBuf {
        PathBuf::from(DEFAULT_TOKEN_PATH)
    }

    fn default_namespace_path() -> PathBuf {
        PathBuf::from(DEFAULT_NAMESPACE_PATH)
    }

    fn default_accept_invalid_certs() -> bool {
        true
    }

    fn default_request_timeout() -> u64 {
        DEFAULT_SOURCE_TIMEOUT_SECS
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
    /// Verbosity before the first ConfigMap is applied
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: Self::default_format(),
            level: Self::default_level(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    fn default_level() -> String {
        DEFAULT_LOG_LEVEL.to_string()
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poller.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.http.port == 0 {
            return Err(ConfigError::Validation(
                "http.port must be greater than zero".to_string(),
            ));
        }
        if let SourceConfig::Kubernetes(kube) = &self.source {
            if kube.config_map.is_empty() || kube.data_key.is_empty() {
                return Err(ConfigError::Validation(
                    "source.config_map and source.data_key must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
