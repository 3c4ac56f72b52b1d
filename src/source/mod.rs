//! Greeting configuration sources.
//!
//! A source answers one question per poll: what does the greeting
//! configuration look like right now? `Ok(None)` means the source was
//! reachable but holds no configuration; the poller then clears the
//! published state. Errors leave the published state untouched.

mod file;
mod kube;

pub use file::FileSource;
pub use kube::{ClusterCredentials, KubernetesSource};

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::greeting::GreetingConfig;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Cluster credentials unavailable: {0}")]
    Credentials(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: http::StatusCode },

    #[error("Invalid ConfigMap response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Invalid greeting configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the poller fetches the greeting configuration from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Short description used in log fields.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Option<GreetingConfig>, SourceError>;
}

/// Build the source selected by the service configuration.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn ConfigSource>, SourceError> {
    match config {
        SourceConfig::Kubernetes(kube) => Ok(Box::new(KubernetesSource::new(kube)?)),
        SourceConfig::File(file) => Ok(Box::new(FileSource::new(&file.path))),
    }
}
