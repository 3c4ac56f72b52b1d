//! Greeting configuration read from a ConfigMap through the Kubernetes API.
//!
//! Credentials follow the in-cluster conventions: API server from the
//! `KUBERNETES_SERVICE_*` environment, namespace and bearer token from the
//! service account mount. Every piece can be overridden from the service
//! configuration, e.g. to point at `kubectl proxy` during development.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;

use super::{ConfigSource, SourceError};
use crate::config::KubernetesSourceConfig;
use crate::greeting::GreetingConfig;

const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// Where and as whom to talk to the API server.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCredentials {
    pub api_server: String,
    pub namespace: String,
    /// Bearer token file; re-read on every request so rotated tokens are used.
    pub token_path: PathBuf,
}

impl ClusterCredentials {
    /// Resolve credentials from the configuration and the process environment.
    pub fn resolve(config: &KubernetesSourceConfig) -> Result<Self, SourceError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    pub(crate) fn resolve_with<F>(config: &KubernetesSourceConfig, env: F) -> Result<Self, SourceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_server = match &config.api_server {
            Some(server) => server.trim_end_matches('/').to_string(),
            None => in_cluster_api_server(&env)?,
        };

        let namespace = match &config.namespace {
            Some(namespace) => namespace.clone(),
            None => {
                let namespace = std::fs::read_to_string(&config.namespace_path).map_err(|e| {
                    SourceError::Credentials(format!(
                        "no namespace configured and {} unreadable: {}",
                        config.namespace_path.display(),
                        e
                    ))
                })?;
                namespace.trim().to_string()
            }
        };

        if namespace.is_empty() {
            return Err(SourceError::Credentials("namespace is empty".to_string()));
        }

        Ok(Self {
            api_server,
            namespace,
            token_path: config.token_path.clone(),
        })
    }

    /// Current bearer token, `None` when no token file is mounted.
    async fn token(&self) -> Result<Option<String>, SourceError> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::Credentials(format!(
                "token {} unreadable: {}",
                self.token_path.display(),
                e
            ))),
        }
    }
}

fn in_cluster_api_server<F>(env: &F) -> Result<String, SourceError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = env(SERVICE_HOST_ENV).ok_or_else(|| {
        SourceError::Credentials(format!(
            "no api_server configured and {} is not set",
            SERVICE_HOST_ENV
        ))
    })?;
    let port = env(SERVICE_PORT_ENV).unwrap_or_else(|| "443".to_string());

    if host.contains(':') {
        Ok(format!("https://[{}]:{}", host, port))
    } else {
        Ok(format!("https://{}:{}", host, port))
    }
}

/// The subset of the ConfigMap resource the service reads.
#[derive(Debug, Deserialize)]
struct ConfigMap {
    #[serde(default)]
    data: Option<BTreeMap<String, String>>,
}

/// Extract the greeting configuration stored under `key`.
fn greeting_from_config_map(
    config_map: &ConfigMap,
    key: &str,
) -> Result<Option<GreetingConfig>, SourceError> {
    let Some(payload) = config_map.data.as_ref().and_then(|data| data.get(key)) else {
        return Ok(None);
    };
    Ok(GreetingConfig::from_yaml(payload)?)
}

pub struct KubernetesSource {
    client: reqwest::Client,
    config: KubernetesSourceConfig,
}

impl KubernetesSource {
    pub fn new(config: &KubernetesSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(SourceError::Client)?;

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for the Kubernetes API");
        }

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, credentials: &ClusterCredentials) -> String {
        format!(
            "{}/api/v1/namespaces/{}/configmaps/{}",
            credentials.api_server, credentials.namespace, self.config.config_map
        )
    }
}

#[async_trait]
impl ConfigSource for KubernetesSource {
    fn describe(&self) -> String {
        match &self.config.namespace {
            Some(namespace) => format!("configmap:{}/{}", namespace, self.config.config_map),
            None => format!("configmap:{}", self.config.config_map),
        }
    }

    async fn fetch(&self) -> Result<Option<GreetingConfig>, SourceError> {
        // Resolved per fetch, like the token, so a pod started before its
        // service account was mounted recovers on a later tick
        let credentials = ClusterCredentials::resolve(&self.config)?;
        let url = self.url(&credentials);

        let mut request = self.client.get(&url);
        if let Some(token) = credentials.token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| SourceError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(url = %url, "ConfigMap not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status { url, status });
        }

        let config_map: ConfigMap = response.json().await.map_err(SourceError::Decode)?;
        greeting_from_config_map(&config_map, &self.config.data_key)
    }
}
