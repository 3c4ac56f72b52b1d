//! Greeting configuration model.
//!
//! `GreetingConfig` is the YAML document stored in the ConfigMap. Besides the
//! `message` template and the `level` used to drive log verbosity, any other
//! keys are retained so that change detection compares the whole document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::config::NAME_MARKER;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingConfig {
    /// Template containing one or more `%s` markers
    pub message: String,
    /// Log severity name (winston or tracing vocabulary)
    pub level: String,
    /// Keys not used by the service, kept for structural comparison
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl GreetingConfig {
    pub fn new(message: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: level.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Parse a YAML payload. An empty document or an explicit `null` means
    /// "no configuration".
    pub fn from_yaml(payload: &str) -> Result<Option<Self>, serde_yaml::Error> {
        if payload.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(payload)
    }

    /// Render the template for `name`.
    pub fn render(&self, name: &str) -> String {
        render(&self.message, name)
    }

    /// Logging verbosity derived from `level`, `None` when the name is unknown.
    pub fn verbosity(&self) -> Option<LevelFilter> {
        parse_level(&self.level)
    }
}

/// Replace every marker in `template` with `name`.
pub fn render(template: &str, name: &str) -> String {
    template.replace(NAME_MARKER, name)
}

/// Map a severity name to a tracing level filter.
///
/// Accepts the tracing names as well as the npm/winston ones that ConfigMaps
/// written for other runtimes tend to carry.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" | "silent" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "http" | "verbose" | "debug" => Some(LevelFilter::DEBUG),
        "silly" | "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}
