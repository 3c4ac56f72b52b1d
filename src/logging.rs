//! Tracing subscriber setup and runtime verbosity control.
//!
//! Two filters stack on the subscriber:
//! - an `EnvFilter` with static per-target directives (CLI > RUST_LOG > default)
//! - a reloadable `LevelFilter` cap, driven by the `level` carried in the
//!   greeting ConfigMap
//!
//! An event is emitted only if both let it through.

use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::greeting::parse_level;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
    #[error("Failed to reload log level: {0}")]
    Reload(#[from] reload::Error),
}

/// Read and change the active logging verbosity.
pub trait VerbosityControl: Send + Sync {
    fn current(&self) -> LevelFilter;
    fn set(&self, level: LevelFilter) -> Result<(), LoggingError>;
}

/// Verbosity backed by the reload handle of the installed subscriber.
#[derive(Clone)]
pub struct ReloadableVerbosity {
    handle: reload::Handle<LevelFilter, Registry>,
}

impl VerbosityControl for ReloadableVerbosity {
    fn current(&self) -> LevelFilter {
        self.handle.clone_current().unwrap_or(LevelFilter::OFF)
    }

    fn set(&self, level: LevelFilter) -> Result<(), LoggingError> {
        self.handle.modify(|filter| *filter = level)?;
        Ok(())
    }
}

/// Verbosity held in memory only, for running without a global subscriber.
#[derive(Debug)]
pub struct InMemoryVerbosity {
    level: Mutex<LevelFilter>,
}

impl InMemoryVerbosity {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level: Mutex::new(level),
        }
    }
}

impl VerbosityControl for InMemoryVerbosity {
    fn current(&self) -> LevelFilter {
        *self.level.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, level: LevelFilter) -> Result<(), LoggingError> {
        *self.level.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = level;
        Ok(())
    }
}

/// Install the global subscriber.
///
/// `filter` holds the static `EnvFilter` directives; the initial verbosity cap
/// comes from `config.level` until the first ConfigMap replaces it.
pub fn init(filter: &str, config: &LoggingConfig) -> Result<ReloadableVerbosity, LoggingError> {
    let initial = parse_level(&config.level)
        .ok_or_else(|| LoggingError::UnknownLevel(config.level.clone()))?;
    let (level_layer, handle) = reload::Layer::new(initial);

    let (text, json) = if config.format.eq_ignore_ascii_case("json") {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(level_layer)
        .with(EnvFilter::new(filter))
        .with(text)
        .with(json)
        .try_init()?;

    Ok(ReloadableVerbosity { handle })
}
