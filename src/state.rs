//! Shared application state for request handlers.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::AppConfig;
use crate::greeting::GreetingConfig;

/// Holder for the currently published greeting configuration.
///
/// Written by the config poller only, read by every request. Reads never
/// block; a publish is a single atomic pointer swap, so a reader sees either
/// the previous or the new configuration, never a mix.
#[derive(Clone, Default)]
pub struct GreetingStore {
    current: Arc<ArcSwapOption<GreetingConfig>>,
}

impl GreetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration in effect, if any.
    pub fn load(&self) -> Option<Arc<GreetingConfig>> {
        self.current.load_full()
    }

    /// Replace the configuration, returning the published `Arc`.
    pub fn publish(&self, config: GreetingConfig) -> Arc<GreetingConfig> {
        let config = Arc::new(config);
        self.current.store(Some(Arc::clone(&config)));
        config
    }

    /// Drop the configuration, returning what was in effect.
    pub fn clear(&self) -> Option<Arc<GreetingConfig>> {
        self.current.swap(None)
    }
}

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub greetings: GreetingStore,
}

impl AppState {
    /// Creates a new application state from the given configuration and greeting store.
    pub fn new(config: AppConfig, greetings: GreetingStore) -> Self {
        Self {
            config: Arc::new(config),
            greetings,
        }
    }
}
