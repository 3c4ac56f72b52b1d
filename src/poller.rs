//! Periodic refresh of the greeting configuration.
//!
//! Every tick the poller asks its [`ConfigSource`] for the current
//! configuration and reconciles the [`GreetingStore`] with the answer:
//!
//! ```text
//! fetch error            → log, keep what is published
//! no configuration       → clear the store
//! same document          → nothing
//! different document     → publish, then align log verbosity with `level`
//! ```
//!
//! Fetches are awaited inside the loop, so at most one is in flight. Ticks
//! that elapse while a fetch is outstanding are skipped rather than queued,
//! which keeps results applied in the order they were requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::instrument;

use crate::greeting::GreetingConfig;
use crate::logging::VerbosityControl;
use crate::source::ConfigSource;
use crate::state::GreetingStore;

/// What a single tick did to the published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The source failed; published state untouched
    Failed,
    /// The source holds no configuration; published state cleared
    Cleared,
    /// Same document as the one published
    Unchanged,
    /// A new document was published
    Updated { verbosity_changed: bool },
}

pub struct ConfigPoller {
    source: Box<dyn ConfigSource>,
    store: GreetingStore,
    verbosity: Arc<dyn VerbosityControl>,
    interval: Duration,
}

impl ConfigPoller {
    pub fn new(
        source: Box<dyn ConfigSource>,
        store: GreetingStore,
        verbosity: Arc<dyn VerbosityControl>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            verbosity,
            interval,
        }
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "Config poller starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            // A hanging fetch must not hold up shutdown
            tokio::select! {
                outcome = self.tick() => {
                    tracing::trace!(?outcome, "Config poll finished");
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Config poller stopped");
    }

    /// Fetch once and reconcile the published state.
    #[instrument(name = "poller::tick", skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let fetched = match self.source.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(source = %self.source.describe(), error = %e, "Error getting config");
                return TickOutcome::Failed;
            }
        };

        let Some(config) = fetched else {
            if self.store.clear().is_some() {
                tracing::warn!(source = %self.source.describe(), "Configuration removed");
            }
            return TickOutcome::Cleared;
        };

        if self.store.load().as_deref() == Some(&config) {
            return TickOutcome::Unchanged;
        }

        let published = self.store.publish(config);
        tracing::debug!(message = %published.message, level = %published.level, "Configuration updated");

        TickOutcome::Updated {
            verbosity_changed: self.apply_verbosity(&published),
        }
    }

    /// Align the logging verbosity with the configuration's level.
    fn apply_verbosity(&self, config: &GreetingConfig) -> bool {
        let Some(desired) = config.verbosity() else {
            tracing::warn!(level = %config.level, "Unknown log level in configuration, keeping current");
            return false;
        };

        let active = self.verbosity.current();
        if active == desired {
            return false;
        }

        // Logged before switching so that lowering the level still reports it
        tracing::info!(message = %config.message, "New configuration retrieved");
        tracing::info!(from = %active, to = %desired, "New log level");

        match self.verbosity.set(desired) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to apply log level");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tracing::level_filters::LevelFilter;

    use super::*;
    use crate::logging::{InMemoryVerbosity, LoggingError};
    use crate::source::SourceError;

    type Scripted = Result<Option<GreetingConfig>, SourceError>;

    /// Source replaying a fixed list of answers, then repeating the last one.
    struct ScriptedSource {
        answers: Mutex<VecDeque<Scripted>>,
        last: Mutex<Option<GreetingConfig>>,
    }

    impl ScriptedSource {
        fn new(answers: Vec<Scripted>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ConfigSource for ScriptedSource {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        async fn fetch(&self) -> Result<Option<GreetingConfig>, SourceError> {
            match self.answers.lock().unwrap().pop_front() {
                Some(Ok(answer)) => {
                    *self.last.lock().unwrap() = answer.clone();
                    Ok(answer)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    /// Verbosity counting how often it was changed.
    struct CountingVerbosity {
        inner: InMemoryVerbosity,
        changes: AtomicUsize,
    }

    impl CountingVerbosity {
        fn new(level: LevelFilter) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryVerbosity::new(level),
                changes: AtomicUsize::new(0),
            })
        }

        fn changes(&self) -> usize {
            self.changes.load(Ordering::SeqCst)
        }
    }

    impl VerbosityControl for CountingVerbosity {
        fn current(&self) -> LevelFilter {
            self.inner.current()
        }

        fn set(&self, level: LevelFilter) -> Result<(), LoggingError> {
            self.changes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(level)
        }
    }

    fn failure() -> SourceError {
        SourceError::Credentials("unreachable".to_string())
    }

    fn poller(answers: Vec<Scripted>, verbosity: Arc<CountingVerbosity>) -> (ConfigPoller, GreetingStore) {
        let store = GreetingStore::new();
        let poller = ConfigPoller::new(
            Box::new(ScriptedSource::new(answers)),
            store.clone(),
            verbosity,
            Duration::from_secs(2),
        );
        (poller, store)
    }

    #[tokio::test]
    async fn test_first_fetch_publishes() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(
            vec![Ok(Some(GreetingConfig::new("Hello, %s!", "info")))],
            verbosity.clone(),
        );

        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: false }
        );
        assert_eq!(store.load().unwrap().message, "Hello, %s!");
        assert_eq!(verbosity.changes(), 0);
    }

    #[tokio::test]
    async fn test_identical_fetch_keeps_published_arc() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let config = GreetingConfig::new("Hello, %s!", "debug");
        let (poller, store) = poller(
            vec![Ok(Some(config.clone())), Ok(Some(config))],
            verbosity.clone(),
        );

        poller.tick().await;
        let first = store.load().unwrap();
        assert_eq!(poller.tick().await, TickOutcome::Unchanged);
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(verbosity.changes(), 1);
    }

    #[tokio::test]
    async fn test_level_only_change_applies_once() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(
            vec![
                Ok(Some(GreetingConfig::new("Hello, %s!", "INFO"))),
                Ok(Some(GreetingConfig::new("Hello, %s!", "DEBUG"))),
                Ok(Some(GreetingConfig::new("Hello, %s!", "DEBUG"))),
            ],
            verbosity.clone(),
        );

        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: false }
        );
        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: true }
        );
        assert_eq!(poller.tick().await, TickOutcome::Unchanged);

        assert_eq!(verbosity.changes(), 1);
        assert_eq!(verbosity.current(), LevelFilter::DEBUG);
        assert_eq!(store.load().unwrap().level, "DEBUG");
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_config() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(
            vec![
                Ok(Some(GreetingConfig::new("Hello, %s!", "info"))),
                Err(failure()),
            ],
            verbosity,
        );

        poller.tick().await;
        assert_eq!(poller.tick().await, TickOutcome::Failed);
        assert_eq!(store.load().unwrap().message, "Hello, %s!");
    }

    #[tokio::test]
    async fn test_failure_before_any_config_leaves_store_empty() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(vec![Err(failure())], verbosity);

        assert_eq!(poller.tick().await, TickOutcome::Failed);
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_missing_config_clears_store() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let config = GreetingConfig::new("Hello, %s!", "info");
        let (poller, store) = poller(
            vec![Ok(Some(config.clone())), Ok(None), Ok(Some(config))],
            verbosity,
        );

        poller.tick().await;
        assert_eq!(poller.tick().await, TickOutcome::Cleared);
        assert!(store.load().is_none());

        // The same document coming back is published again
        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: false }
        );
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn test_unknown_level_keeps_verbosity() {
        let verbosity = CountingVerbosity::new(LevelFilter::WARN);
        let (poller, store) = poller(
            vec![Ok(Some(GreetingConfig::new("Hello, %s!", "chatty")))],
            verbosity.clone(),
        );

        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: false }
        );
        assert_eq!(verbosity.current(), LevelFilter::WARN);
        assert_eq!(store.load().unwrap().level, "chatty");
    }

    #[tokio::test]
    async fn test_message_change_without_level_change() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(
            vec![
                Ok(Some(GreetingConfig::new("Hello, %s!", "info"))),
                Ok(Some(GreetingConfig::new("Bonjour, %s!", "info"))),
            ],
            verbosity.clone(),
        );

        poller.tick().await;
        assert_eq!(
            poller.tick().await,
            TickOutcome::Updated { verbosity_changed: false }
        );
        assert_eq!(store.load().unwrap().render("Ada"), "Bonjour, Ada!");
        assert_eq!(verbosity.changes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval_until_shutdown() {
        let verbosity = CountingVerbosity::new(LevelFilter::INFO);
        let (poller, store) = poller(
            vec![
                Err(failure()),
                Err(failure()),
                Ok(Some(GreetingConfig::new("Hello, %s!", "info"))),
            ],
            verbosity,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poller.run(shutdown_rx));

        // Ticks at 0s and 2s fail, the one at 4s publishes
        time::sleep(Duration::from_millis(3000)).await;
        assert!(store.load().is_none());
        time::sleep(Duration::from_millis(1500)).await;
        assert!(store.load().is_some());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    /// Source whose fetch outlasts the poll interval.
    struct SlowSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ConfigSource for Arc<SlowSource> {
        fn describe(&self) -> String {
            "slow".to_string()
        }

        async fn fetch(&self) -> Result<Option<GreetingConfig>, SourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            time::sleep(Duration::from_secs(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(GreetingConfig::new("Hello, %s!", "info")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        let source = Arc::new(SlowSource {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        });
        let poller = ConfigPoller::new(
            Box::new(Arc::clone(&source)),
            GreetingStore::new(),
            CountingVerbosity::new(LevelFilter::INFO),
            Duration::from_secs(2),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poller.run(shutdown_rx));

        time::sleep(Duration::from_secs(21)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        // A 2s interval would have fired 11 times; 5s fetches allow far fewer
        let fetches = source.fetches.load(Ordering::SeqCst);
        assert!((3..=5).contains(&fetches), "fetches = {}", fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_inflight_fetch() {
        let source = Arc::new(SlowSource {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        });
        let store = GreetingStore::new();
        let poller = ConfigPoller::new(
            Box::new(Arc::clone(&source)),
            store.clone(),
            CountingVerbosity::new(LevelFilter::INFO),
            Duration::from_secs(2),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poller.run(shutdown_rx));

        time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(store.load().is_none());
    }
}
