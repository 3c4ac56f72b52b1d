//! configmap-greeter - greeting service configured from a Kubernetes ConfigMap
//!
//! Serves `GET /api/greeting?name=...` by rendering a message template that
//! a background poller refreshes from a ConfigMap every couple of seconds.
//! The same ConfigMap also drives the service's log verbosity.

pub mod config;
pub mod error;
pub mod greeting;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod poller;
pub mod routes;
pub mod source;
pub mod state;

pub use error::AppError;
pub use greeting::GreetingConfig;
pub use poller::{ConfigPoller, TickOutcome};
pub use state::{AppState, GreetingStore};
