//! HTTP server module.
//!
//! The server includes:
//! - Static asset serving for the front-end
//! - Graceful shutdown on SIGTERM/SIGINT, shared with the config poller

mod server;
mod shutdown;
pub mod static_files;

pub use server::{start_server, ServerError};
