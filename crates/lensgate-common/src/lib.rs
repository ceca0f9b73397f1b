//! Shared contract for Lensgate: wire types, credential handling, logging, error types.
//!
//! Both the proxy and the capture client depend on this crate so the request and
//! answer shapes are defined exactly once.

#![forbid(unsafe_code)]

pub mod credential;
pub mod error;
pub mod helpers;
pub mod protocol;

pub use credential::ApiKey;
pub use error::{Error, Result};
pub use protocol::*;

/// Initialize tracing with a default filter directive.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
