//! A tracing layer and named loggers that ship logs to Grafana Loki.
//!
//! A [`LoggerRegistry`] owns the push client, the queue and its worker. Events
//! reach the queue either through the registry's [`layer`](LoggerRegistry::layer)
//! or through a [`Logger`] obtained from it. Each entry is labelled with its level
//! and call site, so every `(level, function, file)` combination becomes its own
//! Loki stream.
//!
//! ```no_run
//! # async fn run() -> Result<(), tracing_loki_push::RegistryError> {
//! use tracing_loki_push::LoggerRegistry;
//! use tracing_subscriber::prelude::*;
//!
//! let (registry, reporting) = LoggerRegistry::builder()
//!     .base_url("http://localhost:3100")
//!     .label("job", "billing")
//!     .build(tokio::time::sleep)?;
//! tokio::spawn(reporting.start());
//!
//! tracing_subscriber::registry().with(registry.layer()).init();
//! registry.logger("billing").info("started");
//!
//! registry.teardown(tokio::time::sleep).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tokio`: [`LoggerRegistryBuilder::spawn`] and [`LoggerRegistry::shutdown`].
//! - `reqwest-default-tls` (default): use the default TLS provider of `reqwest`.
//! - `reqwest-rustls`: use `rustls` as the TLS provider.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Call-site resolution for tracing events.
pub mod callsite;
/// Formatters writing the log line of an [`Event`](tracing::Event).
pub mod event;
/// Options of the log line format.
pub mod format;
/// Tracing layer that ships events to Loki.
pub mod layer;
mod logger;
mod registry;
/// Time utilities for recording timestamps.
pub mod time;

pub use layer::layer;
pub use logger::{Logger, Severity};
pub use loki_push::{LokiClient, reporter, sink};
pub use registry::{LoggerRegistry, LoggerRegistryBuilder, RegistryError};

#[cfg(test)]
#[cfg_attr(test, ctor::ctor)]
fn init() {
    // Initialize the tracing subscriber for tests
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .init();
}
