//! Client for the [Grafana Loki](https://grafana.com/docs/loki/latest/reference/loki-http-api/#ingest-logs)
//! push API.
//!
//! Log entries are queued by a [`Reporter`](reporter::Reporter) without blocking the
//! caller, grouped into streams (one stream per distinct label set) and pushed in
//! batches by a single [`Reporting`](reporter::Reporting) worker. Delivery is
//! at-most-once: a batch that fails to push is reported to an
//! [`ErrorSink`](sink::ErrorSink) and dropped, never retried.
//!
//! ## Feature Flags
//!
//! - `reporter` (default): the queue and batching worker.
//! - `reqwest-default-tls` (default): use the default TLS provider of [`reqwest`].
//! - `reqwest-rustls`: use [`rustls`] as the TLS provider.
//!
//! [`reqwest`]: https://docs.rs/reqwest
//! [`rustls`]: https://docs.rs/rustls
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
mod group;
mod proto;
#[cfg(feature = "reporter")]
#[cfg_attr(docsrs, doc(cfg(feature = "reporter")))]
pub mod reporter;
pub mod sink;

pub use client::{LokiClient, LokiClientBuilder, LokiClientBuilderError, LokiClientError};
pub use group::{compose_message, group_batch};
pub use proto::{
    CallSite, FILE_KEY, FUNCTION_KEY, LEVEL_KEY, LINE_KEY, LabelSet, LogEntry, Payload, Stream,
    UNKNOWN,
};

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
