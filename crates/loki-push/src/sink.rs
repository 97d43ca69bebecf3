//! Side channel for failures that must never reach the log-emitting caller.
use crate::LokiClientError;

/// A failure observed by the pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReportError {
    /// A batch could not be delivered and was dropped.
    #[error("dropped batch of {entries} entries: {source}")]
    Push {
        /// Number of entries in the dropped batch.
        entries: usize,
        /// Why the push failed.
        #[source]
        source: LokiClientError,
    },
    /// The queue was full and the incoming entry was dropped.
    #[error("ingest queue full, dropped newest entry")]
    QueueFull,
    /// The queue was full and the oldest queued entry was evicted.
    #[error("ingest queue full, evicted oldest entry")]
    Evicted,
    /// The worker is gone and the entry was dropped.
    #[error("ingest queue closed, dropped entry")]
    Closed,
}

/// Receives every [`ReportError`].
///
/// Implementations are called from logging call sites and from the worker, so they
/// must be cheap and must not log through the pipeline they observe.
pub trait ErrorSink: Send + Sync + 'static {
    /// Handle one failure.
    fn report(&self, error: &ReportError);
}

/// Writes failures to stderr. This is the default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stderr;

/// Emits failures as `tracing` error events.
///
/// Only useful when the subscriber does not feed those events back into the
/// pipeline; the layer in `tracing-loki-push` skips them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracing;

impl ErrorSink for Stderr {
    fn report(&self, error: &ReportError) {
        eprintln!("[loki-push] {error}");
    }
}

impl ErrorSink for Tracing {
    fn report(&self, error: &ReportError) {
        tracing::error!(err = %error, "loki push pipeline failure");
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&ReportError) + Send + Sync + 'static,
{
    fn report(&self, error: &ReportError) {
        self(error)
    }
}
