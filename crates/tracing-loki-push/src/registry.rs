//! Explicit owner of the pipeline: one client, one queue, one worker and the
//! loggers and layers feeding them.
use crate::{layer::Layer, logger::Logger};
use compact_str::CompactString;
use loki_push::{
    LokiClient, LokiClientBuilder, LokiClientBuilderError,
    reporter::{Overflow, PollTimer, Reporter, Reporting},
    sink::ErrorSink,
};
use std::{collections::HashMap, sync::Arc, sync::Mutex, time::Duration};
use tracing::Level;
use tracing_subscriber::fmt::{MakeWriter, writer::BoxMakeWriter};

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for [`LoggerRegistryBuilder`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The push client could not be built.
    #[error(transparent)]
    Client(#[from] LokiClientBuilderError),
    /// A static label is not a valid Loki label.
    #[error("invalid label {key:?}={value:?}")]
    InvalidLabel {
        /// Label name.
        key: String,
        /// Label value.
        value: String,
    },
    /// The queue already has a worker.
    #[error("reporter is already reporting")]
    AlreadyReporting,
}

/// Holds the reporter every [`Logger`] and [`Layer`] of the process writes to.
///
/// Create it once at startup with [`LoggerRegistry::builder`], hand loggers and
/// layers out of it and call [`teardown`](LoggerRegistry::teardown) before exit so
/// queued entries are pushed.
pub struct LoggerRegistry {
    reporter: Reporter,
    max_level: Level,
    grace_period: Duration,
    console: Option<Arc<BoxMakeWriter>>,
    loggers: Mutex<HashMap<CompactString, Logger>>,
    #[cfg(feature = "tokio")]
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Builder for [`LoggerRegistry`].
pub struct LoggerRegistryBuilder<'a> {
    client: LokiClientBuilder<'a>,
    labels: Vec<(&'a str, &'a str)>,
    batch_size: usize,
    flush_interval: Duration,
    poll_timeout: Duration,
    grace_period: Option<Duration>,
    max_level: Level,
    queue: Option<(usize, Overflow)>,
    sink: Option<Arc<dyn ErrorSink>>,
    console: bool,
    console_writer: Option<BoxMakeWriter>,
}

impl LoggerRegistry {
    /// Create a new registry builder.
    pub fn builder<'a>() -> LoggerRegistryBuilder<'a> {
        LoggerRegistryBuilder::default()
    }

    /// A tracing layer feeding this registry's queue.
    pub fn layer<S>(&self) -> Layer<S> {
        Layer::new(self.reporter.clone()).with_max_level(self.max_level)
    }

    /// The logger called `name`, created on first use.
    pub fn logger(&self, name: &str) -> Logger {
        let mut loggers = self.loggers.lock().unwrap();
        loggers
            .entry(CompactString::from(name))
            .or_insert_with(|| {
                Logger::new(
                    name.into(),
                    self.reporter.clone(),
                    self.max_level,
                    self.console.clone(),
                )
            })
            .clone()
    }

    /// The queue shared by every logger and layer.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// How long [`teardown`](LoggerRegistry::teardown) waits for the worker.
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Stop accepting entries, push what is queued and wait for the worker.
    ///
    /// Returns `false` if the worker did not finish within the grace period.
    pub async fn teardown(&self, timer: impl PollTimer) -> bool {
        let finished = self.reporter.shutdown(self.grace_period, timer).await;
        if !finished {
            tracing::warn!(
                grace_period = ?self.grace_period,
                queued = self.reporter.queued(),
                "worker did not finish in time"
            );
        }
        finished
    }

    /// [`teardown`](LoggerRegistry::teardown) on the tokio timer, then join the
    /// spawned worker, or abort it if it missed the grace period.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub async fn shutdown(self) -> bool {
        let finished = self.teardown(tokio::time::sleep).await;
        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            if finished {
                worker.await.ok();
            } else {
                worker.abort();
            }
        }
        finished
    }
}

impl<'a> LoggerRegistryBuilder<'a> {
    /// Loki base url, e.g. `http://localhost:3100`. Required.
    pub fn base_url(self, base_url: &'a str) -> Self {
        Self {
            client: self.client.base_url(base_url),
            ..self
        }
    }

    /// Basic auth username.
    pub fn username(self, username: &'a str) -> Self {
        Self {
            client: self.client.username(username),
            ..self
        }
    }

    /// Basic auth password.
    pub fn password(self, password: &'a str) -> Self {
        Self {
            client: self.client.password(password),
            ..self
        }
    }

    /// Tenant sent as `X-Scope-OrgID`. Default is `tenant1`.
    pub fn tenant(self, tenant: &'a str) -> Self {
        Self {
            client: self.client.tenant(tenant),
            ..self
        }
    }

    /// Request timeout. Default is 10 seconds.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            client: self.client.timeout(timeout),
            ..self
        }
    }

    /// Add a static label to every stream, e.g. `("job", "billing")`.
    ///
    /// Default is `job=rust-app`.
    pub fn label(mut self, key: &'a str, value: &'a str) -> Self {
        self.labels.push((key, value));
        self
    }

    /// Push once this many entries are batched. Default is `10`.
    pub fn batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Push a non-empty batch this long after the previous push. Default is 5
    /// seconds.
    pub fn flush_interval(self, flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            ..self
        }
    }

    /// How long the worker waits for an entry before re-checking the flush
    /// interval. Default is 1 second.
    pub fn poll_timeout(self, poll_timeout: Duration) -> Self {
        Self {
            poll_timeout,
            ..self
        }
    }

    /// How long teardown waits for the worker. Default is the flush interval plus
    /// the poll timeout.
    pub fn grace_period(self, grace_period: Duration) -> Self {
        Self {
            grace_period: Some(grace_period),
            ..self
        }
    }

    /// Least severe level shipped by loggers and layers. Default is
    /// [`Level::INFO`].
    pub fn max_level(self, max_level: Level) -> Self {
        Self { max_level, ..self }
    }

    /// Bound the queue to `capacity` entries. Unbounded by default.
    pub fn bounded(self, capacity: usize, overflow: Overflow) -> Self {
        Self {
            queue: Some((capacity, overflow)),
            ..self
        }
    }

    /// Whether loggers also print each record, prefixed with `[function:line]`.
    ///
    /// Default is `true`, printing to stdout. Only [`Logger`] records are echoed:
    /// tracing events already reach the subscriber's own layers.
    pub fn console(self, console: bool) -> Self {
        Self { console, ..self }
    }

    /// Print logger records to `make_writer` instead of stdout. Turns
    /// [`console`](LoggerRegistryBuilder::console) on.
    pub fn console_writer<M>(self, make_writer: M) -> Self
    where
        M: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self {
            console: true,
            console_writer: Some(BoxMakeWriter::new(make_writer)),
            ..self
        }
    }

    /// Where dropped entries and failed pushes are reported. Default is stderr.
    pub fn error_sink(self, sink: impl ErrorSink) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
            ..self
        }
    }

    /// Build the registry and its worker.
    ///
    /// The worker does nothing until [`Reporting::start`] is polled; spawn it on
    /// the runtime of your choice.
    pub fn build(
        self,
        timer: impl PollTimer,
    ) -> Result<(LoggerRegistry, Reporting<LokiClient>), RegistryError> {
        if let Some((key, value)) = self
            .labels
            .iter()
            .find(|(key, value)| !is_label_name(key) || value.is_empty())
        {
            return Err(RegistryError::InvalidLabel {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        let client = self.client.build()?;
        let console = self.console.then(|| {
            Arc::new(
                self.console_writer
                    .unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)),
            )
        });

        let reporter = match self.queue {
            Some((capacity, overflow)) => Reporter::bounded(capacity, overflow),
            None => Reporter::new(),
        };
        let reporter = match self.sink {
            Some(sink) => reporter.with_shared_error_sink(sink),
            None => reporter,
        };

        let mut reporting = reporter
            .reporting(client, timer)
            .ok_or(RegistryError::AlreadyReporting)?
            .with_batch_size(self.batch_size)
            .with_flush_interval(self.flush_interval)
            .with_poll_timeout(self.poll_timeout);
        for (key, value) in self.labels {
            reporting = reporting.with_label(key, value);
        }

        let registry = LoggerRegistry {
            reporter,
            max_level: self.max_level,
            grace_period: self
                .grace_period
                .unwrap_or(self.flush_interval.saturating_add(self.poll_timeout)),
            console,
            loggers: Mutex::new(HashMap::new()),
            #[cfg(feature = "tokio")]
            worker: Mutex::new(None),
        };
        Ok((registry, reporting))
    }

    /// Build the registry and spawn its worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn spawn(self) -> Result<LoggerRegistry, RegistryError> {
        let (registry, reporting) = self.build(tokio::time::sleep)?;
        let worker = tokio::spawn(reporting.start());
        *registry.worker.lock().unwrap() = Some(worker);
        Ok(registry)
    }
}

impl Default for LoggerRegistryBuilder<'_> {
    fn default() -> Self {
        Self {
            client: LokiClient::builder(),
            labels: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            grace_period: None,
            max_level: Level::INFO,
            queue: None,
            sink: None,
            console: true,
            console_writer: None,
        }
    }
}

// Loki label names match [a-zA-Z_][a-zA-Z0-9_]*
fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
