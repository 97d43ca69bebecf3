//! A reporter for batching and pushing log entries to Loki.
//!
//! [`Reporter`] is the producer side: a cheap, cloneable handle whose
//! [`report`](Reporter::report) never blocks. [`Reporting`] is the single consumer:
//! a future that drains the queue into a batch and pushes it once the batch is full
//! or the flush interval has elapsed.
use crate::{
    LabelSet, LogEntry, LokiClient, LokiClientError, Payload, group_batch,
    sink::{ErrorSink, ReportError, Stderr},
};
use async_channel::{Receiver, Sender, TrySendError};
use compact_str::CompactString;
use futures_util::{FutureExt, join, select};
use std::{
    future::pending,
    pin::Pin,
    sync::{Arc, Mutex, atomic, atomic::AtomicBool},
    time::{Duration, Instant},
};

type Producer = Sender<LogEntry>;
type Consumer = Receiver<LogEntry>;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const BATCH_DEFAULT_CAPACITY: usize = 1024;

/// Value of the `job` label unless overridden.
pub const DEFAULT_JOB: &str = "rust-app";

/// Trait for creating the poll timeout future.
///
/// Implemented for any `Fn(Duration) -> impl Future`, e.g. `tokio::time::sleep`.
pub trait PollTimer: Send + Sync + 'static {
    /// Create a future resolving after `duration`.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Where the worker sends its payloads.
pub trait Deliver: Send + Sync + 'static {
    /// Deliver one payload. Called once per payload, never retried.
    fn deliver(
        &self,
        payload: &Payload,
    ) -> impl Future<Output = Result<(), LokiClientError>> + Send;
}

/// What to drop when a bounded queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Drop the incoming entry.
    DropNewest,
    /// Evict the oldest queued entry to make room.
    DropOldest,
}

/// A reporter queueing log entries for the [`Reporting`] worker.
#[derive(Clone)]
pub struct Reporter {
    state: Arc<State>,
    producer: Producer,
    consumer: Arc<Mutex<Option<Consumer>>>,
    overflow: Overflow,
    sink: Arc<dyn ErrorSink>,
}

/// Reporting is a handle to the worker, allowing configuration and starting it.
pub struct Reporting<D = LokiClient> {
    state: Arc<State>,
    consumer: Consumer,
    deliver: D,
    sink: Arc<dyn ErrorSink>,

    base_labels: LabelSet,
    batch_size: usize,
    flush_interval: Duration,
    poll_timeout: Duration,
    batch_capacity: usize,

    timer: Box<dyn PollTimer>,
    shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
}

struct BatchFlusher<D> {
    deliver: D,
    sink: Arc<dyn ErrorSink>,
    base_labels: LabelSet,
    batch: Vec<LogEntry>,
    batch_size: usize,
    batch_capacity: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

struct State {
    is_reporting: AtomicBool,
    is_closing: AtomicBool,
    close_tx: Sender<()>,
    close_rx: Receiver<()>,
    // dropped by the worker once it has drained
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

impl Reporter {
    /// Create a reporter with an unbounded queue.
    pub fn new() -> Self {
        Self::from_channel(async_channel::unbounded(), Overflow::DropNewest)
    }

    /// Create a reporter whose queue holds at most `capacity` entries.
    ///
    /// [`report`](Reporter::report) still never blocks: once full, entries are
    /// dropped according to `overflow` and each drop is sent to the error sink.
    pub fn bounded(capacity: usize, overflow: Overflow) -> Self {
        Self::from_channel(async_channel::bounded(capacity.max(1)), overflow)
    }

    fn from_channel((producer, consumer): (Producer, Consumer), overflow: Overflow) -> Self {
        Self {
            state: Arc::new(State::default()),
            producer,
            consumer: Arc::new(Mutex::new(Some(consumer))),
            overflow,
            sink: Arc::new(Stderr),
        }
    }

    /// Set the sink receiving queue and delivery failures.
    ///
    /// Default is [`Stderr`].
    pub fn with_error_sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Like [`with_error_sink`](Reporter::with_error_sink), for a sink that is
    /// already shared.
    pub fn with_shared_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Create the worker pushing to `deliver`, polling with `timer`.
    ///
    /// If the reporter is already in reporting state, it returns `None`.
    pub fn reporting<D: Deliver>(
        &self,
        deliver: D,
        timer: impl PollTimer,
    ) -> Option<Reporting<D>> {
        if self.state.set_reporting() {
            return None;
        }

        let consumer = self.consumer.lock().unwrap().take()?;

        Some(Reporting {
            state: self.state.clone(),
            consumer,
            deliver,
            sink: self.sink.clone(),

            base_labels: LabelSet::new().with("job", DEFAULT_JOB),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            batch_capacity: BATCH_DEFAULT_CAPACITY,

            timer: Box::new(timer),
            shutdown_signal: Box::pin(pending()),
        })
    }

    /// Queue an entry. Never blocks and never fails; drops go to the error sink.
    ///
    /// Entries reported after the worker has shut down are ignored.
    pub fn report(&self, entry: LogEntry) {
        if self.state.is_closing() {
            return;
        }

        let dropped = match self.overflow {
            Overflow::DropNewest => match self.producer.try_send(entry) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => Some(ReportError::QueueFull),
                Err(TrySendError::Closed(_)) => Some(ReportError::Closed),
            },
            Overflow::DropOldest => match self.producer.force_send(entry) {
                Ok(None) => None,
                Ok(Some(_)) => Some(ReportError::Evicted),
                Err(_) => Some(ReportError::Closed),
            },
        };
        if let Some(error) = dropped {
            self.sink.report(&error);
        }
    }

    /// Number of entries waiting in the queue.
    pub fn queued(&self) -> usize {
        self.producer.len()
    }

    /// Ask the worker to drain the queue, push what is left and stop.
    pub fn close(&self) {
        self.state.close_tx.try_send(()).ok();
    }

    /// Whether the worker has finished.
    pub fn is_closed(&self) -> bool {
        self.state.is_closing()
    }

    /// Wait until the worker has finished.
    ///
    /// Never resolves if no worker was ever started.
    pub async fn closed(&self) {
        self.state.done_rx.recv().await.ok();
    }

    /// [`close`](Reporter::close) and wait up to `grace` for the worker to finish.
    ///
    /// Returns `false` if the grace period ran out first. An in-flight push is not
    /// cancelled.
    pub async fn shutdown(&self, grace: Duration, timer: impl PollTimer) -> bool {
        self.close();
        select! {
            _ = self.closed().fuse() => true,
            _ = timer.sleep(grace).fuse() => false,
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Deliver> Reporting<D> {
    /// Quit when shutdown_signal received.
    ///
    /// Accept a `shutdown_signal` argument as a graceful shutdown signal.
    pub fn with_graceful_shutdown(
        mut self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Self {
        self.shutdown_signal = Box::pin(shutdown_signal);
        self
    }

    /// Push once this many entries are batched.
    ///
    /// Default is `10`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Push a non-empty batch once this much time passed since the last push.
    ///
    /// Default is 5 seconds.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// How long the worker waits for an entry before re-checking the flush interval.
    ///
    /// Default is 1 second. Keep it well below the flush interval: a lone entry may
    /// wait up to `flush_interval + poll_timeout` before it is pushed.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Replace the labels merged into every stream.
    ///
    /// Default is `job=rust-app`.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.base_labels = labels;
        self
    }

    /// Add one label merged into every stream. Empty keys or values are ignored.
    pub fn with_label(
        mut self,
        key: impl Into<CompactString>,
        value: impl Into<CompactString>,
    ) -> Self {
        self.base_labels.insert(key, value);
        self
    }

    /// Set the initial batch vector capacity.
    ///
    /// Default is `1024`.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// The configured flush interval.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// The configured poll timeout.
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Start the reporting process.
    ///
    /// Runs until [`Reporter::close`] is called, the shutdown signal fires or every
    /// [`Reporter`] is dropped; the queue is drained and pushed before returning.
    pub async fn start(self) {
        let Reporting {
            state,
            consumer,
            deliver,
            sink,
            base_labels,
            batch_size,
            flush_interval,
            poll_timeout,
            batch_capacity,
            timer,
            shutdown_signal,
        } = self;

        let done = state.done_tx.lock().unwrap().take();
        let close_tx = state.close_tx.clone();
        let close_rx = state.close_rx.clone();
        let done_rx = state.done_rx.clone();

        let mut flusher = BatchFlusher {
            deliver,
            sink,
            base_labels,
            batch: Vec::with_capacity(batch_capacity),
            batch_size,
            batch_capacity,
            flush_interval,
            last_flush: Instant::now(),
        };

        let work_fut = async move {
            loop {
                let polled = select! {
                    entry = consumer.recv().fuse() => match entry {
                        Ok(entry) => Some(entry),
                        Err(_) => break,
                    },
                    _ = timer.sleep(poll_timeout).fuse() => None,
                    _ = close_rx.recv().fuse() => break,
                };
                flusher.batch.extend(polled);
                flusher.tick().await;
            }
            // late reports fail with Closed from here on, queued entries stay readable
            consumer.close();
            flusher.drain(&consumer).await;
            state.is_closing.store(true, atomic::Ordering::Relaxed);
            drop(done);
        };

        let shutdown_fut = async move {
            select! {
                _ = shutdown_signal.fuse() => {
                    close_tx.try_send(()).ok();
                },
                _ = done_rx.recv().fuse() => {},
            }
        };

        join!(work_fut, shutdown_fut);
    }
}

impl<D: Deliver> BatchFlusher<D> {
    fn is_ready(&self, now: Instant) -> bool {
        self.batch.len() >= self.batch_size
            || (!self.batch.is_empty()
                && now.duration_since(self.last_flush) >= self.flush_interval)
    }

    async fn tick(&mut self) {
        let now = Instant::now();
        if self.is_ready(now) {
            self.flush().await;
            self.last_flush = now;
        }
    }

    async fn flush(&mut self) {
        let payload = group_batch(&self.batch, &self.base_labels);
        let entries = self.batch.len();
        tracing::debug!(entries, streams = payload.streams().len(), "flushing batch");

        let result = self.deliver.deliver(&payload).await;
        // cleared whatever the outcome: a failed batch is not retried
        self.batch.clear();
        self.batch.shrink_to(self.batch_capacity);

        if let Err(source) = result {
            self.sink.report(&ReportError::Push { entries, source });
        }
    }

    async fn drain(&mut self, consumer: &Consumer) {
        while let Ok(entry) = consumer.try_recv() {
            self.batch.push(entry);
            if self.batch.len() >= self.batch_size {
                self.flush().await;
            }
        }
        if !self.batch.is_empty() {
            self.flush().await;
        }
        self.last_flush = Instant::now();
    }
}

impl Deliver for LokiClient {
    fn deliver(
        &self,
        payload: &Payload,
    ) -> impl Future<Output = Result<(), LokiClientError>> + Send {
        self.try_push(payload)
    }
}

impl Default for State {
    fn default() -> Self {
        let (close_tx, close_rx) = async_channel::bounded(1);
        let (done_tx, done_rx) = async_channel::bounded(1);
        Self {
            is_reporting: AtomicBool::new(false),
            is_closing: AtomicBool::new(false),
            close_tx,
            close_rx,
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
        }
    }
}

impl State {
    fn set_reporting(&self) -> bool {
        self.is_reporting.swap(true, atomic::Ordering::Relaxed)
    }

    fn is_closing(&self) -> bool {
        self.is_closing.load(atomic::Ordering::Relaxed)
    }
}

impl<F, Fut> PollTimer for F
where
    F: Fn(Duration) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallSite;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Clone, Default)]
    struct Recorder {
        payloads: Arc<Mutex<Vec<Payload>>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Recorder {
                fail: true,
                ..Default::default()
            }
        }

        fn payloads(&self) -> Vec<Payload> {
            self.payloads.lock().unwrap().clone()
        }

        async fn wait_for(&self, count: usize, limit: Duration) -> bool {
            let deadline = Instant::now() + limit;
            while Instant::now() < deadline {
                if self.payloads().len() >= count {
                    return true;
                }
                sleep(Duration::from_millis(10)).await;
            }
            self.payloads().len() >= count
        }
    }

    impl Deliver for Recorder {
        fn deliver(
            &self,
            payload: &Payload,
        ) -> impl Future<Output = Result<(), LokiClientError>> + Send {
            self.payloads.lock().unwrap().push(payload.clone());
            let fail = self.fail;
            async move {
                if fail {
                    Err(LokiClientError::Http {
                        status: 500,
                        message: "internal".into(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::now("INFO", message).with_call_site(CallSite::new("handler", "main.rs", 1))
    }

    fn messages(payload: &Payload) -> Vec<String> {
        payload
            .streams()
            .iter()
            .flat_map(|s| s.values().iter().map(|(_, m)| m.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn flushes_when_batch_is_full() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_batch_size(3)
            .with_flush_interval(Duration::from_secs(60))
            .with_poll_timeout(Duration::from_millis(50));
        let worker = tokio::spawn(reporting.start());

        for i in 0..3 {
            reporter.report(entry(&format!("m{i}")));
        }

        assert!(recorder.wait_for(1, Duration::from_secs(2)).await);
        let payloads = recorder.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].streams().len(), 1);
        assert_eq!(payloads[0].streams()[0].values().len(), 3);

        reporter.close();
        worker.await.unwrap();
        assert_eq!(recorder.payloads().len(), 1);
    }

    #[tokio::test]
    async fn flushes_after_interval() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_batch_size(10)
            .with_flush_interval(Duration::from_millis(300))
            .with_poll_timeout(Duration::from_millis(20));
        let worker = tokio::spawn(reporting.start());

        reporter.report(entry("lonely"));
        sleep(Duration::from_millis(100)).await;
        assert!(recorder.payloads().is_empty());

        sleep(Duration::from_millis(500)).await;
        let payloads = recorder.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].entries(), 1);

        reporter.close();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn idle_worker_sends_nothing() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_flush_interval(Duration::from_millis(50))
            .with_poll_timeout(Duration::from_millis(10));
        let worker = tokio::spawn(reporting.start());

        sleep(Duration::from_millis(300)).await;
        reporter.close();
        worker.await.unwrap();
        assert!(recorder.payloads().is_empty());
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_not_retried() {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        let reporter = Reporter::new().with_error_sink(move |e: &ReportError| {
            assert!(matches!(e, ReportError::Push { entries: 1, .. }));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let recorder = Recorder::failing();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_flush_interval(Duration::from_millis(100))
            .with_poll_timeout(Duration::from_millis(10));
        let worker = tokio::spawn(reporting.start());

        reporter.report(entry("doomed"));
        assert!(recorder.wait_for(1, Duration::from_secs(2)).await);
        sleep(Duration::from_millis(400)).await;

        assert_eq!(recorder.payloads().len(), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        reporter.close();
        worker.await.unwrap();
        assert_eq!(recorder.payloads().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_drains_queue() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_batch_size(100)
            .with_flush_interval(Duration::from_secs(60));
        let worker = tokio::spawn(reporting.start());

        for i in 0..5 {
            reporter.report(entry(&format!("m{i}")));
        }
        assert!(reporter.shutdown(Duration::from_secs(2), sleep).await);
        worker.await.unwrap();

        let payloads = recorder.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            messages(&payloads[0]),
            ["m0", "m1", "m2", "m3", "m4"].map(|m| format!("[handler:1] {m}"))
        );

        assert!(reporter.is_closed());
        reporter.report(entry("late"));
        assert_eq!(reporter.queued(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_in_batch_sized_chunks() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_batch_size(2);

        for i in 0..5 {
            reporter.report(entry(&format!("m{i}")));
        }
        reporter.close();
        reporting.start().await;

        let sizes: Vec<_> = recorder.payloads().iter().map(Payload::entries).collect();
        assert_eq!(sizes, [2, 2, 1]);
    }

    struct Echo {
        reporter: Reporter,
        recorder: Recorder,
    }

    impl Deliver for Echo {
        fn deliver(
            &self,
            payload: &Payload,
        ) -> impl Future<Output = Result<(), LokiClientError>> + Send {
            self.reporter.report(entry("while draining"));
            self.recorder.deliver(payload)
        }
    }

    #[tokio::test]
    async fn report_during_drain_reaches_sink() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let reporter = Reporter::new()
            .with_error_sink(move |e: &ReportError| seen.lock().unwrap().push(e.to_string()));
        let recorder = Recorder::default();
        let echo = Echo {
            reporter: reporter.clone(),
            recorder: recorder.clone(),
        };
        let reporting = reporter
            .reporting(echo, sleep)
            .unwrap()
            .with_batch_size(100)
            .with_flush_interval(Duration::from_secs(60));

        reporter.report(entry("queued"));
        reporter.close();
        reporting.start().await;

        assert_eq!(recorder.payloads().len(), 1);
        assert_eq!(recorder.payloads()[0].entries(), 1);
        assert_eq!(*errors.lock().unwrap(), [ReportError::Closed.to_string()]);
    }

    #[test]
    fn reporting_settings() {
        let reporter = Reporter::new();
        let reporting = reporter.reporting(Recorder::default(), sleep).unwrap();
        assert_eq!(reporting.flush_interval(), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(reporting.poll_timeout(), DEFAULT_POLL_TIMEOUT);

        let reporting = reporting
            .with_flush_interval(Duration::from_millis(500))
            .with_poll_timeout(Duration::from_millis(50));
        assert_eq!(reporting.flush_interval(), Duration::from_millis(500));
        assert_eq!(reporting.poll_timeout(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn graceful_shutdown_signal_stops_worker() {
        let (tx, rx) = async_channel::bounded::<()>(1);
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_flush_interval(Duration::from_secs(60))
            .with_graceful_shutdown(async move {
                rx.recv().await.ok();
            });
        let worker = tokio::spawn(reporting.start());

        reporter.report(entry("a"));
        reporter.report(entry("b"));
        tx.send(()).await.unwrap();
        worker.await.unwrap();

        assert_eq!(recorder.payloads().len(), 1);
        assert_eq!(recorder.payloads()[0].entries(), 2);
    }

    #[tokio::test]
    async fn worker_stops_when_reporters_are_dropped() {
        let reporter = Reporter::new();
        let recorder = Recorder::default();
        let reporting = reporter
            .reporting(recorder.clone(), sleep)
            .unwrap()
            .with_flush_interval(Duration::from_secs(60));

        reporter.report(entry("last words"));
        drop(reporter);
        reporting.start().await;

        assert_eq!(recorder.payloads().len(), 1);
    }

    #[tokio::test]
    async fn bounded_queue_drops_newest() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let reporter = Reporter::bounded(2, Overflow::DropNewest)
            .with_error_sink(move |e: &ReportError| seen.lock().unwrap().push(e.to_string()));
        let recorder = Recorder::default();
        let reporting = reporter.reporting(recorder.clone(), sleep).unwrap();

        for i in 0..3 {
            reporter.report(entry(&format!("m{i}")));
        }
        reporter.close();
        reporting.start().await;

        assert_eq!(
            *errors.lock().unwrap(),
            [ReportError::QueueFull.to_string()]
        );
        assert_eq!(
            messages(&recorder.payloads()[0]),
            ["[handler:1] m0", "[handler:1] m1"]
        );
    }

    #[tokio::test]
    async fn bounded_queue_drops_oldest() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let reporter = Reporter::bounded(2, Overflow::DropOldest)
            .with_error_sink(move |e: &ReportError| seen.lock().unwrap().push(e.to_string()));
        let recorder = Recorder::default();
        let reporting = reporter.reporting(recorder.clone(), sleep).unwrap();

        for i in 0..3 {
            reporter.report(entry(&format!("m{i}")));
        }
        reporter.close();
        reporting.start().await;

        assert_eq!(*errors.lock().unwrap(), [ReportError::Evicted.to_string()]);
        assert_eq!(
            messages(&recorder.payloads()[0]),
            ["[handler:1] m1", "[handler:1] m2"]
        );
    }

    #[tokio::test]
    async fn reporting_can_only_start_once() {
        let reporter = Reporter::new();
        assert!(reporter.reporting(Recorder::default(), sleep).is_some());
        assert!(reporter.reporting(Recorder::default(), sleep).is_none());
    }
}
