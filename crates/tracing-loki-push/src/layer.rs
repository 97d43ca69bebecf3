use crate::{
    callsite::{CallSiteResolver, DefaultResolver},
    event::{DefaultEvent, RecordEvent},
    format::Format,
    time::{RecordTime, SystemTime},
};
use compact_str::CompactString;
use loki_push::{LogEntry, reporter::Reporter};
use std::marker::PhantomData;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::{
    layer::{self, Context},
    registry::LookupSpan,
};

/// Targets never shipped: the pipeline's own diagnostics and the HTTP stack it
/// pushes with. Shipping them would feed every push back into the queue.
const IGNORED_TARGETS: [&str; 6] = [
    "loki_push",
    "tracing_loki_push",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
];

/// A [`Layer`] that ships events to Loki through a [`Reporter`].
///
/// [`Layer`]: tracing_subscriber::layer::Layer
pub struct Layer<S, FT = SystemTime, R = DefaultResolver, E = DefaultEvent> {
    reporter: Reporter,
    format: Format<FT>,
    resolver: R,
    record_event: E,
    max_level: Level,
    _inner: PhantomData<fn(S)>,
}

impl<S> Layer<S> {
    /// Returns a new [`Layer`] with the default configuration.
    pub fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            format: Format::default(),
            resolver: DefaultResolver,
            record_event: DefaultEvent::default(),
            max_level: Level::TRACE,
            _inner: PhantomData,
        }
    }
}

impl<S, FT, R, E> Layer<S, FT, R, E> {
    /// Sets the call-site resolver for the layer.
    pub fn with_resolver<R2>(self, resolver: R2) -> Layer<S, FT, R2, E>
    where
        R2: CallSiteResolver,
    {
        Layer {
            reporter: self.reporter,
            format: self.format,
            resolver,
            record_event: self.record_event,
            max_level: self.max_level,
            _inner: PhantomData,
        }
    }

    /// Sets the event recorder for the layer.
    pub fn record_event<E2>(self, record_event: E2) -> Layer<S, FT, R, E2>
    where
        E2: RecordEvent + 'static,
    {
        Layer {
            reporter: self.reporter,
            format: self.format,
            resolver: self.resolver,
            record_event,
            max_level: self.max_level,
            _inner: PhantomData,
        }
    }

    /// Use the given [`timer`] for entry timestamps.
    ///
    /// See the [`time` module] for the provided timer implementations.
    ///
    /// [`timer`]: crate::time::RecordTime
    /// [`time` module]: mod@crate::time
    pub fn with_timer<FT2>(self, timer: FT2) -> Layer<S, FT2, R, E> {
        Layer {
            reporter: self.reporter,
            format: self.format.with_timer(timer),
            resolver: self.resolver,
            record_event: self.record_event,
            max_level: self.max_level,
            _inner: self._inner,
        }
    }

    /// Ship only events at `max_level` or more severe.
    ///
    /// Default is [`Level::TRACE`], everything the subscriber lets through.
    pub fn with_max_level(self, max_level: Level) -> Self {
        Layer { max_level, ..self }
    }

    /// Sets whether or not an event's target is written before the message.
    pub fn with_target(self, display_target: bool) -> Self {
        Layer {
            format: self.format.with_target(display_target),
            ..self
        }
    }

    /// Sets whether or not an event's level is written before the message.
    pub fn with_level(self, display_level: bool) -> Self {
        Layer {
            format: self.format.with_level(display_level),
            ..self
        }
    }

    /// Sets whether or not the [thread ID] of the current thread is written.
    ///
    /// [thread ID]: std::thread::ThreadId
    pub fn with_thread_ids(self, display_thread_ids: bool) -> Self {
        Layer {
            format: self.format.with_thread_ids(display_thread_ids),
            ..self
        }
    }

    /// Sets whether or not the [name] of the current thread is written.
    ///
    /// [name]: std::thread#naming-threads
    pub fn with_thread_names(self, display_thread_names: bool) -> Self {
        Layer {
            format: self.format.with_thread_names(display_thread_names),
            ..self
        }
    }

    fn is_shipped(&self, metadata: &Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level && !is_ignored(metadata.target())
    }
}

impl<S, FT, R, E> layer::Layer<S> for Layer<S, FT, R, E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    FT: RecordTime + 'static,
    R: CallSiteResolver,
    E: RecordEvent + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.is_shipped(metadata) {
            return;
        }

        let span = ctx.event_span(event);
        let call_site = self
            .resolver
            .resolve(metadata, span.as_ref().map(|span| span.name()));

        let mut message = CompactString::const_new("");
        if self
            .record_event
            .record_event(event, &self.format, &mut message)
            .is_err()
        {
            return;
        }

        let entry = LogEntry::new(
            self.format.timer.record_time(),
            metadata.level().as_str(),
            message,
        )
        .with_logger(metadata.target())
        .with_call_site(call_site);
        self.reporter.report(entry);
    }
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target
            .strip_prefix(ignored)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Returns a new [Loki layer] that can be [composed] with other layers to
/// construct a [`Subscriber`].
///
/// This is a shorthand for the equivalent [`Layer::new`] function.
///
/// [Loki layer]: Layer
/// [composed]: tracing_subscriber::layer
pub fn layer<S>(reporter: Reporter) -> Layer<S> {
    Layer::new(reporter)
}
