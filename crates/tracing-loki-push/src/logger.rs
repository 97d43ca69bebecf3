use crate::callsite;
use compact_str::{CompactString, format_compact};
use loki_push::{LogEntry, compose_message, reporter::Reporter};
use std::{fmt, io::Write, panic::Location, sync::Arc};
use tracing::Level;
use tracing_subscriber::fmt::{MakeWriter, writer::BoxMakeWriter};

/// Severity of a [`Logger`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Detailed diagnostics.
    Debug,
    /// Normal operation.
    Info,
    /// Something unexpected that does not stop the program.
    Warning,
    /// An operation failed.
    Error,
    /// The program may not be able to continue.
    Critical,
}

/// A named logger shipping records straight to the queue, without going through a
/// tracing subscriber.
///
/// Obtained from [`LoggerRegistry::logger`](crate::LoggerRegistry::logger); cheap
/// to clone. Every method captures the caller's file and line. Unless the registry
/// was built with `console(false)`, each record is also echoed as a
/// `[function:line] <name> - <SEVERITY> - <message>` line.
#[derive(Clone)]
pub struct Logger {
    name: CompactString,
    reporter: Reporter,
    max_level: Level,
    console: Option<Arc<BoxMakeWriter>>,
}

impl Severity {
    /// Name used in messages and, lowercased, in the `level` label.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// The closest tracing level, used for filtering.
    pub fn as_level(self) -> Level {
        match self {
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warning => Level::WARN,
            Severity::Error | Severity::Critical => Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Logger {
    pub(crate) fn new(
        name: CompactString,
        reporter: Reporter,
        max_level: Level,
        console: Option<Arc<BoxMakeWriter>>,
    ) -> Self {
        Self {
            name,
            reporter,
            max_level,
            console,
        }
    }

    /// The logger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether records of `severity` are shipped.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity.as_level() <= self.max_level
    }

    /// Queue a record. Never blocks and never fails.
    ///
    /// The message reads `<name> - <SEVERITY> - <message>`.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        if !self.enabled(severity) {
            return;
        }
        let call_site = callsite::from_location(Location::caller());
        let message = format_compact!("{} - {severity} - {message}", self.name);
        let entry = LogEntry::now(severity.as_str(), message)
            .with_logger(self.name.clone())
            .with_call_site(call_site);
        if let Some(console) = &self.console {
            writeln!(console.make_writer(), "{}", compose_message(&entry)).ok();
        }
        self.reporter.report(entry);
    }

    /// Log at [`Severity::Debug`].
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message)
    }

    /// Log at [`Severity::Info`].
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message)
    }

    /// Log at [`Severity::Warning`].
    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Severity::Warning, message)
    }

    /// Log at [`Severity::Error`].
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message)
    }

    /// Log at [`Severity::Critical`].
    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Severity::Critical, message)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("max_level", &self.max_level)
            .field("console", &self.console.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, sync::Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn severity_filter() {
        let reporter = Reporter::new();
        let logger = Logger::new("app".into(), reporter.clone(), Level::INFO, None);
        logger.debug("hidden");
        logger.info("shown");
        logger.warning("shown");
        logger.critical("shown");
        assert_eq!(reporter.queued(), 3);
        assert!(!logger.enabled(Severity::Debug));
        assert!(logger.enabled(Severity::Critical));
    }

    #[test]
    fn console_echoes_prefixed_line() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let console = BoxMakeWriter::new(move || writer.clone());
        let reporter = Reporter::new();
        let logger = Logger::new(
            "app".into(),
            reporter.clone(),
            Level::INFO,
            Some(Arc::new(console)),
        );

        let line = line!() + 1;
        logger.warning("disk almost full");
        logger.debug("filtered");

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            output,
            format!("[logger_module:{line}] app - WARNING - disk almost full\n")
        );
        assert_eq!(reporter.queued(), 1);
    }

    #[test]
    fn critical_maps_to_error() {
        assert_eq!(Severity::Critical.as_level(), Level::ERROR);
        assert_eq!(Severity::Warning.as_str(), "WARNING");
        assert!(Severity::Critical > Severity::Error);
    }
}
