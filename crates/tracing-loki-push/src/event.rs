use crate::format::Format;
use compact_str::CompactString;
use std::fmt::{self, Write};
use tracing::{Event, field::Field};

/// Writes the log line for an [`Event`].
pub trait RecordEvent {
    /// Write the log line for `event` to `message`.
    fn record_event<T>(
        &self,
        event: &Event<'_>,
        format: &Format<T>,
        message: &mut CompactString,
    ) -> fmt::Result;
}

/// The default [`RecordEvent`] implementation.
///
/// Writes `<target> - <LEVEL> - <message> key=value ...`, the prefix parts as
/// enabled on the [`Format`].
#[derive(Debug)]
pub struct DefaultEvent {
    // reserve the ability to add fields to this without causing a breaking
    // change in the future.
    _private: (),
}

impl DefaultEvent {
    /// Create a new `DefaultEvent`.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for DefaultEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEvent for DefaultEvent {
    fn record_event<T>(
        &self,
        event: &Event<'_>,
        format: &Format<T>,
        message: &mut CompactString,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if format.display_target {
            write!(message, "{} - ", metadata.target())?;
        }
        if format.display_level {
            write!(message, "{} - ", metadata.level())?;
        }

        let current_thread = std::thread::current();
        if format.display_thread_name {
            if let Some(name) = current_thread.name() {
                write!(message, "{name} ")?;
            } else if !format.display_thread_id {
                write!(message, "{:0>2?} ", current_thread.id())?;
            }
        }
        if format.display_thread_id {
            write!(message, "{:0>2?} ", current_thread.id())?;
        }

        let mut body = CompactString::const_new("");
        let mut fields = CompactString::const_new("");
        let mut result = Ok(());
        event.record(&mut |field: &Field, value: &dyn fmt::Debug| {
            result = result.and_then(|()| {
                if field.name() == "message" {
                    write!(body, "{value:?}")
                } else {
                    write!(fields, " {}={value:?}", field.name())
                }
            });
        });
        result?;

        message.push_str(&body);
        message.push_str(if body.is_empty() {
            fields.trim_start()
        } else {
            fields.as_str()
        });
        Ok(())
    }
}
