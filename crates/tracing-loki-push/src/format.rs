use crate::time::SystemTime;

/// Formatter for the message line of tracing events.
pub struct Format<T = SystemTime> {
    pub(crate) timer: T,
    pub(crate) display_target: bool,
    pub(crate) display_level: bool,
    pub(crate) display_thread_id: bool,
    pub(crate) display_thread_name: bool,
}

impl Default for Format<SystemTime> {
    fn default() -> Self {
        Format {
            timer: SystemTime,
            display_target: true,
            display_level: true,
            display_thread_id: false,
            display_thread_name: false,
        }
    }
}

impl<T> Format<T> {
    /// Use the given [`timer`] for entry timestamps.
    ///
    /// See the [`time` module] for the provided timer implementations.
    ///
    /// [`timer`]: crate::time::RecordTime
    /// [`time` module]: mod@crate::time
    pub fn with_timer<T2>(self, timer: T2) -> Format<T2> {
        Format {
            timer,
            display_target: self.display_target,
            display_level: self.display_level,
            display_thread_id: self.display_thread_id,
            display_thread_name: self.display_thread_name,
        }
    }

    /// Sets whether or not an event's target is written before the message.
    pub fn with_target(self, display_target: bool) -> Format<T> {
        Format {
            display_target,
            ..self
        }
    }

    /// Sets whether or not an event's level is written before the message.
    ///
    /// The level is always sent as the `level` label.
    pub fn with_level(self, display_level: bool) -> Format<T> {
        Format {
            display_level,
            ..self
        }
    }

    /// Sets whether or not the [thread ID] of the current thread is written.
    ///
    /// [thread ID]: std::thread::ThreadId
    pub fn with_thread_ids(self, display_thread_id: bool) -> Format<T> {
        Format {
            display_thread_id,
            ..self
        }
    }

    /// Sets whether or not the [name] of the current thread is written.
    ///
    /// [name]: std::thread#naming-threads
    pub fn with_thread_names(self, display_thread_name: bool) -> Format<T> {
        Format {
            display_thread_name,
            ..self
        }
    }
}
