use std::time::Instant;

/// A type that can measure the current time of a log entry.
///
/// Loki orders entries of a stream by timestamp, so the value is in nanoseconds
/// since the Unix epoch. `RecordTime` is also implemented for any function
/// pointer with the appropriate signature.
pub trait RecordTime {
    /// Measure the current time in nanoseconds since the Unix epoch.
    fn record_time(&self) -> i64;
}

/// Returns a new `SystemTime` timestamp provider.
///
/// This is equivalent to calling
/// ```rust
/// # fn timer() -> tracing_loki_push::time::SystemTime {
/// tracing_loki_push::time::SystemTime::default()
/// # }
/// ```
pub fn time() -> SystemTime {
    SystemTime
}

/// Returns a new `Uptime` timestamp provider.
///
/// With this timer, entries carry the wall-clock time at construction plus the
/// monotonic time elapsed since, so timestamps never go backwards.
pub fn uptime() -> Uptime {
    Uptime::default()
}

impl<F> RecordTime for &F
where
    F: RecordTime,
{
    fn record_time(&self) -> i64 {
        (*self).record_time()
    }
}

impl RecordTime for fn() -> i64 {
    fn record_time(&self) -> i64 {
        (*self)()
    }
}

/// Retrieve the current wall-clock time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct SystemTime;

/// Wall-clock time of an epoch advanced by a monotonic clock.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Uptime {
    epoch: Instant,
    epoch_nanos: i64,
}

impl Default for Uptime {
    fn default() -> Self {
        Uptime {
            epoch: Instant::now(),
            epoch_nanos: SystemTime.record_time(),
        }
    }
}

impl RecordTime for SystemTime {
    fn record_time(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|duration| duration.as_nanos() as i64)
            .unwrap_or_default()
    }
}

impl RecordTime for Uptime {
    fn record_time(&self) -> i64 {
        self.epoch_nanos + self.epoch.elapsed().as_nanos() as i64
    }
}
