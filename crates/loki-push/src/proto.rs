use compact_str::{CompactString, ToCompactString};
use litemap::LiteMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{
    borrow::Borrow,
    hash::{Hash, Hasher},
};

type Map = LiteMap<CompactString, CompactString>;

/// Sentinel used for call-site fields that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// Metadata key holding the resolved function name.
pub const FUNCTION_KEY: &str = "function";
/// Metadata key holding the resolved file name.
pub const FILE_KEY: &str = "file";
/// Metadata key holding the resolved line number.
pub const LINE_KEY: &str = "line";
/// Label key holding the lowercased level.
pub const LEVEL_KEY: &str = "level";

/// A single log record, ready to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// nanoseconds since UNIX epoch
    timestamp: i64,
    message: CompactString,
    level: CompactString,
    logger: CompactString,
    /// call-site metadata, see [`CallSite`]
    metadata: Map,
}

/// Where a log statement originated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    function: CompactString,
    file: CompactString,
    line: u32,
}

/// Label set identifying a stream.
///
/// Keys are kept sorted, so two sets with the same contents compare equal and
/// produce the same [`canonical_key`](LabelSet::canonical_key) no matter in which
/// order they were built. Empty keys and empty values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Map,
}

/// One stream of the push payload: a label set and its values in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    #[serde(rename = "stream")]
    labels: LabelSet,
    values: Vec<(CompactString, CompactString)>,
}

/// The body of a single push request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    streams: Vec<Stream>,
}

impl LogEntry {
    /// Create a new entry stamped with the current time.
    pub fn now(level: impl Into<CompactString>, message: impl Into<CompactString>) -> Self {
        Self::new(now_nanos(), level, message)
    }

    /// Create a new entry with the given timestamp in nanoseconds since the epoch.
    pub fn new(
        timestamp: i64,
        level: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        LogEntry {
            timestamp,
            message: message.into(),
            level: level.into(),
            logger: CompactString::const_new(""),
            metadata: Map::default(),
        }
    }

    /// Set the name of the logger that produced this entry.
    pub fn with_logger(mut self, logger: impl Into<CompactString>) -> Self {
        self.logger = logger.into();
        self
    }

    /// Add a metadata key-value pair.
    pub fn with_metadata(
        mut self,
        key: impl Into<CompactString>,
        value: impl Into<CompactString>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach call-site metadata (`function`, `file`, `line`).
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.metadata
            .insert(CompactString::const_new(FUNCTION_KEY), call_site.function);
        self.metadata
            .insert(CompactString::const_new(FILE_KEY), call_site.file);
        self.metadata.insert(
            CompactString::const_new(LINE_KEY),
            call_site.line.to_compact_string(),
        );
        self
    }

    /// Remove a metadata entry.
    pub fn remove_metadata<Q>(&mut self, key: &Q)
    where
        CompactString: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.metadata.remove(key);
    }

    /// Nanoseconds since the UNIX epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The formatted message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The level name as emitted by the front-end, e.g. `INFO`.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// The logger name.
    pub fn logger(&self) -> &str {
        &self.logger
    }

    /// Look up a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(CompactString::as_str)
    }
}

impl CallSite {
    /// Create a call site. Only the file name of `file` is kept.
    pub fn new(function: impl Into<CompactString>, file: &str, line: u32) -> Self {
        CallSite {
            function: non_empty(function.into()),
            file: non_empty(file_name(file).into()),
            line,
        }
    }

    /// The sentinel call site used when resolution fails.
    pub fn unknown() -> Self {
        CallSite {
            function: CompactString::const_new(UNKNOWN),
            file: CompactString::const_new(UNKNOWN),
            line: 0,
        }
    }

    /// Function name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// File name, without directories.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Line number, `0` if unknown.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Default for CallSite {
    fn default() -> Self {
        CallSite::unknown()
    }
}

impl LabelSet {
    /// Create an empty label set.
    pub fn new() -> Self {
        LabelSet::default()
    }

    /// Add a label, see [`insert`](LabelSet::insert).
    pub fn with(mut self, key: impl Into<CompactString>, value: impl Into<CompactString>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a label, replacing any previous value under the same key.
    ///
    /// Returns `false` and leaves the set untouched if the key or the value is empty.
    pub fn insert(
        &mut self,
        key: impl Into<CompactString>,
        value: impl Into<CompactString>,
    ) -> bool {
        let (key, value) = (key.into(), value.into());
        if key.is_empty() || value.is_empty() {
            return false;
        }
        self.labels.insert(key, value);
        true
    }

    /// Look up a label value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(CompactString::as_str)
    }

    /// Iterate labels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set holds no label.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `k=v` pairs sorted by key and joined with `|`.
    ///
    /// `\`, `|` and `=` inside keys and values are backslash-escaped, so distinct
    /// sets never share a key.
    pub fn canonical_key(&self) -> String {
        let mut key = String::with_capacity(self.labels.len() * 16);
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                key.push('|');
            }
            push_escaped(&mut key, k);
            key.push('=');
            push_escaped(&mut key, v);
        }
        key
    }
}

impl Hash for LabelSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.labels.len());
        for (k, v) in self.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '\\' | '|' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<CompactString>,
    V: Into<CompactString>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = LabelSet::new();
        for (k, v) in iter {
            labels.insert(k, v);
        }
        labels
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.labels.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Stream {
    pub(crate) fn new(labels: LabelSet) -> Self {
        Stream {
            labels,
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, timestamp: i64, message: CompactString) {
        self.values.push((timestamp.to_compact_string(), message));
    }

    /// The labels of this stream.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// `(timestamp, message)` pairs in arrival order.
    pub fn values(&self) -> &[(CompactString, CompactString)] {
        &self.values
    }
}

impl Payload {
    pub(crate) fn from_streams(streams: Vec<Stream>) -> Self {
        Payload { streams }
    }

    /// The streams, in the order their label sets were first seen.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Total number of values over all streams.
    pub fn entries(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }

    /// Whether the payload carries no stream.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Encode into the push API JSON body.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

pub(crate) fn non_empty(value: CompactString) -> CompactString {
    if value.is_empty() {
        CompactString::const_new(UNKNOWN)
    } else {
        value
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn now_nanos() -> i64 {
    jiff::Timestamp::now().as_nanosecond() as i64
}
