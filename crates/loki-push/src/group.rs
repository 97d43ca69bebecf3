//! Partition a batch of entries into label-keyed streams.
use crate::proto::{
    FILE_KEY, FUNCTION_KEY, LEVEL_KEY, LINE_KEY, LabelSet, LogEntry, Payload, Stream, UNKNOWN,
    non_empty,
};
use compact_str::{CompactString, format_compact};
use std::collections::HashMap;

/// Group `batch` into streams, one per distinct label set.
///
/// Each entry is labelled with `base_labels` merged with its own `level`
/// (lowercased), `function` and `file`; the entry's labels win on conflict.
/// Streams come out in the order their label set was first seen and values keep
/// the order of `batch`, so the same input always yields the same payload.
pub fn group_batch(batch: &[LogEntry], base_labels: &LabelSet) -> Payload {
    let mut index: HashMap<LabelSet, usize> = HashMap::with_capacity(batch.len());
    let mut streams: Vec<Stream> = Vec::new();

    for entry in batch {
        let labels = entry_labels(entry, base_labels);
        let slot = *index.entry(labels).or_insert_with_key(|labels| {
            streams.push(Stream::new(labels.clone()));
            streams.len() - 1
        });
        streams[slot].push(entry.timestamp(), compose_message(entry));
    }

    Payload::from_streams(streams)
}

/// The message as shipped: prefixed with `[function:line]` when the entry carries
/// call-site metadata.
pub fn compose_message(entry: &LogEntry) -> CompactString {
    match entry.metadata(FUNCTION_KEY) {
        Some(function) => {
            let line = entry.metadata(LINE_KEY).unwrap_or("0");
            format_compact!("[{function}:{line}] {}", entry.message())
        }
        None => entry.message().into(),
    }
}

fn entry_labels(entry: &LogEntry, base_labels: &LabelSet) -> LabelSet {
    let mut labels = base_labels.clone();
    labels.insert(LEVEL_KEY, non_empty(entry.level().to_lowercase().into()));
    labels.insert(
        FUNCTION_KEY,
        non_empty(entry.metadata(FUNCTION_KEY).unwrap_or(UNKNOWN).into()),
    );
    labels.insert(
        FILE_KEY,
        non_empty(entry.metadata(FILE_KEY).unwrap_or(UNKNOWN).into()),
    );
    labels
}
