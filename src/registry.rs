use dashmap::DashMap;

use crate::id_types::StreamId;
use crate::stream::Stream;

/// Per-participant stream registry: StreamId -> Stream.
///
/// Only the owning participant (driven by the session) writes this map; everyone
/// else works with snapshots or cloned handles.
#[derive(Default)]
pub struct StreamRegistry {
    streams: DashMap<StreamId, Stream>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stream. Returns the previous entry if the id was already present.
    pub fn insert(&self, stream: Stream) -> Option<Stream> {
        self.streams.insert(stream.id().clone(), stream)
    }

    pub fn get(&self, id: &StreamId) -> Option<Stream> {
        self.streams.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &StreamId) -> Option<Stream> {
        self.streams.remove(id).map(|(_, stream)| stream)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Returns cloned handles to every stream currently registered.
    pub fn snapshot(&self) -> Vec<Stream> {
        self.streams
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// True iff any registered stream has data-channel support enabled.
    /// Aggregated into the `dataChannels` flag of the join request.
    pub fn any_data_channel(&self) -> bool {
        self.streams
            .iter()
            .any(|entry| entry.value().is_data_channel_enabled())
    }

    pub fn clear(&self) {
        self.streams.clear();
    }
}
