use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::id_types::ParticipantId;
use crate::registry::StreamRegistry;
use crate::signaling::ParticipantPayload;
use crate::stream::Stream;

struct ParticipantInner {
    id: ParticipantId,
    is_local: bool,
    streams: StreamRegistry,
    disposed: AtomicBool,
}

/// One member of a session, local or remote, owning zero or more streams.
/// Cheap to clone; all handles share the same inner state.
#[derive(Clone)]
pub struct Participant {
    inner: Arc<ParticipantInner>,
}

impl Participant {
    /// The local participant, registered at session-configure time.
    pub fn local(id: ParticipantId) -> Self {
        Self {
            inner: Arc::new(ParticipantInner {
                id,
                is_local: true,
                streams: StreamRegistry::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// A remote participant constructed from a signaling payload. Streams named in
    /// the payload are registered with a back-reference to this participant.
    pub fn remote(payload: &ParticipantPayload) -> Self {
        let id = ParticipantId::from(payload.id.clone());
        let streams = StreamRegistry::new();
        for stream_payload in &payload.streams {
            streams.insert(Stream::from_payload(stream_payload, id.clone()));
        }
        Self {
            inner: Arc::new(ParticipantInner {
                id,
                is_local: false,
                streams,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.inner.id
    }

    pub fn is_local(&self) -> bool {
        self.inner.is_local
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn streams(&self) -> Vec<Stream> {
        self.inner.streams.snapshot()
    }

    pub fn get_stream(&self, id: &crate::id_types::StreamId) -> Option<Stream> {
        self.inner.streams.get(id)
    }

    /// Registers a stream on this participant. Used by the application layer to
    /// attach local streams before publishing.
    pub fn add_stream(&self, stream: Stream) -> Option<Stream> {
        self.inner.streams.insert(stream)
    }

    pub fn stream_count(&self) -> usize {
        self.inner.streams.len()
    }

    pub fn has_streams(&self) -> bool {
        !self.inner.streams.is_empty()
    }

    /// True iff any owned stream has data-channel support enabled.
    pub fn has_data_channels(&self) -> bool {
        self.inner.streams.any_data_channel()
    }

    /// Releases every owned stream. Idempotent: a second call (including one racing
    /// a still-pending outbound request) does nothing.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for stream in self.inner.streams.snapshot() {
            stream.dispose().await;
        }
        self.inner.streams.clear();
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.inner.id)
            .field("is_local", &self.inner.is_local)
            .field("streams", &self.inner.streams.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
