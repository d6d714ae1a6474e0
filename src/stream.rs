use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

use crate::id_types::{ParticipantId, StreamId};
use crate::signaling::StreamPayload;

/// The peer-connection collaborator behind one stream.
///
/// Media negotiation (SDP/ICE/DTLS) lives entirely behind this trait; the session
/// only forwards candidates and lifecycle calls to it.
#[async_trait]
pub trait MediaEndpoint: Send + Sync {
    /// Starts receiving (or sending, for a local stream) media for this stream.
    async fn subscribe(&self) -> Result<()>;

    /// Applies a remote ICE candidate.
    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()>;

    /// Releases any media resources held for this stream.
    async fn close(&self);
}

struct StreamInner {
    id: StreamId,
    /// Non-owning back-reference to the publishing participant, by id.
    participant_id: ParticipantId,
    data_channel_enabled: bool,
    endpoint: Mutex<Option<Arc<dyn MediaEndpoint>>>,
    subscribed: AtomicBool,
    disposed: AtomicBool,
}

/// One published media (or data) channel belonging to a participant.
/// Cheap to clone; all handles share the same inner state.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

impl Stream {
    pub fn new(id: StreamId, participant_id: ParticipantId, data_channel_enabled: bool) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id,
                participant_id,
                data_channel_enabled,
                endpoint: Mutex::new(None),
                subscribed: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_payload(payload: &StreamPayload, participant_id: ParticipantId) -> Self {
        Self::new(
            StreamId::from(payload.id.clone()),
            participant_id,
            payload.data_channels,
        )
    }

    pub fn id(&self) -> &StreamId {
        &self.inner.id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.inner.participant_id
    }

    pub fn is_data_channel_enabled(&self) -> bool {
        self.inner.data_channel_enabled
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.subscribed.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Attaches the peer-connection object for this stream. The application layer
    /// does this when it creates the media side; until then, subscribe and ICE
    /// forwarding are recorded locally and otherwise no-ops.
    pub async fn attach_endpoint(&self, endpoint: Arc<dyn MediaEndpoint>) {
        *self.inner.endpoint.lock().await = Some(endpoint);
    }

    /// Marks this stream subscribed and delegates negotiation to the endpoint.
    pub async fn subscribe(&self) -> Result<()> {
        self.inner.subscribed.store(true, Ordering::SeqCst);
        let endpoint = self.inner.endpoint.lock().await.clone();
        match endpoint {
            Some(endpoint) => endpoint.subscribe().await,
            None => {
                debug!(stream = %self.inner.id, "No media endpoint attached yet, subscribe recorded locally");
                Ok(())
            }
        }
    }

    /// Forwards a remote ICE candidate to the endpoint, if one is attached.
    pub async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        let endpoint = self.inner.endpoint.lock().await.clone();
        match endpoint {
            Some(endpoint) => endpoint.add_ice_candidate(candidate).await,
            None => {
                debug!(stream = %self.inner.id, "No media endpoint attached, dropping ICE candidate");
                Ok(())
            }
        }
    }

    /// Releases the endpoint. Safe to call more than once.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let endpoint = self.inner.endpoint.lock().await.take();
        if let Some(endpoint) = endpoint {
            endpoint.close().await;
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.inner.id)
            .field("participant_id", &self.inner.participant_id)
            .field("data_channel_enabled", &self.inner.data_channel_enabled)
            .field("subscribed", &self.is_subscribed())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Endpoint double that counts calls.
    pub(crate) struct CountingEndpoint {
        pub subscribes: AtomicUsize,
        pub candidates: AtomicUsize,
        pub closes: AtomicUsize,
    }

    impl CountingEndpoint {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                subscribes: AtomicUsize::new(0),
                candidates: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MediaEndpoint for CountingEndpoint {
        async fn subscribe(&self) -> Result<()> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn add_ice_candidate(&self, _candidate: RTCIceCandidateInit) -> Result<()> {
            self.candidates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_subscribe_without_endpoint_is_recorded() {
        let stream = Stream::new(StreamId::from("s1"), ParticipantId::from("p1"), false);
        assert!(!stream.is_subscribed());
        stream.subscribe().await.unwrap();
        assert!(stream.is_subscribed());
    }

    #[tokio::test]
    async fn test_subscribe_delegates_to_endpoint() {
        let stream = Stream::new(StreamId::from("s1"), ParticipantId::from("p1"), false);
        let endpoint = CountingEndpoint::new();
        stream.attach_endpoint(endpoint.clone()).await;

        stream.subscribe().await.unwrap();
        assert_eq!(endpoint.subscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let stream = Stream::new(StreamId::from("s1"), ParticipantId::from("p1"), false);
        let endpoint = CountingEndpoint::new();
        stream.attach_endpoint(endpoint.clone()).await;

        stream.dispose().await;
        stream.dispose().await;

        assert!(stream.is_disposed());
        assert_eq!(endpoint.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ice_candidate_forwarded() {
        let stream = Stream::new(StreamId::from("s1"), ParticipantId::from("p1"), false);
        let endpoint = CountingEndpoint::new();
        stream.attach_endpoint(endpoint.clone()).await;

        stream
            .add_ice_candidate(RTCIceCandidateInit::default())
            .await
            .unwrap();
        assert_eq!(endpoint.candidates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_from_payload_carries_back_reference() {
        let payload = StreamPayload {
            id: "cam".to_string(),
            data_channels: true,
        };
        let stream = Stream::from_payload(&payload, ParticipantId::from("p9"));
        assert_eq!(stream.id().as_ref(), "cam");
        assert_eq!(stream.participant_id().as_ref(), "p9");
        assert!(stream.is_data_channel_enabled());
    }
}
