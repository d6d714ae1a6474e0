use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

use crate::config::{ConfigError, SessionConfig, SessionOptions, DEFAULT_SUBSCRIBE_TO_STREAMS};
use crate::events::{EventBus, EventKind, ListenerId, SessionEvent};
use crate::id_types::{ParticipantId, SessionId, StreamId};
use crate::metrics::{
    observe_dropped, observe_request, SESSION_ACTIVE_PARTICIPANTS, SESSION_ACTIVE_STREAMS,
};
use crate::participant::Participant;
use crate::signaling::{
    IceCandidatePayload, JoinRoomResponse, MediaErrorPayload, MessagePayload,
    ParticipantLeftPayload, ParticipantPayload, RoomClosedPayload,
};
use crate::stream::Stream;
use crate::speaking::SpeakingTracker;
use crate::transport::{methods, JoinRoomParams, SignalingTransport};

#[derive(Debug)]
pub enum SessionError {
    NotConfigured,
    AlreadyConfigured,
    InvalidOptions(ConfigError),
    /// The session was left while a request was still in flight; the late
    /// response was discarded.
    Terminated,
    JoinRoom(anyhow::Error),
    Protocol(serde_json::Error),
    UnownedStream(StreamId),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotConfigured => write!(f, "session has not been configured"),
            SessionError::AlreadyConfigured => write!(f, "session is already configured"),
            SessionError::InvalidOptions(e) => write!(f, "invalid session options: {}", e),
            SessionError::Terminated => {
                write!(f, "session was left while the request was in flight")
            }
            SessionError::JoinRoom(e) => write!(f, "joinRoom request failed: {}", e),
            SessionError::Protocol(e) => write!(f, "malformed signaling payload: {}", e),
            SessionError::UnownedStream(id) => {
                write!(f, "stream {} has no registered participant", id)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::InvalidOptions(e) => Some(e),
            SessionError::JoinRoom(e) => Some(e.as_ref()),
            SessionError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

struct SessionInner {
    transport: Arc<dyn SignalingTransport>,
    bus: EventBus,
    config: OnceLock<SessionConfig>,
    connected: AtomicBool,
    /// Bumped by `leave` so responses to requests issued before it are discarded.
    epoch: AtomicU64,
    /// The participant registry. This is the only writable handle; everything
    /// handed out is a cloned `Participant` view.
    participants: DashMap<ParticipantId, Participant>,
    speaking: Mutex<SpeakingTracker>,
    speaker_task: Mutex<Option<JoinHandle<()>>>,
}

/// The orchestrating entity representing one joined communication room.
///
/// Consumes inbound signaling notifications through the `on_*` handlers, drives the
/// connect/leave/disconnect protocols against the transport collaborator, and emits
/// all lifecycle events through its typed event bus. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                transport,
                bus: EventBus::new(),
                config: OnceLock::new(),
                connected: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                participants: DashMap::new(),
                speaking: Mutex::new(SpeakingTracker::new()),
                speaker_task: Mutex::new(None),
            }),
        }
    }

    /// One-time initialization: resolves options, registers the local participant
    /// and starts the dominant-speaker timer. Must be called before `connect`.
    pub async fn configure(&self, options: SessionOptions) -> Result<(), SessionError> {
        let config = options.resolve().map_err(SessionError::InvalidOptions)?;
        let interval = config.update_speaker_interval;
        let session_id = config.session_id.clone();
        let participant_id = config.participant_id.clone();

        self.inner
            .config
            .set(config)
            .map_err(|_| SessionError::AlreadyConfigured)?;

        let local = Participant::local(participant_id.clone());
        self.inner.participants.insert(participant_id.clone(), local);
        self.update_registry_gauges();

        self.start_speaker_timer(interval).await;
        info!(session = %session_id, participant = %participant_id, "Session configured");
        Ok(())
    }

    async fn start_speaker_timer(&self, period: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick of a tokio interval completes immediately; skip it so
            // emissions start one full period after configure.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let current = inner.speaking.lock().await.current().cloned();
                if let Some(participant_id) = current {
                    inner
                        .bus
                        .emit(&SessionEvent::UpdateMainSpeaker { participant_id })
                        .await;
                }
            }
        });
        *self.inner.speaker_task.lock().await = Some(handle);
    }

    /// Joins the room. On failure emits `error-room` and leaves local state
    /// untouched. On success registers every participant already present, emits a
    /// single `room-connected` with the complete roster, and (when auto-subscribe
    /// is enabled) subscribes to every incoming stream before emitting one
    /// `stream-added` per stream.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let config = self.config()?;
        let data_channels = self
            .local_participant()
            .map(|p| p.has_data_channels())
            .unwrap_or(false);

        let params = JoinRoomParams {
            user: config.participant_id.as_ref().to_string(),
            room: config.session_id.as_ref().to_string(),
            data_channels,
        };
        let params = serde_json::to_value(&params).map_err(SessionError::Protocol)?;

        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let result = self
            .inner
            .transport
            .send_request(methods::JOIN_ROOM, Some(params))
            .await;
        observe_request(methods::JOIN_ROOM, result.is_ok());

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "Unable to join room");
                self.inner
                    .bus
                    .emit(&SessionEvent::ErrorRoom {
                        error: error.to_string(),
                    })
                    .await;
                return Err(SessionError::JoinRoom(error));
            }
        };

        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            warn!("Session was left while joinRoom was in flight, discarding late response");
            return Err(SessionError::Terminated);
        }

        let response: JoinRoomResponse = serde_json::from_value(response).map_err(|error| {
            warn!(error = %error, "Malformed joinRoom response");
            SessionError::Protocol(error)
        })?;

        self.inner.connected.store(true, Ordering::SeqCst);

        let mut participants = Vec::new();
        let mut streams = Vec::new();
        for payload in &response.value {
            let participant = Participant::remote(payload);
            self.inner
                .participants
                .insert(participant.id().clone(), participant.clone());
            streams.extend(participant.streams());
            participants.push(participant);
        }
        self.update_registry_gauges();
        info!(
            session = %config.session_id,
            participants = participants.len(),
            streams = streams.len(),
            "Room connected"
        );

        self.inner
            .bus
            .emit(&SessionEvent::RoomConnected {
                participants,
                streams: streams.clone(),
            })
            .await;

        if config.subscribe_to_streams {
            for stream in &streams {
                if let Err(error) = stream.subscribe().await {
                    error!(stream = %stream.id(), error = %error, "Failed to subscribe to stream");
                }
            }
            for stream in streams {
                self.inner
                    .bus
                    .emit(&SessionEvent::StreamAdded { stream })
                    .await;
            }
        }
        Ok(())
    }

    /// Terminates the session. `forced` means the server evicted us, so no
    /// `leaveRoom` round trip is attempted. Every participant is disposed and
    /// removed, the speaking list cleared and the dominant-speaker timer stopped.
    pub async fn leave(&self, forced: bool) {
        info!(forced, "Leaving room");
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        if self.inner.connected.load(Ordering::SeqCst) && !forced {
            let result = self
                .inner
                .transport
                .send_request(methods::LEAVE_ROOM, None)
                .await;
            observe_request(methods::LEAVE_ROOM, result.is_ok());
            if let Err(error) = result {
                error!(error = %error, "leaveRoom request failed");
            }
            // The connection is closed only after the response, error or not.
            self.inner.transport.close().await;
        } else {
            self.inner.transport.close().await;
        }

        self.inner.connected.store(false, Ordering::SeqCst);

        if let Some(handle) = self.inner.speaker_task.lock().await.take() {
            handle.abort();
        }
        self.inner.speaking.lock().await.clear();

        let participants: Vec<Participant> = self
            .inner
            .participants
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.inner.participants.clear();
        for participant in participants {
            participant.dispose().await;
        }
        self.update_registry_gauges();
    }

    /// Removes one participant's presence, driven by one of its streams: the local
    /// participant is unpublished, a remote stream is unsubscribed. Emits no events;
    /// the server-driven `on_participant_left` is the event-emitting counterpart.
    pub async fn disconnect(&self, stream: &Stream) -> Result<(), SessionError> {
        let participant_id = stream.participant_id().clone();
        let Some((_, participant)) = self.inner.participants.remove(&participant_id) else {
            error!(
                stream = %stream.id(),
                participant = %participant_id,
                "Stream to disconnect has no registered participant"
            );
            return Err(SessionError::UnownedStream(stream.id().clone()));
        };

        participant.dispose().await;
        self.update_registry_gauges();

        if participant.is_local() {
            info!(participant = %participant_id, "Unpublishing local media");
            let result = self
                .inner
                .transport
                .send_request(methods::UNPUBLISH_VIDEO, None)
                .await;
            observe_request(methods::UNPUBLISH_VIDEO, result.is_ok());
            match result {
                Ok(_) => info!("Media unpublished correctly"),
                Err(error) => error!(error = %error, "unpublishVideo request failed"),
            }
        } else {
            info!(stream = %stream.id(), "Unsubscribing from stream");
            let params = serde_json::json!({ "sender": stream.id().as_ref() });
            let result = self
                .inner
                .transport
                .send_request(methods::UNSUBSCRIBE_FROM_VIDEO, Some(params))
                .await;
            observe_request(methods::UNSUBSCRIBE_FROM_VIDEO, result.is_ok());
            match result {
                Ok(_) => info!(stream = %stream.id(), "Unsubscribed correctly"),
                Err(error) => error!(error = %error, "unsubscribeFromVideo request failed"),
            }
        }
        Ok(())
    }

    /// Subscribes to one stream explicitly (outside the auto-subscribe path).
    pub async fn subscribe(&self, stream: &Stream) {
        if let Err(error) = stream.subscribe().await {
            error!(stream = %stream.id(), error = %error, "Subscribe failed");
        }
    }

    // ---- Inbound signaling handlers -------------------------------------------
    //
    // Malformed payloads never escalate past a diagnostic: the handlers log, count
    // the drop, and leave the registry untouched.

    /// A participant joined the room. If the id is already known the existing
    /// entry is kept, because it may already carry stream info from a publish
    /// notification that raced this one.
    pub async fn on_participant_joined(&self, payload: ParticipantPayload) {
        let id = ParticipantId::from(payload.id.clone());
        let participant = match self.inner.participants.entry(id.clone()) {
            Entry::Occupied(entry) => {
                info!(participant = %id, "Participant already known, keeping existing entry");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                info!(participant = %id, "New participant joined");
                let participant = Participant::remote(&payload);
                entry.insert(participant.clone());
                participant
            }
        };
        self.update_registry_gauges();
        self.inner
            .bus
            .emit(&SessionEvent::ParticipantJoined { participant })
            .await;
    }

    /// A participant published media. Always replaces any existing registry entry:
    /// the fresh object carries the stream info a join-only placeholder lacks.
    pub async fn on_participant_published(&self, payload: ParticipantPayload) {
        let participant = Participant::remote(&payload);
        let id = participant.id().clone();

        if self
            .inner
            .participants
            .insert(id.clone(), participant.clone())
            .is_some()
        {
            info!(participant = %id, "Publisher replaced existing registry entry");
        } else {
            info!(participant = %id, "Publisher was not previously registered");
        }
        self.update_registry_gauges();

        self.inner
            .bus
            .emit(&SessionEvent::ParticipantPublished {
                participant: participant.clone(),
            })
            .await;

        if self.subscribe_to_streams() {
            for stream in participant.streams() {
                if let Err(error) = stream.subscribe().await {
                    error!(stream = %stream.id(), error = %error, "Failed to subscribe to stream");
                }
                self.inner
                    .bus
                    .emit(&SessionEvent::StreamAdded { stream })
                    .await;
            }
        }
    }

    /// A participant left. Unknown ids are absorbed as a diagnostic.
    pub async fn on_participant_left(&self, payload: ParticipantLeftPayload) {
        let Some(name) = payload.name else {
            warn!("participantLeft notification without a name, ignoring");
            observe_dropped("malformed_payload");
            return;
        };
        let id = ParticipantId::from(name);

        match self.inner.participants.remove(&id) {
            Some((_, participant)) => {
                info!(participant = %id, "Participant left");
                self.update_registry_gauges();
                self.inner
                    .bus
                    .emit(&SessionEvent::ParticipantLeft {
                        participant: participant.clone(),
                    })
                    .await;
                for stream in participant.streams() {
                    self.inner
                        .bus
                        .emit(&SessionEvent::StreamRemoved { stream })
                        .await;
                }
                participant.dispose().await;
            }
            None => {
                warn!(participant = %id, "Unknown participant left, ignoring");
                observe_dropped("unknown_participant");
            }
        }
    }

    /// The server evicted the local participant. No registry mutation here; the
    /// application reacts to the event (typically by calling `leave(true)`).
    pub async fn on_participant_evicted(&self) {
        match self.local_participant() {
            Some(local_participant) => {
                self.inner
                    .bus
                    .emit(&SessionEvent::ParticipantEvicted { local_participant })
                    .await;
            }
            None => {
                warn!("Evicted notification without a registered local participant, ignoring");
                observe_dropped("unknown_participant");
            }
        }
    }

    pub async fn on_new_message(&self, payload: MessagePayload) {
        let Some(user) = payload.user else {
            error!("User missing in message notification, ignoring");
            observe_dropped("malformed_payload");
            return;
        };
        self.inner
            .bus
            .emit(&SessionEvent::NewMessage {
                room: payload.room.unwrap_or_default(),
                user,
                message: payload.message.unwrap_or_default(),
            })
            .await;
    }

    /// Forwards a remote ICE candidate to every stream of the named endpoint.
    /// Candidates for unknown endpoints cannot be buffered and are dropped.
    pub async fn recv_ice_candidate(&self, payload: IceCandidatePayload) {
        let Some(endpoint_name) = payload.endpoint_name else {
            error!("ICE candidate without an endpointName, ignoring");
            observe_dropped("malformed_payload");
            return;
        };
        let id = ParticipantId::from(endpoint_name);
        let Some(participant) = self.participant(&id) else {
            error!(endpoint = %id, "Participant not found for endpoint, ICE candidate will be ignored");
            observe_dropped("unknown_endpoint");
            return;
        };

        let candidate = RTCIceCandidateInit {
            candidate: payload.candidate,
            sdp_mid: payload.sdp_mid,
            sdp_mline_index: payload.sdp_mline_index,
            username_fragment: None,
        };
        for stream in participant.streams() {
            if let Err(error) = stream.add_ice_candidate(candidate.clone()).await {
                error!(
                    stream = %stream.id(),
                    endpoint = %id,
                    error = %error,
                    "Error adding ICE candidate for stream"
                );
            }
        }
    }

    pub async fn on_room_closed(&self, payload: RoomClosedPayload) {
        match payload.room {
            Some(room) => {
                info!(room = %room, "Room closed");
                self.inner.bus.emit(&SessionEvent::RoomClosed { room }).await;
            }
            None => {
                error!("Room missing in roomClosed notification, ignoring");
                observe_dropped("malformed_payload");
            }
        }
    }

    pub async fn on_lost_connection(&self) {
        if !self.is_connected() {
            warn!("Not connected to room, ignoring lost connection notification");
            observe_dropped("not_connected");
            return;
        }
        let Some(config) = self.inner.config.get() else {
            warn!("Lost connection before the session was configured, ignoring");
            observe_dropped("not_connected");
            return;
        };
        info!(room = %config.session_id, "Lost connection in room");
        self.inner
            .bus
            .emit(&SessionEvent::LostConnection {
                room: config.session_id.clone(),
            })
            .await;
    }

    pub async fn on_media_error(&self, payload: MediaErrorPayload) {
        match payload.error {
            Some(error) => {
                error!(error = %error, "Media error");
                self.inner.bus.emit(&SessionEvent::ErrorMedia { error }).await;
            }
            None => {
                error!("Received media error notification without an error field, ignoring");
                observe_dropped("malformed_payload");
            }
        }
    }

    // ---- Speaking tracker ------------------------------------------------------

    pub async fn add_participant_speaking(&self, id: ParticipantId) {
        self.inner.speaking.lock().await.add(id);
    }

    pub async fn remove_participant_speaking(&self, id: &ParticipantId) {
        self.inner.speaking.lock().await.remove(id);
    }

    pub async fn speaking_count(&self) -> usize {
        self.inner.speaking.lock().await.len()
    }

    // ---- Accessors ---------------------------------------------------------------

    pub fn id(&self) -> Option<SessionId> {
        self.inner.config.get().map(|c| c.session_id.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Volume threshold (dB) for speech detection; consumed by the audio-level
    /// detection outside this crate.
    pub fn threshold_speaker(&self) -> Option<f64> {
        self.inner.config.get().map(|c| c.threshold_speaker)
    }

    pub fn local_participant(&self) -> Option<Participant> {
        let config = self.inner.config.get()?;
        self.participant(&config.participant_id)
            .filter(|p| p.is_local())
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.inner
            .participants
            .get(id)
            .map(|entry| entry.value().clone())
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.inner
            .participants
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn participant_count(&self) -> usize {
        self.inner.participants.len()
    }

    /// Session-level flattened view of every stream owned by any participant.
    pub fn streams(&self) -> Vec<Stream> {
        self.inner
            .participants
            .iter()
            .flat_map(|entry| entry.value().streams())
            .collect()
    }

    pub async fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.bus.add_listener(kind, listener).await
    }

    pub async fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.bus.remove_listener(id).await
    }

    // ---- Internals ---------------------------------------------------------------

    fn config(&self) -> Result<&SessionConfig, SessionError> {
        self.inner.config.get().ok_or(SessionError::NotConfigured)
    }

    fn subscribe_to_streams(&self) -> bool {
        self.inner
            .config
            .get()
            .map(|c| c.subscribe_to_streams)
            .unwrap_or(DEFAULT_SUBSCRIBE_TO_STREAMS)
    }

    fn update_registry_gauges(&self) {
        SESSION_ACTIVE_PARTICIPANTS.set(self.inner.participants.len() as i64);
        let streams: usize = self
            .inner
            .participants
            .iter()
            .map(|entry| entry.value().stream_count())
            .sum();
        SESSION_ACTIVE_STREAMS.set(streams as i64);
    }
}
