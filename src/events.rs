//! Typed event surface of the session.
//!
//! The set of events is a closed enum rather than free-form string names, so every
//! payload shape is checked at compile time. `EventKind::name` preserves the wire
//! names the application layer historically subscribed with.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::id_types::{ParticipantId, SessionId};
use crate::metrics::SESSION_EVENTS_EMITTED_TOTAL;
use crate::participant::Participant;
use crate::stream::Stream;

/// Discriminant of a `SessionEvent`, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UpdateMainSpeaker,
    ErrorRoom,
    RoomConnected,
    StreamAdded,
    ParticipantPublished,
    ParticipantJoined,
    ParticipantLeft,
    StreamRemoved,
    ParticipantEvicted,
    NewMessage,
    RoomClosed,
    LostConnection,
    ErrorMedia,
}

impl EventKind {
    /// The historical wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::UpdateMainSpeaker => "update-main-speaker",
            EventKind::ErrorRoom => "error-room",
            EventKind::RoomConnected => "room-connected",
            EventKind::StreamAdded => "stream-added",
            EventKind::ParticipantPublished => "participant-published",
            EventKind::ParticipantJoined => "participant-joined",
            EventKind::ParticipantLeft => "participant-left",
            EventKind::StreamRemoved => "stream-removed",
            EventKind::ParticipantEvicted => "participant-evicted",
            EventKind::NewMessage => "newMessage",
            EventKind::RoomClosed => "room-closed",
            EventKind::LostConnection => "lost-connection",
            EventKind::ErrorMedia => "error-media",
        }
    }
}

/// One lifecycle event, with its full payload.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    UpdateMainSpeaker {
        participant_id: ParticipantId,
    },
    ErrorRoom {
        error: String,
    },
    /// Emitted once per successful connect, with the complete roster.
    RoomConnected {
        participants: Vec<Participant>,
        streams: Vec<Stream>,
    },
    StreamAdded {
        stream: Stream,
    },
    ParticipantPublished {
        participant: Participant,
    },
    ParticipantJoined {
        participant: Participant,
    },
    ParticipantLeft {
        participant: Participant,
    },
    StreamRemoved {
        stream: Stream,
    },
    ParticipantEvicted {
        local_participant: Participant,
    },
    NewMessage {
        room: String,
        user: String,
        message: String,
    },
    RoomClosed {
        room: String,
    },
    LostConnection {
        room: SessionId,
    },
    ErrorMedia {
        error: String,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::UpdateMainSpeaker { .. } => EventKind::UpdateMainSpeaker,
            SessionEvent::ErrorRoom { .. } => EventKind::ErrorRoom,
            SessionEvent::RoomConnected { .. } => EventKind::RoomConnected,
            SessionEvent::StreamAdded { .. } => EventKind::StreamAdded,
            SessionEvent::ParticipantPublished { .. } => EventKind::ParticipantPublished,
            SessionEvent::ParticipantJoined { .. } => EventKind::ParticipantJoined,
            SessionEvent::ParticipantLeft { .. } => EventKind::ParticipantLeft,
            SessionEvent::StreamRemoved { .. } => EventKind::StreamRemoved,
            SessionEvent::ParticipantEvicted { .. } => EventKind::ParticipantEvicted,
            SessionEvent::NewMessage { .. } => EventKind::NewMessage,
            SessionEvent::RoomClosed { .. } => EventKind::RoomClosed,
            SessionEvent::LostConnection { .. } => EventKind::LostConnection,
            SessionEvent::ErrorMedia { .. } => EventKind::ErrorMedia,
        }
    }
}

/// Handle returned by `add_listener`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// In-process publish/subscribe. Delivery is synchronous within `emit` and follows
/// registration order for a given kind.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .lock()
            .await
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a previously registered listener. Returns false if it was unknown.
    pub async fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().await;
        for entries in listeners.values_mut() {
            if let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    /// Delivers the event to every listener registered for its kind.
    ///
    /// The listener list is snapshotted before dispatch, so a listener may register
    /// or remove listeners without deadlocking; such changes take effect from the
    /// next emission.
    pub async fn emit(&self, event: &SessionEvent) {
        SESSION_EVENTS_EMITTED_TOTAL
            .with_label_values(&[event.kind().name()])
            .inc();

        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().await;
            match listeners.get(&event.kind()) {
                Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };

        for listener in snapshot {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn test_emit_reaches_registered_listener() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        bus.add_listener(EventKind::ErrorRoom, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        bus.emit(&SessionEvent::ErrorRoom {
            error: "boom".to_string(),
        })
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emit_skips_other_kinds() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        bus.add_listener(EventKind::RoomClosed, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        bus.emit(&SessionEvent::ErrorRoom {
            error: "boom".to_string(),
        })
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delivery_follows_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order_clone = order.clone();
            bus.add_listener(EventKind::ErrorMedia, move |_| {
                order_clone.lock().unwrap().push(tag);
            })
            .await;
        }

        bus.emit(&SessionEvent::ErrorMedia {
            error: "e".to_string(),
        })
        .await;

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let id = bus
            .add_listener(EventKind::ErrorRoom, move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(bus.remove_listener(id).await);
        assert!(!bus.remove_listener(id).await);

        bus.emit(&SessionEvent::ErrorRoom {
            error: "boom".to_string(),
        })
        .await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wire_names_are_stable() {
        assert_eq!(EventKind::UpdateMainSpeaker.name(), "update-main-speaker");
        assert_eq!(EventKind::NewMessage.name(), "newMessage");
        assert_eq!(EventKind::ErrorMedia.name(), "error-media");
    }
}
