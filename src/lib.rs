pub mod config;
pub mod events;
pub mod id_types;
pub mod logging;
pub mod metrics;
pub mod participant;
pub mod registry;
pub mod session;
pub mod signaling;
pub mod speaking;
pub mod stream;
pub mod transport;

pub use config::{SessionConfig, SessionOptions};
pub use events::{EventKind, ListenerId, SessionEvent};
pub use id_types::{ParticipantId, SessionId, StreamId};
pub use participant::Participant;
pub use session::{Session, SessionError};
pub use stream::{MediaEndpoint, Stream};
pub use transport::SignalingTransport;
