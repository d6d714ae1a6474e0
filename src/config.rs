use std::time::Duration;

use crate::id_types::{ParticipantId, SessionId};

/// Default for subscribing to every remote stream as it appears.
pub const DEFAULT_SUBSCRIBE_TO_STREAMS: bool = true;
/// Default polling period of the dominant-speaker timer.
pub const DEFAULT_UPDATE_SPEAKER_INTERVAL: Duration = Duration::from_millis(1500);
/// Default volume threshold (dB) above which a participant counts as speaking.
pub const DEFAULT_THRESHOLD_SPEAKER: f64 = -50.0;

/// Caller-facing session options.
///
/// Optional fields use presence-checked defaults: an explicit `Some(false)` or
/// `Some(0.0)` is honored instead of being silently coerced to the default.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub session_id: String,
    pub participant_id: String,
    pub subscribe_to_streams: Option<bool>,
    pub update_speaker_interval: Option<Duration>,
    pub threshold_speaker: Option<f64>,
}

/// Resolved, validated configuration held by the session for its whole lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub subscribe_to_streams: bool,
    pub update_speaker_interval: Duration,
    pub threshold_speaker: f64,
}

#[derive(Debug)]
pub enum ConfigError {
    EmptySessionId,
    EmptyParticipantId,
    ZeroSpeakerInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptySessionId => write!(f, "sessionId must not be empty"),
            ConfigError::EmptyParticipantId => write!(f, "participantId must not be empty"),
            ConfigError::ZeroSpeakerInterval => {
                write!(f, "updateSpeakerInterval must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SessionOptions {
    /// Validates the options and fills in defaults for absent fields.
    /// Returns an error if any required field is missing or invalid.
    pub fn resolve(self) -> Result<SessionConfig, ConfigError> {
        if self.session_id.is_empty() {
            return Err(ConfigError::EmptySessionId);
        }
        if self.participant_id.is_empty() {
            return Err(ConfigError::EmptyParticipantId);
        }

        let update_speaker_interval = self
            .update_speaker_interval
            .unwrap_or(DEFAULT_UPDATE_SPEAKER_INTERVAL);
        if update_speaker_interval.is_zero() {
            return Err(ConfigError::ZeroSpeakerInterval);
        }

        Ok(SessionConfig {
            session_id: SessionId::from(self.session_id),
            participant_id: ParticipantId::from(self.participant_id),
            subscribe_to_streams: self
                .subscribe_to_streams
                .unwrap_or(DEFAULT_SUBSCRIBE_TO_STREAMS),
            update_speaker_interval,
            threshold_speaker: self.threshold_speaker.unwrap_or(DEFAULT_THRESHOLD_SPEAKER),
        })
    }
}
