//! Wire payload types for inbound signaling notifications and the `joinRoom`
//! response. Field names follow the server's camelCase JSON.
//!
//! Fields whose absence the handlers must tolerate (a malformed payload degrades to
//! a diagnostic, never an error) are modeled as `Option`.

use serde::{Deserialize, Serialize};

/// One stream entry inside a participant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPayload {
    pub id: String,
    /// Whether the publisher negotiated a data channel for this stream.
    #[serde(default)]
    pub data_channels: bool,
}

/// A participant as described by the `joinRoom` response, `participantJoined`
/// and `participantPublished` notifications. Join-only notifications carry no
/// streams; publish notifications do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantPayload {
    pub id: String,
    #[serde(default)]
    pub streams: Vec<StreamPayload>,
}

/// Successful `joinRoom` response body: the participants already in the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    #[serde(default)]
    pub value: Vec<ParticipantPayload>,
}

/// `participantLeft` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantLeftPayload {
    pub name: Option<String>,
}

/// `sendMessage` push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub room: Option<String>,
    pub user: Option<String>,
    pub message: Option<String>,
}

/// `iceCandidate` push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    #[serde(default)]
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub endpoint_name: Option<String>,
}

/// `roomClosed` push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomClosedPayload {
    pub room: Option<String>,
}

/// `mediaError` push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaErrorPayload {
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_payload_without_streams() {
        let payload: ParticipantPayload = serde_json::from_str(r#"{ "id": "p1" }"#).unwrap();
        assert_eq!(payload.id, "p1");
        assert!(payload.streams.is_empty());
    }

    #[test]
    fn test_participant_payload_with_streams() {
        let payload: ParticipantPayload = serde_json::from_str(
            r#"{ "id": "p1", "streams": [ { "id": "s1", "dataChannels": true }, { "id": "s2" } ] }"#,
        )
        .unwrap();
        assert_eq!(payload.streams.len(), 2);
        assert!(payload.streams[0].data_channels);
        assert!(!payload.streams[1].data_channels);
    }

    #[test]
    fn test_ice_candidate_payload_wire_names() {
        let payload: IceCandidatePayload = serde_json::from_str(
            r#"{
                "candidate": "candidate:1 1 UDP 2122252543 192.0.2.1 49152 typ host",
                "sdpMid": "0",
                "sdpMLineIndex": 0,
                "endpointName": "p1"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.sdp_mid.as_deref(), Some("0"));
        assert_eq!(payload.sdp_mline_index, Some(0));
        assert_eq!(payload.endpoint_name.as_deref(), Some("p1"));
    }

    #[test]
    fn test_ice_candidate_payload_missing_endpoint() {
        let payload: IceCandidatePayload =
            serde_json::from_str(r#"{ "candidate": "candidate:1" }"#).unwrap();
        assert!(payload.endpoint_name.is_none());
    }

    #[test]
    fn test_join_room_response_empty_room() {
        let response: JoinRoomResponse = serde_json::from_str(r#"{ "value": [] }"#).unwrap();
        assert!(response.value.is_empty());
    }

    #[test]
    fn test_message_payload_missing_user() {
        let payload: MessagePayload =
            serde_json::from_str(r#"{ "room": "r1", "message": "hi" }"#).unwrap();
        assert!(payload.user.is_none());
    }
}
