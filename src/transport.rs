//! Seam to the signaling transport collaborator.
//!
//! The session issues request/response calls through this trait and never owns the
//! connection itself. Push notifications travel the other way: the transport layer
//! parses them and invokes the matching `Session::on_*` handler.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Request method names understood by the signaling server.
pub mod methods {
    pub const JOIN_ROOM: &str = "joinRoom";
    pub const LEAVE_ROOM: &str = "leaveRoom";
    pub const UNPUBLISH_VIDEO: &str = "unpublishVideo";
    pub const UNSUBSCRIBE_FROM_VIDEO: &str = "unsubscribeFromVideo";
}

/// Parameters of the `joinRoom` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomParams {
    pub user: String,
    pub room: String,
    pub data_channels: bool,
}

/// The request/response signaling channel the session drives.
///
/// Implementations must resolve each `send_request` exactly once, with either the
/// response body or an error. `close` tears the underlying connection down and is
/// expected to be idempotent.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value>;

    async fn close(&self);
}
