//! WebSocket message types for the real-time ride channel.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection after the
//! handshake credential has been verified, and pushes [`WsServerMessage`]
//! JSON frames.
//!
//! # Protocol
//!
//! 1. The credential is a bearer token, sent either as the `Authorization`
//!    header or as the `token` query parameter (browsers cannot set headers
//!    on a WebSocket handshake).
//! 2. If the credential is rejected the server sends an
//!    [`WsServerMessage::Error`] and a close frame with
//!    [`WsCloseCode::UNAUTHENTICATED`].
//! 3. Every ride mutation produces a [`WsServerMessage::RideUpdated`] frame
//!    for all connected clients, so list views can refresh.
//! 4. Targeted frames ([`WsServerMessage::RideNotification`],
//!    [`WsServerMessage::ChatMessage`]) are only delivered to the sockets of
//!    the user they are addressed to.
//!
//! Nothing is queued for offline users: the ride's notification log and a
//! fresh fetch are the recovery path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::messages::RideMessageResponse;
use super::rides::PublicRideResponse;

/// Classification tag attached to a targeted ride notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Interest,
    Accepted,
    Rejected,
    Started,
    Completed,
    Cancelled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Interest => write!(f, "interest"),
            NotificationKind::Accepted => write!(f, "accepted"),
            NotificationKind::Rejected => write!(f, "rejected"),
            NotificationKind::Started => write!(f, "started"),
            NotificationKind::Completed => write!(f, "completed"),
            NotificationKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"ride-updated","ride":{ ... }}
/// {"type":"ride-notification","ride_id":"...","message":"...","kind":"rejected"}
/// {"type":"error","code":4001,"reason":"credential expired"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WsServerMessage {
    /// Public snapshot of a ride that just changed.
    RideUpdated { ride: PublicRideResponse },

    /// A message addressed to the receiving user.
    RideNotification {
        ride_id: Uuid,
        message: String,
        kind: NotificationKind,
    },

    /// A chat line posted on a ride the receiving user takes part in.
    ChatMessage {
        ride_id: Uuid,
        message: RideMessageResponse,
    },

    /// A server-side error. The server may send a close frame afterwards.
    Error { code: u16, reason: String },
}

/// Well-known WebSocket close codes used by the ride channel.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The handshake credential was missing, invalid, expired, or named a
    /// user that no longer exists.
    pub const UNAUTHENTICATED: u16 = 4001;
}
