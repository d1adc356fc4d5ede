use dorycar_sdk::objects::{
    NotificationKind, PublicRideResponse, RideMessageResponse, WsServerMessage,
};
use std::sync::Arc;
use uuid::Uuid;

/// An event travelling through the [`Hub`](super::Hub).
///
/// Cheap to clone: every receiver of a broadcast gets its own copy.
#[derive(Debug, Clone, PartialEq)]
pub enum RideEvent {
    RideUpdated(Arc<PublicRideResponse>),
    Notification {
        ride_id: Uuid,
        kind: NotificationKind,
        message: String,
    },
    Chat {
        ride_id: Uuid,
        message: RideMessageResponse,
    },
}

impl From<&RideEvent> for WsServerMessage {
    fn from(event: &RideEvent) -> Self {
        match event {
            RideEvent::RideUpdated(ride) => WsServerMessage::RideUpdated {
                ride: ride.as_ref().clone(),
            },
            RideEvent::Notification {
                ride_id,
                kind,
                message,
            } => WsServerMessage::RideNotification {
                ride_id: *ride_id,
                message: message.clone(),
                kind: *kind,
            },
            RideEvent::Chat { ride_id, message } => WsServerMessage::ChatMessage {
                ride_id: *ride_id,
                message: message.clone(),
            },
        }
    }
}

/// A targeted notification computed by a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: Uuid,
    pub kind: NotificationKind,
    pub message: String,
}

impl Delivery {
    pub fn new(recipient: Uuid, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient,
            kind,
            message: message.into(),
        }
    }
}
