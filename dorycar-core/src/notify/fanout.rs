use super::{Delivery, EventSink, RideEvent};
use crate::entities::ride::{Ride, RideMessage};
use std::sync::Arc;

/// Maps a committed ride change to hub events.
#[derive(Clone)]
pub struct FanOut {
    sink: Arc<dyn EventSink>,
}

impl FanOut {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Broadcast the public snapshot of `ride`, then push each delivery to
    /// its recipient's room.
    pub async fn publish(&self, ride: &Ride, deliveries: &[Delivery]) {
        let receivers = self
            .sink
            .emit_to_all(RideEvent::RideUpdated(Arc::new(ride.to_public())));
        tracing::trace!(ride_id = %ride.id, receivers, "FanOut: ride-updated broadcast");

        for delivery in deliveries {
            let event = RideEvent::Notification {
                ride_id: ride.id,
                kind: delivery.kind,
                message: delivery.message.clone(),
            };
            if !self.sink.emit_to_room(delivery.recipient, event).await {
                tracing::debug!(
                    ride_id = %ride.id,
                    recipient = %delivery.recipient,
                    kind = %delivery.kind,
                    "FanOut: recipient offline, notification dropped"
                );
            }
        }
    }

    /// Broadcast the snapshot, then hand `message` to every party of the
    /// ride except its sender.
    pub async fn publish_chat(&self, ride: &Ride, message: &RideMessage) {
        self.publish(ride, &[]).await;

        let recipients = std::iter::once(ride.creator)
            .chain(ride.participants.iter().map(|p| p.user))
            .filter(|user| *user != message.sender);
        for recipient in recipients {
            let event = RideEvent::Chat {
                ride_id: ride.id,
                message: message.into(),
            };
            if !self.sink.emit_to_room(recipient, event).await {
                tracing::debug!(
                    ride_id = %ride.id,
                    %recipient,
                    "FanOut: recipient offline, chat message dropped"
                );
            }
        }
    }
}
