use super::RideEvent;
use crate::config::RealtimeConfig;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Transport contract the fan-out publishes through.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Send to every connected client. Returns the number of receivers.
    fn emit_to_all(&self, event: RideEvent) -> usize;

    /// Send to one private room. Returns `false` if nobody is listening.
    async fn emit_to_room(&self, room: Uuid, event: RideEvent) -> bool;
}

/// In-process broadcast hub: one global channel plus one channel per
/// connected user.
pub struct Hub {
    all: broadcast::Sender<RideEvent>,
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<RideEvent>>>,
    room_buffer: usize,
}

impl Hub {
    pub fn new(config: RealtimeConfig) -> Self {
        let (all, _) = broadcast::channel(config.broadcast_buffer.max(1));
        Self {
            all,
            rooms: RwLock::new(HashMap::new()),
            room_buffer: config.room_buffer.max(1),
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<RideEvent> {
        self.all.subscribe()
    }

    /// Join the private room of `user_id`, creating it on first use.
    ///
    /// A user with several open connections shares one room; each call
    /// returns its own receiver.
    pub async fn join(&self, user_id: Uuid) -> broadcast::Receiver<RideEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.room_buffer).0)
            .subscribe()
    }

    /// Drop the room of `user_id` if no receiver is left.
    ///
    /// Call after the connection's receiver has been dropped.
    pub async fn leave(&self, user_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if rooms
            .get(&user_id)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            rooms.remove(&user_id);
            tracing::debug!(%user_id, "Hub: room pruned");
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait::async_trait]
impl EventSink for Hub {
    fn emit_to_all(&self, event: RideEvent) -> usize {
        // Err only means nobody is connected.
        self.all.send(event).unwrap_or(0)
    }

    async fn emit_to_room(&self, room: Uuid, event: RideEvent) -> bool {
        let delivered = match self.rooms.read().await.get(&room) {
            Some(tx) => tx.send(event).is_ok(),
            None => return false,
        };
        if !delivered {
            // Every receiver went away without calling `leave`.
            self.leave(room).await;
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dorycar_sdk::objects::NotificationKind;

    fn notification(text: &str) -> RideEvent {
        RideEvent::Notification {
            ride_id: Uuid::nil(),
            kind: NotificationKind::Interest,
            message: text.into(),
        }
    }

    #[tokio::test]
    async fn test_room_delivery_is_private() {
        let hub = Hub::new(RealtimeConfig::default());
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let mut alice_rx = hub.join(alice).await;
        let mut bob_rx = hub.join(bob).await;

        assert!(hub.emit_to_room(alice, notification("hi alice")).await);
        assert_eq!(alice_rx.recv().await.unwrap(), notification("hi alice"));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_absent_room_is_dropped() {
        let hub = Hub::new(RealtimeConfig::default());
        assert!(!hub.emit_to_room(Uuid::now_v7(), notification("lost")).await);
        assert_eq!(hub.emit_to_all(notification("nobody")), 0);
    }

    #[tokio::test]
    async fn test_leave_prunes_only_empty_rooms() {
        let hub = Hub::new(RealtimeConfig::default());
        let user = Uuid::now_v7();
        let first = hub.join(user).await;
        let second = hub.join(user).await;

        drop(first);
        hub.leave(user).await;
        assert_eq!(hub.room_count().await, 1);

        drop(second);
        hub.leave(user).await;
        assert_eq!(hub.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_room_pruned_on_emit() {
        let hub = Hub::new(RealtimeConfig::default());
        let user = Uuid::now_v7();
        drop(hub.join(user).await);

        assert!(!hub.emit_to_room(user, notification("late")).await);
        assert_eq!(hub.room_count().await, 0);
    }
}
