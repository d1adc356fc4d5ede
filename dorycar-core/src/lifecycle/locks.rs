use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per key, created on demand and dropped when unused.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<Uuid, Slot>>,
}

/// Held for the duration of a keyed critical section.
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: Uuid,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn lock(&self, key: Uuid) -> KeyedGuard<'_> {
        let slot = Arc::clone(self.slots().entry(key).or_default());
        let guard = Arc::clone(&slot).lock_owned().await;
        KeyedGuard {
            locks: self,
            key,
            slot,
            guard: Some(guard),
        }
    }

    /// Keys with a holder or a waiter.
    pub fn active(&self) -> usize {
        self.slots().len()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.locks.slots();
        // Clones are only taken under the map lock: the map's copy plus ours
        // means nobody else holds or waits on this slot.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
