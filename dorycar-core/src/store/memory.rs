//! In-process stores backed by `tokio::sync::RwLock<HashMap>`.

use super::{RideFilter, RideStore, StoreError, UserStore};
use crate::entities::ride::Ride;
use crate::entities::user::{Rating, UserProfile};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRideStore {
    rides: RwLock<HashMap<Uuid, Ride>>,
}

impl MemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut rides: Vec<Ride>) -> Vec<Ride> {
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rides
    }
}

#[async_trait::async_trait]
impl RideStore for MemoryRideStore {
    async fn get(&self, ride_id: Uuid) -> Result<Option<Ride>, StoreError> {
        Ok(self.rides.read().await.get(&ride_id).cloned())
    }

    async fn insert(&self, ride: &Ride) -> Result<(), StoreError> {
        self.rides.write().await.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn save(&self, ride: &Ride, expected_version: i64) -> Result<Ride, StoreError> {
        let mut rides = self.rides.write().await;
        let stored = rides.get_mut(&ride.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict);
        }
        let mut next = ride.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
        let rides = self.rides.read().await;
        Ok(Self::newest_first(
            rides.values().filter(|r| filter.matches(r)).cloned().collect(),
        ))
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, StoreError> {
        let rides = self.rides.read().await;
        Ok(Self::newest_first(
            rides.values().filter(|r| r.is_party(user_id)).cloned().collect(),
        ))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserProfile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a profile. Profiles are owned elsewhere in production,
    /// so this has no counterpart on [`UserStore`].
    pub async fn insert_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn save_ratings(
        &self,
        user_id: Uuid,
        ratings: &[Rating],
        average_rating: f64,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.ratings = ratings.to_vec();
        user.average_rating = average_rating;
        Ok(())
    }
}
