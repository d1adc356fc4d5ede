//! Persistence seam for the lifecycle engine.
//!
//! The engine only sees [`RideStore`] and [`UserStore`]. Production wires the
//! Postgres implementations; tests and `--memory` mode use the in-process
//! ones, which follow the same version-check rules.

mod memory;
mod postgres;

pub use memory::{MemoryRideStore, MemoryUserStore};
pub use postgres::{PgRideStore, PgUserStore};

pub use crate::entities::ride::RideFilter;

use crate::entities::ride::Ride;
use crate::entities::user::{Rating, UserProfile};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The stored version moved on since the document was read.
    #[error("version conflict")]
    Conflict,
    #[error("record not found")]
    NotFound,
}

#[async_trait::async_trait]
pub trait RideStore: Send + Sync {
    async fn get(&self, ride_id: Uuid) -> Result<Option<Ride>, StoreError>;

    async fn insert(&self, ride: &Ride) -> Result<(), StoreError>;

    /// Persist `ride` if the stored copy is still at `expected_version`.
    ///
    /// Returns the stored document with its bumped version.
    async fn save(&self, ride: &Ride, expected_version: i64) -> Result<Ride, StoreError>;

    async fn find(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError>;

    /// Rides the user created or has a participant record in.
    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, StoreError>;
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    /// Replace the user's ratings and average. `NotFound` if the user vanished.
    async fn save_ratings(
        &self,
        user_id: Uuid,
        ratings: &[Rating],
        average_rating: f64,
    ) -> Result<(), StoreError>;
}
