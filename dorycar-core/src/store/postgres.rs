use super::{RideFilter, RideStore, StoreError, UserStore};
use crate::entities::ride::{
    GetRideById, GetRidesForUser, InsertRide, Ride, RideExists, SaveRideIfVersion, SearchRides,
};
use crate::entities::user::{GetUserById, Rating, UpdateUserRatings, UserProfile};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgRideStore {
    db: DatabaseProcessor,
}

impl PgRideStore {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl RideStore for PgRideStore {
    async fn get(&self, ride_id: Uuid) -> Result<Option<Ride>, StoreError> {
        Ok(self.db.process(GetRideById { ride_id }).await?)
    }

    async fn insert(&self, ride: &Ride) -> Result<(), StoreError> {
        self.db.process(InsertRide { ride: ride.clone() }).await?;
        Ok(())
    }

    async fn save(&self, ride: &Ride, expected_version: i64) -> Result<Ride, StoreError> {
        let saved = self
            .db
            .process(SaveRideIfVersion {
                ride: ride.clone(),
                expected_version,
            })
            .await?;
        match saved {
            Some(ride) => Ok(ride),
            None => {
                if self.db.process(RideExists { ride_id: ride.id }).await? {
                    Err(StoreError::Conflict)
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }

    async fn find(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
        Ok(self
            .db
            .process(SearchRides {
                filter: filter.clone(),
            })
            .await?)
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, StoreError> {
        Ok(self.db.process(GetRidesForUser { user_id }).await?)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: DatabaseProcessor,
}

impl PgUserStore {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.db.process(GetUserById { user_id }).await?)
    }

    async fn save_ratings(
        &self,
        user_id: Uuid,
        ratings: &[Rating],
        average_rating: f64,
    ) -> Result<(), StoreError> {
        let found = self
            .db
            .process(UpdateUserRatings {
                user_id,
                ratings: ratings.to_vec(),
                average_rating,
            })
            .await?;
        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}
