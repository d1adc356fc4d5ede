//! Users as seen by the ride lifecycle: profile fields that gate ride
//! creation, and the ratings other riders left for them.
//!
//! Accounts, passwords and token issuance are owned by another service. This
//! crate only reads profiles and writes the `ratings` / `average_rating`
//! columns.

use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub registration: Option<String>,
    pub seats: Option<i32>,
    pub fuel: Option<String>,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub from_user: Uuid,
    pub ride_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
    pub vehicle: Vehicle,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl UserProfile {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: None,
            gender: None,
            emergency_contact: None,
            vehicle: Vehicle::default(),
            ratings: Vec::new(),
            average_rating: 0.0,
        }
    }

    /// Profile fields that must be filled in before the user may offer a
    /// ride, in the order clients display them.
    pub fn missing_profile_fields(&self) -> Vec<String> {
        let v = &self.vehicle;
        let checks = [
            ("vehicle.type", blank(&v.kind)),
            ("vehicle.make", blank(&v.make)),
            ("vehicle.model", blank(&v.model)),
            ("vehicle.registration", blank(&v.registration)),
            ("vehicle.seats", v.seats.is_none_or(|s| s < 1)),
            ("vehicle.fuel", blank(&v.fuel)),
            ("vehicle.vin", blank(&v.vin)),
            ("phone", blank(&self.phone)),
            ("gender", blank(&self.gender)),
            ("emergencyContact", blank(&self.emergency_contact)),
        ];
        checks
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(field, _)| field.to_string())
            .collect()
    }

    /// Insert or overwrite the rating `from_user` left for this user on
    /// `ride_id`, then refresh the average. Returns `true` on overwrite.
    pub fn upsert_rating(&mut self, rating: Rating) -> bool {
        let existing = self
            .ratings
            .iter_mut()
            .find(|r| r.ride_id == rating.ride_id && r.from_user == rating.from_user);
        let updated = match existing {
            Some(slot) => {
                *slot = rating;
                true
            }
            None => {
                self.ratings.push(rating);
                false
            }
        };
        self.recompute_average();
        updated
    }

    fn recompute_average(&mut self) {
        self.average_rating = if self.ratings.is_empty() {
            0.0
        } else {
            let sum: u32 = self.ratings.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(sum) / self.ratings.len() as f64
        };
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    phone: Option<String>,
    gender: Option<String>,
    emergency_contact: Option<String>,
    vehicle: Json<Vehicle>,
    ratings: Json<Vec<Rating>>,
    average_rating: f64,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            gender: row.gender,
            emergency_contact: row.emergency_contact,
            vehicle: row.vehicle.0,
            ratings: row.ratings.0,
            average_rating: row.average_rating,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetUserById {
    pub user_id: Uuid,
}

impl Processor<GetUserById> for DatabaseProcessor {
    type Output = Option<UserProfile>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserById")]
    async fn process(&self, query: GetUserById) -> Result<Option<UserProfile>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, phone, gender, emergency_contact, vehicle, ratings, average_rating
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }
}

#[derive(Debug, Clone)]
/// Persist a user's rating list and the average derived from it.
pub struct UpdateUserRatings {
    pub user_id: Uuid,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
}

impl Processor<UpdateUserRatings> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateUserRatings")]
    async fn process(&self, cmd: UpdateUserRatings) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET ratings = $2, average_rating = $3
            WHERE id = $1
            "#,
        )
        .bind(cmd.user_id)
        .bind(Json(cmd.ratings))
        .bind(cmd.average_rating)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn rating(from: Uuid, ride: Uuid, stars: u8) -> Rating {
        Rating {
            from_user: from,
            ride_id: ride,
            rating: stars,
            comment: None,
            date: datetime!(2026-10-17 12:00 UTC),
        }
    }

    #[test]
    fn test_missing_fields_order() {
        let mut user = UserProfile::new(Uuid::now_v7(), "Ada");
        user.phone = Some("+47 555 0100".into());
        user.vehicle.kind = Some("sedan".into());
        user.vehicle.make = Some("Volvo".into());
        user.vehicle.vin = Some("   ".into());
        assert_eq!(
            user.missing_profile_fields(),
            vec![
                "vehicle.model",
                "vehicle.registration",
                "vehicle.seats",
                "vehicle.fuel",
                "vehicle.vin",
                "gender",
                "emergencyContact",
            ]
        );
    }

    #[test]
    fn test_upsert_rating_overwrites_same_ride_and_reviewer() {
        let mut user = UserProfile::new(Uuid::now_v7(), "Bo");
        let (a, b, ride) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        assert!(!user.upsert_rating(rating(a, ride, 2)));
        assert!(!user.upsert_rating(rating(b, ride, 5)));
        assert_eq!(user.average_rating, 3.5);

        assert!(user.upsert_rating(rating(a, ride, 4)));
        assert_eq!(user.ratings.len(), 2);
        assert_eq!(user.average_rating, 4.5);
    }

    #[test]
    fn test_vehicle_json_uses_type_key() {
        let vehicle: Vehicle =
            serde_json::from_str(r#"{"type":"van","seats":7,"vin":"X1"}"#).unwrap();
        assert_eq!(vehicle.kind.as_deref(), Some("van"));
        assert_eq!(vehicle.seats, Some(7));
        assert!(vehicle.make.is_none());
    }
}
