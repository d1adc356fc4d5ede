//! Ride request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::messages::RideMessageResponse;
use super::ws::NotificationKind;

/// Ride status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `dorycar-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Pending,
    Accepted,
    Started,
    Completed,
    Cancelled,
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RideStatus::Pending => write!(f, "pending"),
            RideStatus::Accepted => write!(f, "accepted"),
            RideStatus::Started => write!(f, "started"),
            RideStatus::Completed => write!(f, "completed"),
            RideStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Participant status for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Interested,
    Accepted,
    Started,
    Completed,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantStatus::Interested => write!(f, "interested"),
            ParticipantStatus::Accepted => write!(f, "accepted"),
            ParticipantStatus::Started => write!(f, "started"),
            ParticipantStatus::Completed => write!(f, "completed"),
            ParticipantStatus::Rejected => write!(f, "rejected"),
            ParticipantStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Named capability flags a creator can set on a ride.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RidePreferences {
    pub ac: bool,
    pub music: bool,
    pub luggage: bool,
    pub women_only: bool,
    pub smoking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationPreference {
    Chat,
    Call,
    Both,
}

/// Request body for `POST /api/rides`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRideRequest {
    pub origin: String,
    pub destination: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub seats: i32,
    pub price: Decimal,
    #[serde(default)]
    pub preferences: RidePreferences,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    #[serde(default)]
    pub vehicle_details: Option<String>,
    #[serde(default)]
    pub preferred_communication: Option<CommunicationPreference>,
}

/// Request body for `PUT /api/rides/{ride_id}/cancel`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRideRequest {
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

/// Query string for `GET /api/rides`.
///
/// `date` is a calendar day (`YYYY-MM-DD`, interpreted in UTC). Closed rides
/// (completed, cancelled) are only listed when `include_closed` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideSearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    /// Unix timestamp of when interest was expressed.
    pub joined_at: i64,
}

/// Ride view that any connected client may see.
///
/// This is what the global `ride-updated` broadcast carries, so it never
/// includes chat content or the per-user notification log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRideResponse {
    pub ride_id: Uuid,
    pub creator: Uuid,
    pub origin: String,
    pub destination: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub seats: i32,
    pub price: Decimal,
    pub status: RideStatus,
    pub preferences: RidePreferences,
    pub payment_methods: Vec<String>,
    pub vehicle_details: Option<String>,
    pub preferred_communication: Option<CommunicationPreference>,
    pub participants: Vec<ParticipantResponse>,
    /// Participants that were accepted (and possibly already riding).
    pub acceptors: Vec<Uuid>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancellation_reason: Option<String>,
}

/// A targeted notification as kept in the ride's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub kind: NotificationKind,
    pub message: String,
    /// Unix timestamp of when the notification was produced.
    pub created_at: i64,
}

/// Ride view returned to an authenticated caller.
///
/// `messages` is only filled for the creator and participants.
/// `notifications` only ever holds the caller's own entries, so a user that
/// was offline when they were pushed can read them back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideResponse {
    #[serde(flatten)]
    pub ride: PublicRideResponse,
    pub messages: Vec<RideMessageResponse>,
    #[serde(default)]
    pub notifications: Vec<NotificationResponse>,
}

/// Response of `GET /api/rides/mine`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyRidesResponse {
    /// Rides the caller published.
    pub created: Vec<PublicRideResponse>,
    /// Rides where the caller was accepted (accepted, started or completed).
    pub accepted: Vec<PublicRideResponse>,
    /// Every ride the caller expressed interest in, whatever happened next.
    pub interested: Vec<PublicRideResponse>,
}
