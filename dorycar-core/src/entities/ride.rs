//! The ride document and its Postgres queries.
//!
//! A ride is stored as one row. Its sub-collections (participants, chat,
//! notification log) live in JSONB columns so that every lifecycle
//! operation is persisted by a single `UPDATE`, guarded by `version`.

use crate::entities::{CommunicationPreference, ParticipantStatus, RideStatus};
use crate::framework::DatabaseProcessor;
use dorycar_sdk::objects::{
    CreateRideRequest, NotificationKind, NotificationResponse, ParticipantResponse,
    PublicRideResponse, RideMessageResponse, RidePreferences, RideResponse,
};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub creator: Uuid,
    pub origin: String,
    pub destination: String,
    pub date: OffsetDateTime,
    pub seats: i32,
    pub price: Decimal,
    pub status: RideStatus,
    pub preferences: RidePreferences,
    pub payment_methods: Vec<String>,
    pub vehicle_details: Option<String>,
    pub preferred_communication: Option<CommunicationPreference>,
    /// Insertion ordered; cascades walk it front to back.
    pub participants: Vec<Participant>,
    pub messages: Vec<RideMessage>,
    pub notifications: Vec<NotificationRecord>,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub cancellation_reason: Option<String>,
    pub created_at: OffsetDateTime,
    /// Bumped by the store on every successful save.
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: Uuid,
    pub status: ParticipantStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideMessage {
    pub sender: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

/// One targeted notification, kept on the ride so users that were offline
/// when it was pushed can still read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub user: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Creator-supplied ride details. Immutable once the ride exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub origin: String,
    pub destination: String,
    pub date: OffsetDateTime,
    pub seats: i32,
    pub price: Decimal,
    pub preferences: RidePreferences,
    pub payment_methods: Vec<String>,
    pub vehicle_details: Option<String>,
    pub preferred_communication: Option<CommunicationPreference>,
}

impl NewRide {
    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.origin.trim().is_empty() {
            return Err("origin is required".into());
        }
        if self.destination.trim().is_empty() {
            return Err("destination is required".into());
        }
        if self.seats < 1 {
            return Err("a ride needs at least one seat".into());
        }
        if self.price.is_sign_negative() {
            return Err("price cannot be negative".into());
        }
        Ok(())
    }
}

impl From<CreateRideRequest> for NewRide {
    fn from(req: CreateRideRequest) -> Self {
        Self {
            origin: req.origin.trim().to_string(),
            destination: req.destination.trim().to_string(),
            date: req.date,
            seats: req.seats,
            price: req.price,
            preferences: req.preferences,
            payment_methods: req.payment_methods,
            vehicle_details: req.vehicle_details,
            preferred_communication: req.preferred_communication.map(Into::into),
        }
    }
}

impl Ride {
    /// A fresh pending ride with no participants.
    pub fn new(id: Uuid, creator: Uuid, details: NewRide, now: OffsetDateTime) -> Self {
        Self {
            id,
            creator,
            origin: details.origin,
            destination: details.destination,
            date: details.date,
            seats: details.seats,
            price: details.price,
            status: RideStatus::Pending,
            preferences: details.preferences,
            payment_methods: details.payment_methods,
            vehicle_details: details.vehicle_details,
            preferred_communication: details.preferred_communication,
            participants: Vec::new(),
            messages: Vec::new(),
            notifications: Vec::new(),
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            version: 0,
        }
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator == user_id
    }

    /// The creator or anyone holding a participant record, whatever its status.
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.is_creator(user_id) || self.participants.iter().any(|p| p.user == user_id)
    }

    /// Users that were accepted onto this ride.
    ///
    /// Replaces the single `acceptor` of older designs: a shared ride can
    /// have several.
    pub fn acceptors(&self) -> Vec<Uuid> {
        self.participants
            .iter()
            .filter(|p| p.status.is_acceptor())
            .map(|p| p.user)
            .collect()
    }

    /// `"{origin} to {destination}"`, used in notification texts.
    pub fn route(&self) -> String {
        format!("{} to {}", self.origin, self.destination)
    }

    /// Public projection: no chat, no notification log.
    pub fn to_public(&self) -> PublicRideResponse {
        PublicRideResponse {
            ride_id: self.id,
            creator: self.creator,
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            date: self.date,
            seats: self.seats,
            price: self.price,
            status: self.status.into(),
            preferences: self.preferences,
            payment_methods: self.payment_methods.clone(),
            vehicle_details: self.vehicle_details.clone(),
            preferred_communication: self.preferred_communication.map(Into::into),
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantResponse {
                    user_id: p.user,
                    status: p.status.into(),
                    joined_at: p.joined_at.unix_timestamp(),
                })
                .collect(),
            acceptors: self.acceptors(),
            created_at: self.created_at.unix_timestamp(),
            started_at: self.started_at.map(|t| t.unix_timestamp()),
            completed_at: self.completed_at.map(|t| t.unix_timestamp()),
            cancelled_at: self.cancelled_at.map(|t| t.unix_timestamp()),
            cancellation_reason: self.cancellation_reason.clone(),
        }
    }
}

impl From<&RideMessage> for RideMessageResponse {
    fn from(m: &RideMessage) -> Self {
        RideMessageResponse {
            sender: m.sender,
            content: m.content.clone(),
            sent_at: m.sent_at.unix_timestamp(),
        }
    }
}

impl From<&NotificationRecord> for NotificationResponse {
    fn from(n: &NotificationRecord) -> Self {
        NotificationResponse {
            kind: n.kind,
            message: n.message.clone(),
            created_at: n.created_at.unix_timestamp(),
        }
    }
}

impl Ride {
    /// The ride as `viewer` may see it: chat only for parties, and only the
    /// viewer's own entries of the notification log.
    pub fn view_for(&self, viewer: Uuid) -> RideResponse {
        let messages = if self.is_party(viewer) {
            self.messages.iter().map(Into::into).collect()
        } else {
            Vec::new()
        };
        RideResponse {
            ride: self.to_public(),
            messages,
            notifications: self
                .notifications
                .iter()
                .filter(|n| n.user == viewer)
                .map(Into::into)
                .collect(),
        }
    }
}

/// Search criteria for listing rides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RideFilter {
    /// Case-insensitive substring of the origin.
    pub origin: Option<String>,
    /// Case-insensitive substring of the destination.
    pub destination: Option<String>,
    /// UTC calendar day the ride is scheduled on.
    pub day: Option<time::Date>,
    /// Empty means any status.
    pub statuses: Vec<RideStatus>,
}

impl RideFilter {
    /// Rides that can still be joined, are underway, or are about to be.
    pub fn open_statuses() -> Vec<RideStatus> {
        vec![RideStatus::Pending, RideStatus::Accepted, RideStatus::Started]
    }

    /// In-process evaluation of the filter, mirroring the SQL in [`SearchRides`].
    pub fn matches(&self, ride: &Ride) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| match needle {
            Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
            None => true,
        };
        let day_matches = match self.day {
            Some(day) => ride.date.to_offset(time::UtcOffset::UTC).date() == day,
            None => true,
        };
        contains(&ride.origin, &self.origin)
            && contains(&ride.destination, &self.destination)
            && day_matches
            && (self.statuses.is_empty() || self.statuses.contains(&ride.status))
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const RIDE_COLUMNS: &str = "id, creator, origin, destination, date, seats, price, status, \
    preferences, payment_methods, vehicle_details, preferred_communication, participants, \
    messages, notifications, started_at, completed_at, cancelled_at, cancellation_reason, \
    created_at, version";

#[derive(Debug, sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    creator: Uuid,
    origin: String,
    destination: String,
    date: OffsetDateTime,
    seats: i32,
    price: Decimal,
    status: RideStatus,
    preferences: Json<RidePreferences>,
    payment_methods: Vec<String>,
    vehicle_details: Option<String>,
    preferred_communication: Option<CommunicationPreference>,
    participants: Json<Vec<Participant>>,
    messages: Json<Vec<RideMessage>>,
    notifications: Json<Vec<NotificationRecord>>,
    started_at: Option<OffsetDateTime>,
    completed_at: Option<OffsetDateTime>,
    cancelled_at: Option<OffsetDateTime>,
    cancellation_reason: Option<String>,
    created_at: OffsetDateTime,
    version: i64,
}

impl From<RideRow> for Ride {
    fn from(row: RideRow) -> Self {
        Self {
            id: row.id,
            creator: row.creator,
            origin: row.origin,
            destination: row.destination,
            date: row.date,
            seats: row.seats,
            price: row.price,
            status: row.status,
            preferences: row.preferences.0,
            payment_methods: row.payment_methods,
            vehicle_details: row.vehicle_details,
            preferred_communication: row.preferred_communication,
            participants: row.participants.0,
            messages: row.messages.0,
            notifications: row.notifications.0,
            started_at: row.started_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            version: row.version,
        }
    }
}

/// Escape `%`, `_` and `\` so user input is matched literally by `ILIKE`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GetRideById {
    pub ride_id: Uuid,
}

impl Processor<GetRideById> for DatabaseProcessor {
    type Output = Option<Ride>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetRideById")]
    async fn process(&self, query: GetRideById) -> Result<Option<Ride>, sqlx::Error> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(query.ride_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Ride::from))
    }
}

#[derive(Debug, Clone)]
pub struct InsertRide {
    pub ride: Ride,
}

impl Processor<InsertRide> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertRide")]
    async fn process(&self, insert: InsertRide) -> Result<(), sqlx::Error> {
        let ride = insert.ride;
        sqlx::query(
            r#"
            INSERT INTO rides (
                id, creator, origin, destination, date, seats, price, status,
                preferences, payment_methods, vehicle_details, preferred_communication,
                participants, messages, notifications, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(ride.id)
        .bind(ride.creator)
        .bind(ride.origin)
        .bind(ride.destination)
        .bind(ride.date)
        .bind(ride.seats)
        .bind(ride.price)
        .bind(ride.status)
        .bind(Json(ride.preferences))
        .bind(ride.payment_methods)
        .bind(ride.vehicle_details)
        .bind(ride.preferred_communication)
        .bind(Json(ride.participants))
        .bind(Json(ride.messages))
        .bind(Json(ride.notifications))
        .bind(ride.created_at)
        .bind(ride.version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Write the mutable part of a ride if nobody saved it since it was read.
///
/// Only status, sub-collections, lifecycle timestamps and the cancellation
/// reason are written; creation details never change. Returns `None` when
/// the row is missing or its version moved on.
pub struct SaveRideIfVersion {
    pub ride: Ride,
    pub expected_version: i64,
}

impl Processor<SaveRideIfVersion> for DatabaseProcessor {
    type Output = Option<Ride>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SaveRideIfVersion")]
    async fn process(&self, cmd: SaveRideIfVersion) -> Result<Option<Ride>, sqlx::Error> {
        let ride = cmd.ride;
        let row = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            UPDATE rides
            SET status = $3,
                participants = $4,
                messages = $5,
                notifications = $6,
                started_at = $7,
                completed_at = $8,
                cancelled_at = $9,
                cancellation_reason = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(ride.id)
        .bind(cmd.expected_version)
        .bind(ride.status)
        .bind(Json(ride.participants))
        .bind(Json(ride.messages))
        .bind(Json(ride.notifications))
        .bind(ride.started_at)
        .bind(ride.completed_at)
        .bind(ride.cancelled_at)
        .bind(ride.cancellation_reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Ride::from))
    }
}

#[derive(Debug, Clone)]
pub struct RideExists {
    pub ride_id: Uuid,
}

impl Processor<RideExists> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RideExists")]
    async fn process(&self, query: RideExists) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM rides WHERE id = $1)")
            .bind(query.ride_id)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// List rides matching a [`RideFilter`], newest first.
pub struct SearchRides {
    pub filter: RideFilter,
}

impl Processor<SearchRides> for DatabaseProcessor {
    type Output = Vec<Ride>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SearchRides")]
    async fn process(&self, query: SearchRides) -> Result<Vec<Ride>, sqlx::Error> {
        let filter = query.filter;
        let mut query_builder =
            sqlx::QueryBuilder::new(format!("SELECT {RIDE_COLUMNS} FROM rides WHERE TRUE"));

        if let Some(origin) = filter.origin.as_deref() {
            query_builder
                .push(" AND origin ILIKE ")
                .push_bind(like_pattern(origin));
        }
        if let Some(destination) = filter.destination.as_deref() {
            query_builder
                .push(" AND destination ILIKE ")
                .push_bind(like_pattern(destination));
        }
        if let Some(day) = filter.day {
            let start = day.midnight().assume_utc();
            let end = start + time::Duration::days(1);
            query_builder
                .push(" AND date >= ")
                .push_bind(start)
                .push(" AND date < ")
                .push_bind(end);
        }
        if !filter.statuses.is_empty() {
            query_builder
                .push(" AND status = ANY(")
                .push_bind(filter.statuses)
                .push(")");
        }
        query_builder.push(" ORDER BY created_at DESC");

        let rows = query_builder
            .build_query_as::<RideRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Ride::from).collect())
    }
}

#[derive(Debug, Clone)]
/// Rides a user created or holds a participant record in, newest first.
pub struct GetRidesForUser {
    pub user_id: Uuid,
}

impl Processor<GetRidesForUser> for DatabaseProcessor {
    type Output = Vec<Ride>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetRidesForUser")]
    async fn process(&self, query: GetRidesForUser) -> Result<Vec<Ride>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            SELECT {RIDE_COLUMNS}
            FROM rides
            WHERE creator = $1
               OR participants @> jsonb_build_array(jsonb_build_object('user', $1::text))
            ORDER BY created_at DESC
            "#
        ))
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Ride::from).collect())
    }
}
