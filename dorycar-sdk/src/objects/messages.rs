//! Ride chat types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /api/rides/{ride_id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideMessageResponse {
    pub sender: Uuid,
    pub content: String,
    /// Unix timestamp of when the message was posted.
    pub sent_at: i64,
}
