use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /api/rides/{ride_id}/review`.
///
/// The reviewer is the authenticated caller; `rating` must be within 1..=5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    pub to_user_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// `true` when an earlier review for the same ride was overwritten.
    pub updated: bool,
    /// The reviewed user's mean rating after this submission.
    pub average_rating: f64,
    pub rating_count: usize,
}
