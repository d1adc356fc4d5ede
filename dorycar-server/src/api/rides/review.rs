use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use dorycar_sdk::objects::SubmitReviewRequest;
use uuid::Uuid;

use crate::api::{ApiError, AuthUser};
use crate::state::AppState;

/// `POST /{ride_id}/review`: rate `to_user_id` for this ride.
///
/// Submitting again for the same ride replaces the earlier rating.
pub(super) async fn submit_review(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
    Json(body): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engine
        .submit_review(ride_id, caller.id(), body.to_user_id, body.rating, body.comment)
        .await?;
    Ok(Json(outcome))
}
