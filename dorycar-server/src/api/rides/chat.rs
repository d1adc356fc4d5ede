use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use dorycar_sdk::objects::{PostMessageRequest, RideMessageResponse};
use uuid::Uuid;

use crate::api::{ApiError, AuthUser};
use crate::state::AppState;

/// `GET /{ride_id}/messages`: chat history, oldest first.
pub(super) async fn list_messages(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.engine.messages(ride_id, caller.id()).await?;
    let body: Vec<RideMessageResponse> = messages.iter().map(Into::into).collect();
    Ok(Json(body))
}

/// `POST /{ride_id}/messages`
pub(super) async fn post_message(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
    Json(body): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .engine
        .post_message(ride_id, caller.id(), &body.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RideMessageResponse::from(&message)),
    ))
}
