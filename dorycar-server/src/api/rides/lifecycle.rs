use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use dorycar_sdk::objects::CancelRideRequest;
use uuid::Uuid;

use crate::api::{ApiError, AuthUser};
use crate::state::AppState;

/// `POST /{ride_id}/interest`: ask to join a ride.
pub(super) async fn express_interest(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state.engine.express_interest(ride_id, caller.id()).await?;
    Ok(Json(ride.view_for(caller.id())))
}

/// `POST /{ride_id}/accept/{user_id}`: creator accepts an interested rider.
pub(super) async fn accept_participant(
    state: State<AppState>,
    caller: AuthUser,
    Path((ride_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state
        .engine
        .accept_participant(ride_id, caller.id(), user_id)
        .await?;
    Ok(Json(ride.view_for(caller.id())))
}

/// `PUT /{ride_id}/start`
pub(super) async fn start_ride(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state.engine.start(ride_id, caller.id()).await?;
    Ok(Json(ride.view_for(caller.id())))
}

/// `PUT /{ride_id}/complete`
pub(super) async fn complete_ride(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state.engine.complete(ride_id, caller.id()).await?;
    Ok(Json(ride.view_for(caller.id())))
}

/// `PUT /{ride_id}/cancel`: the body is optional.
///
/// The creator cancels the whole ride; a rider only withdraws.
pub(super) async fn cancel_ride(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
    body: Option<Json<CancelRideRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = body.and_then(|Json(b)| b.cancellation_reason);
    let ride = state.engine.cancel(ride_id, caller.id(), reason).await?;
    Ok(Json(ride.view_for(caller.id())))
}
