use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use dorycar_core::entities::ride::{NewRide, RideFilter};
use dorycar_sdk::objects::{CreateRideRequest, MyRidesResponse, RideSearchQuery};
use time::macros::format_description;
use uuid::Uuid;

use crate::api::{ApiError, AuthUser};
use crate::state::AppState;

/// `POST /`: publish a ride. The caller becomes its creator.
pub(super) async fn create_ride(
    state: State<AppState>,
    caller: AuthUser,
    Json(body): Json<CreateRideRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state.engine.create(caller.id(), NewRide::from(body)).await?;
    Ok((StatusCode::CREATED, Json(ride.view_for(caller.id()))))
}

/// `GET /`: search rides by origin, destination and day.
pub(super) async fn search_rides(
    state: State<AppState>,
    _caller: AuthUser,
    Query(query): Query<RideSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = to_filter(query)?;
    let rides = state.engine.search(&filter).await?;
    let body: Vec<_> = rides.iter().map(|r| r.to_public()).collect();
    Ok(Json(body))
}

fn to_filter(query: RideSearchQuery) -> Result<RideFilter, ApiError> {
    let non_empty = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let day = match non_empty(query.date) {
        Some(date) => Some(
            time::Date::parse(&date, format_description!("[year]-[month]-[day]"))
                .map_err(|_| ApiError::BadRequest(format!("invalid date `{date}`, expected YYYY-MM-DD")))?,
        ),
        None => None,
    };
    Ok(RideFilter {
        origin: non_empty(query.origin),
        destination: non_empty(query.destination),
        day,
        statuses: if query.include_closed {
            Vec::new()
        } else {
            RideFilter::open_statuses()
        },
    })
}

/// `GET /mine`: rides the caller is involved in, grouped by role.
pub(super) async fn my_rides(
    state: State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let me = caller.id();
    let rides = state.engine.rides_for_user(me).await?;

    let mut response = MyRidesResponse::default();
    for ride in &rides {
        if ride.is_creator(me) {
            response.created.push(ride.to_public());
        }
        if let Some(participant) = ride.participants.iter().find(|p| p.user == me) {
            if participant.status.is_acceptor() {
                response.accepted.push(ride.to_public());
            }
            response.interested.push(ride.to_public());
        }
    }
    Ok(Json(response))
}

/// `GET /{ride_id}`: ride details.
pub(super) async fn get_ride(
    state: State<AppState>,
    caller: AuthUser,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ride = state.engine.get(ride_id).await?;
    Ok(Json(ride.view_for(caller.id())))
}
