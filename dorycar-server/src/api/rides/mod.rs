//! Ride API handlers.
//!
//! Every endpoint requires `Authorization: Bearer <jwt>`.
//!
//! # Endpoints
//!
//! - `POST /`                         – publish a ride
//! - `GET  /`                         – search rides
//! - `GET  /mine`                     – rides the caller created, joined or asked to join
//! - `GET  /{ride_id}`                – ride details
//! - `POST /{ride_id}/interest`       – ask to join
//! - `POST /{ride_id}/accept/{user_id}` – accept an interested rider
//! - `PUT  /{ride_id}/start`          – start the ride
//! - `PUT  /{ride_id}/complete`       – complete the ride
//! - `PUT  /{ride_id}/cancel`         – cancel (creator) or withdraw (rider)
//! - `POST /{ride_id}/review`         – rate another user on this ride
//! - `GET  /{ride_id}/messages`       – chat history
//! - `POST /{ride_id}/messages`       – post a chat message

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

mod chat;
mod lifecycle;
mod listing;
mod review;

/// Build the ride API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(listing::create_ride).get(listing::search_rides))
        .route("/mine", get(listing::my_rides))
        .route("/{ride_id}", get(listing::get_ride))
        .route("/{ride_id}/interest", post(lifecycle::express_interest))
        .route(
            "/{ride_id}/accept/{user_id}",
            post(lifecycle::accept_participant),
        )
        .route("/{ride_id}/start", put(lifecycle::start_ride))
        .route("/{ride_id}/complete", put(lifecycle::complete_ride))
        .route("/{ride_id}/cancel", put(lifecycle::cancel_ride))
        .route("/{ride_id}/review", post(review::submit_review))
        .route(
            "/{ride_id}/messages",
            get(chat::list_messages).post(chat::post_message),
        )
}
