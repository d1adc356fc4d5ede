use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dorycar_core::auth::AuthError;
use dorycar_core::lifecycle::{ErrorClass, RideError};
use dorycar_sdk::objects::ErrorBody;

/// Errors returned by API handlers, rendered as an [`ErrorBody`].
#[derive(Debug)]
pub enum ApiError {
    Ride(RideError),
    Unauthenticated(&'static str),
    BadRequest(String),
    /// Logged, then masked as "internal server error".
    Internal(String),
}

impl From<RideError> for ApiError {
    fn from(err: RideError) -> Self {
        ApiError::Ride(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(reason) => ApiError::Unauthenticated(reason),
            AuthError::Storage(e) => ApiError::Internal(e.to_string()),
            AuthError::Timeout => ApiError::Ride(RideError::Timeout),
        }
    }
}

fn status_of(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Forbidden => StatusCode::FORBIDDEN,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
        ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Ride(RideError::Storage(e)) => {
                tracing::error!(error = %e, "Ride API storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("internal server error"),
                )
            }
            ApiError::Ride(err) => {
                let status = status_of(err.class());
                let message = err.to_string();
                match err {
                    RideError::IncompleteProfile { missing_fields } => (
                        status,
                        ErrorBody::new(message).with_missing_fields(missing_fields),
                    ),
                    _ => (status, ErrorBody::new(message)),
                }
            }
            ApiError::Unauthenticated(reason) => (StatusCode::UNAUTHORIZED, ErrorBody::new(reason)),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::new(message)),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Ride API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("internal server error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
