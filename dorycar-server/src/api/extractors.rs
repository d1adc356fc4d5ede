//! Custom Axum extractors for API authentication.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use dorycar_core::auth::{AuthenticatedUser, Handshake};

use super::ApiError;
use crate::state::AppState;

/// The caller, resolved from an `Authorization: Bearer <jwt>` header.
///
/// Rejects with 401 when the header is missing, the token does not verify,
/// or the user it names no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

impl AuthUser {
    pub fn id(&self) -> uuid::Uuid {
        self.0.user_id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let user = state
            .authenticator
            .identify(Handshake {
                authorization,
                query_token: None,
            })
            .await?;
        Ok(AuthUser(user))
    }
}
