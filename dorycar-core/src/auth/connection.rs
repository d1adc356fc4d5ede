use super::token::TokenValidator;
use crate::config::{ConfigStore, EngineConfig};
use crate::notify::{Hub, RideEvent};
use crate::store::{StoreError, UserStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Credential sources of an incoming request or WebSocket handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct Handshake<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// `token` query parameter. Browsers cannot set headers on a WebSocket
    /// handshake, so the channel accepts the token here too.
    pub query_token: Option<&'a str>,
}

impl<'a> Handshake<'a> {
    /// The bearer token, header first.
    pub fn bearer_token(&self) -> Option<&'a str> {
        let from_header = self.authorization.and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
        });
        from_header
            .or(self.query_token.map(str::trim))
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("user lookup timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Option<String>,
}

/// A live real-time session bound to one user.
///
/// Call [`leave`](Connection::leave) when the socket closes so the hub can
/// prune the private room.
pub struct Connection {
    pub user: AuthenticatedUser,
    room: broadcast::Receiver<RideEvent>,
    all: broadcast::Receiver<RideEvent>,
    hub: Arc<Hub>,
}

impl Connection {
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    /// Next event from either the private room or the global channel.
    ///
    /// Private events win when both are ready.
    pub async fn next_event(&mut self) -> Result<RideEvent, broadcast::error::RecvError> {
        tokio::select! {
            biased;
            event = self.room.recv() => event,
            event = self.all.recv() => event,
        }
    }

    pub async fn leave(self) {
        let Connection {
            user, room, all, hub,
        } = self;
        drop(room);
        drop(all);
        hub.leave(user.user_id).await;
    }
}

#[derive(Clone)]
pub struct Authenticator {
    validator: TokenValidator,
    users: Arc<dyn UserStore>,
    hub: Arc<Hub>,
    /// Supplies the storage timeout the user lookup is bounded by.
    engine: ConfigStore<EngineConfig>,
}

impl Authenticator {
    pub fn new(
        validator: TokenValidator,
        users: Arc<dyn UserStore>,
        hub: Arc<Hub>,
        engine: ConfigStore<EngineConfig>,
    ) -> Self {
        Self {
            validator,
            users,
            hub,
            engine,
        }
    }

    /// Resolve the handshake to an existing user.
    pub async fn identify(&self, handshake: Handshake<'_>) -> Result<AuthenticatedUser, AuthError> {
        let token = handshake
            .bearer_token()
            .ok_or(AuthError::Unauthenticated("missing credential"))?;
        let claims = self
            .validator
            .verify(token)
            .await
            .map_err(|e| AuthError::Unauthenticated(e.reason()))?;
        let storage_timeout = self.engine.read().await.storage_timeout;
        let user = tokio::time::timeout(storage_timeout, self.users.get(claims.user_id))
            .await
            .map_err(|_| {
                tracing::warn!(user_id = %claims.user_id, "Authenticator: user lookup timed out");
                AuthError::Timeout
            })??;
        if user.is_none() {
            return Err(AuthError::Unauthenticated("user no longer exists"));
        }
        Ok(AuthenticatedUser {
            user_id: claims.user_id,
            role: claims.role,
        })
    }

    /// Authenticate a real-time handshake and join the user's private room.
    pub async fn connect(&self, handshake: Handshake<'_>) -> Result<Connection, AuthError> {
        let user = self.identify(handshake).await?;
        let room = self.hub.join(user.user_id).await;
        let all = self.hub.subscribe_all();
        tracing::debug!(user_id = %user.user_id, "Authenticator: connection bound");
        Ok(Connection {
            user,
            room,
            all,
            hub: Arc::clone(&self.hub),
        })
    }
}
