use crate::config::{AuthConfig, ConfigStore};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

impl TokenError {
    pub fn reason(self) -> &'static str {
        match self {
            TokenError::Expired => "token expired",
            TokenError::InvalidSignature => "invalid signature",
            TokenError::Malformed => "malformed token",
        }
    }
}

/// Verifies access tokens against the current (reloadable) secret.
#[derive(Clone)]
pub struct TokenValidator {
    config: ConfigStore<AuthConfig>,
}

impl TokenValidator {
    pub fn new(config: ConfigStore<AuthConfig>) -> Self {
        Self { config }
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let key = {
            let config = self.config.read().await;
            DecodingKey::from_secret(config.jwt_secret.as_bytes())
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}
