//! HTTP and WebSocket clients for the Dorycar API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod rides;
mod stream;

pub use rides::RideClient;
pub use stream::RideEventStream;

use reqwest::StatusCode;

use crate::objects::ErrorBody;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, message: {}", .body.message)]
    Api { status: StatusCode, body: ErrorBody },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The base URL scheme cannot be mapped to a WebSocket scheme.
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    /// The real-time channel failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    /// Missing fields reported by the server when ride creation was refused
    /// because of an incomplete profile.
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            ClientError::Api { body, .. } => body.missing_fields.as_deref(),
            _ => None,
        }
    }
}

/// Resolve the relative `path` below `base`, keeping any path prefix the
/// base URL carries even when it lacks a trailing slash.
fn endpoint(base: &url::Url, path: &str) -> Result<url::Url, url::ParseError> {
    if base.path().ends_with('/') {
        return base.join(path);
    }
    let mut dir = base.clone();
    dir.set_path(&format!("{}/", base.path()));
    dir.join(path)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody::new(text));
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
