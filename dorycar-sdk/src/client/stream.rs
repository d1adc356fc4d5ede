//! Real-time ride channel client.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{ClientError, endpoint};
use crate::objects::WsServerMessage;

/// A connected `GET /ws` session yielding decoded server frames.
pub struct RideEventStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RideEventStream {
    /// Open the real-time channel for the user identified by `token`.
    ///
    /// `base_url` is the same HTTP(S) root URL given to
    /// [`RideClient`](super::RideClient); its scheme is mapped to `ws`/`wss`.
    pub async fn connect(base_url: &Url, token: &str) -> Result<Self, ClientError> {
        let url = channel_url(base_url, token)?;
        let (socket, _response) = connect_async(url.as_str()).await?;
        Ok(Self { socket })
    }

    /// Wait for the next server frame.
    ///
    /// Returns `None` once the server closed the connection. Ping/pong and
    /// binary frames are skipped.
    pub async fn next_message(&mut self) -> Option<Result<WsServerMessage, ClientError>> {
        loop {
            let frame = match self.socket.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };
            match frame {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Json));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Close the channel gracefully.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}

fn channel_url(base_url: &Url, token: &str) -> Result<Url, ClientError> {
    let mut url = endpoint(base_url, "ws")?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}
