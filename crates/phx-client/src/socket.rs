//! WebSocket transport backed by `tokio-tungstenite`.
//!
//! Ping/pong and close mechanics stay inside tungstenite; the halves here
//! only carry JSON text frames. [`dial`] splits one physical connection into
//! a [`WsSink`] for the shared write path and a [`WsSource`] for the
//! dispatch loop.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::error::SocketError;
use crate::message::Message;
use crate::transport::{TransportSink, TransportStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a live WebSocket connection.
pub struct WsSink {
    inner: SplitSink<WsStream, tungstenite::Message>,
}

/// Read half of a live WebSocket connection.
pub struct WsSource {
    inner: SplitStream<WsStream>,
}

/// Dial `endpoint` with `params` appended as a query string, then split the
/// socket into its write and read halves.
pub async fn dial(
    endpoint: &str,
    params: &HashMap<String, String>,
) -> Result<(WsSink, WsSource), SocketError> {
    let url = build_url(endpoint, params)?;
    let (ws, _) = connect_async(url.as_str())
        .await
        .map_err(|e| SocketError::ConnectFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
    let (tx, rx) = ws.split();
    Ok((WsSink { inner: tx }, WsSource { inner: rx }))
}

/// Append query parameters to the endpoint URL.
fn build_url(endpoint: &str, params: &HashMap<String, String>) -> Result<String, SocketError> {
    let mut url = url::Url::parse(endpoint).map_err(|e| SocketError::Config {
        reason: format!("endpoint url '{endpoint}': {e}"),
    })?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            let _ = pairs.append_pair(key, value);
        }
    }
    Ok(url.into())
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send(&mut self, message: Message) -> Result<(), SocketError> {
        let json = serde_json::to_string(&message).map_err(|e| SocketError::Transport {
            context: format!("encode frame: {e}"),
        })?;
        self.inner
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|e| SocketError::Transport {
                context: format!("write frame: {e}"),
            })
    }
}

#[async_trait]
impl TransportStream for WsSource {
    async fn receive(&mut self) -> Result<Message, SocketError> {
        loop {
            let frame = self
                .inner
                .next()
                .await
                .ok_or_else(|| SocketError::Transport {
                    context: "connection closed".into(),
                })?
                .map_err(|e| SocketError::Transport {
                    context: format!("read frame: {e}"),
                })?;

            match frame {
                tungstenite::Message::Text(text) => match serde_json::from_str(&text) {
                    Ok(message) => return Ok(message),
                    // A frame we cannot decode is dropped, not fatal.
                    Err(e) => warn!(error = %e, "discarding undecodable frame"),
                },
                tungstenite::Message::Close(reason) => {
                    debug!(?reason, "peer closed the connection");
                    return Err(SocketError::Transport {
                        context: "closed by peer".into(),
                    });
                }
                // Ping/pong are answered by tungstenite during the read;
                // binary frames have no meaning in this protocol.
                other => debug!(frame = %kind(&other), "ignoring non-text frame"),
            }
        }
    }
}

fn kind(frame: &tungstenite::Message) -> &'static str {
    match frame {
        tungstenite::Message::Text(_) => "text",
        tungstenite::Message::Binary(_) => "binary",
        tungstenite::Message::Ping(_) => "ping",
        tungstenite::Message::Pong(_) => "pong",
        tungstenite::Message::Close(_) => "close",
        tungstenite::Message::Frame(_) => "raw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_without_params() {
        let url = build_url("ws://localhost:4000/socket/websocket", &HashMap::new()).unwrap();
        assert_eq!(url, "ws://localhost:4000/socket/websocket");
    }

    #[test]
    fn build_url_appends_params() {
        let params = HashMap::from([("user".to_owned(), "alice".to_owned())]);
        let url = build_url("ws://localhost:4000/socket/websocket", &params).unwrap();
        assert_eq!(url, "ws://localhost:4000/socket/websocket?user=alice");
    }

    #[test]
    fn build_url_escapes_param_values() {
        let params = HashMap::from([("name".to_owned(), "a b&c".to_owned())]);
        let url = build_url("ws://localhost:4000/socket", &params).unwrap();
        assert!(url.contains("name=a+b%26c"), "got: {url}");
    }

    #[test]
    fn build_url_rejects_invalid_endpoint() {
        let err = build_url("not a url", &HashMap::new()).unwrap_err();
        assert!(matches!(err, SocketError::Config { .. }));
    }
}
