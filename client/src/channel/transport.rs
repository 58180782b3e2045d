//! Real-time transport
//!
//! The channel speaks JSON frames through these traits. [`WsTransport`] is the
//! WebSocket implementation; tests provide scripted in-memory connections.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use shared::{ClientEvent, ServerEvent};

use crate::error::{ClientError, ClientResult};

/// Opens real-time connections
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn RealtimeConnection>>;
}

/// One open real-time connection
#[async_trait]
pub trait RealtimeConnection: Send {
    async fn send(&mut self, event: &ClientEvent) -> ClientResult<()>;

    /// Next inbound event. `None` once the peer has closed the connection;
    /// a frame that fails to decode yields `Some(Err(ClientError::Decode(_)))`.
    async fn next_event(&mut self) -> Option<ClientResult<ServerEvent>>;

    async fn close(&mut self);
}

/// WebSocket transport backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn RealtimeConnection>> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Channel(format!("connect: {}", e)))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RealtimeConnection for WsConnection {
    async fn send(&mut self, event: &ClientEvent) -> ClientResult<()> {
        let json = serde_json::to_string(event)?;
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| ClientError::Channel(format!("send: {}", e)))
    }

    async fn next_event(&mut self) -> Option<ClientResult<ServerEvent>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::from));
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue, // Binary, Ping/Pong frames handled by tungstenite
                Some(Err(e)) => return Some(Err(ClientError::Channel(format!("read: {}", e)))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}
