//! WebSocket transport for CDP messages.
//!
//! The transport is split into a boxed sender and an unbounded channel of
//! inbound messages so the connection layer (and its tests) never touch
//! the socket directly. A read task parses incoming text frames into
//! `serde_json::Value` and forwards them; the sender serializes outgoing
//! requests onto the write half.

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::error::Result;

/// Write half of a transport; object-safe so tests can substitute a fake.
#[async_trait]
pub trait TransportSender: Send + Sync {
    async fn send(&self, message: Value) -> Result<()>;
}

/// Sender plus the inbound message stream, ready to hand to a connection.
pub struct TransportParts {
    pub sender: Box<dyn TransportSender>,
    pub message_rx: mpsc::UnboundedReceiver<Value>,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

struct WebSocketSender {
    sink: Mutex<WsSink>,
}

#[async_trait]
impl TransportSender for WebSocketSender {
    async fn send(&self, message: Value) -> Result<()> {
        let text = serde_json::to_string(&message)?;
        self.sink.lock().await.send(WsMessage::Text(text)).await?;
        Ok(())
    }
}

/// Connects to a DevTools WebSocket endpoint and spawns the read loop.
///
/// The read task runs until the socket closes; non-text frames are
/// ignored and unparsable frames are logged and dropped.
pub async fn connect(ws_url: &str) -> Result<TransportParts> {
    let (stream, _) = connect_async(ws_url).await?;
    let (sink, mut source) = stream.split();
    let (message_tx, message_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(target = "cdp.transport", error = %e, "read failed, closing");
                    break;
                }
            };

            if let WsMessage::Text(text) = frame {
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        if message_tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(target = "cdp.transport", error = %e, "unparsable frame"),
                }
            }
        }
        debug!(target = "cdp.transport", "read loop ended");
    });

    Ok(TransportParts {
        sender: Box::new(WebSocketSender {
            sink: Mutex::new(sink),
        }),
        message_rx,
    })
}

pub mod fake {
    //! In-memory transport for unit testing correlation and event dispatch
    //! without a browser.

    use std::sync::Arc;

    use super::*;
    use tokio::sync::Mutex as AsyncMutex;

    pub struct FakeSender {
        sent: Arc<AsyncMutex<Vec<Value>>>,
    }

    #[async_trait]
    impl TransportSender for FakeSender {
        async fn send(&self, message: Value) -> Result<()> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    /// Injects inbound messages and inspects what the connection sent.
    pub struct FakeTransportController {
        inbound_tx: mpsc::UnboundedSender<Value>,
        sent: Arc<AsyncMutex<Vec<Value>>>,
    }

    impl FakeTransportController {
        pub fn inject(&self, message: Value) {
            let _ = self.inbound_tx.send(message);
        }

        pub fn inject_response(&self, id: u32, result: Value) {
            self.inject(serde_json::json!({ "id": id, "result": result }));
        }

        pub fn inject_error(&self, id: u32, message: &str) {
            self.inject(serde_json::json!({
                "id": id,
                "error": { "code": -32000, "message": message }
            }));
        }

        pub fn inject_event(&self, method: &str, params: Value) {
            self.inject(serde_json::json!({ "method": method, "params": params }));
        }

        pub async fn sent_messages(&self) -> Vec<Value> {
            self.sent.lock().await.clone()
        }
    }

    pub fn fake_transport() -> (TransportParts, FakeTransportController) {
        let (inbound_tx, message_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(AsyncMutex::new(Vec::new()));

        let parts = TransportParts {
            sender: Box::new(FakeSender {
                sent: Arc::clone(&sent),
            }),
            message_rx,
        };

        (parts, FakeTransportController { inbound_tx, sent })
    }
}
