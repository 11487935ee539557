//! Request/response correlation on top of the transport.
//!
//! CDP messages with an `id` are responses to our calls; messages without
//! one are events. Each call gets a sequential id and a oneshot channel;
//! the dispatch loop completes the matching channel when the browser
//! answers, and forwards events to whoever holds the event receiver.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error};

use crate::error::{CdpError, Result};
use crate::transport::{TransportParts, TransportSender};

/// Outgoing CDP call.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: u32,
    pub method: String,
    pub params: Value,
}

/// Response to a call, correlated by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: u32,
    pub result: Option<Value>,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    pub message: String,
}

/// Unsolicited event from the browser (no `id` field).
#[derive(Debug, Clone, Deserialize)]
pub struct CdpEvent {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Discriminated by presence of `id`: responses first, then events.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Message {
    Response(Response),
    Event(CdpEvent),
}

pub struct CdpConnection {
    last_id: AtomicU32,
    callbacks: Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>,
    sender: Box<dyn TransportSender>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    event_tx: mpsc::UnboundedSender<CdpEvent>,
}

impl CdpConnection {
    /// Wraps transport parts; the returned receiver carries browser events.
    pub fn new(parts: TransportParts) -> (Arc<Self>, mpsc::UnboundedReceiver<CdpEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            last_id: AtomicU32::new(0),
            callbacks: Mutex::new(HashMap::new()),
            sender: parts.sender,
            message_rx: Mutex::new(Some(parts.message_rx)),
            event_tx,
        });
        (connection, event_rx)
    }

    /// Sends a CDP call and awaits the browser's answer.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst);
        let request = Request {
            id,
            method: method.to_string(),
            params,
        };
        let payload = serde_json::to_value(&request)?;

        let (tx, rx) = oneshot::channel();
        self.callbacks.lock().await.insert(id, tx);

        // A call that never reached the wire can never be answered; its
        // entry must not linger in the map.
        if let Err(e) = self.sender.send(payload).await {
            self.callbacks.lock().await.remove(&id);
            return Err(e);
        }

        rx.await
            .map_err(|_| CdpError::ChannelClosed)
            .and_then(|result| result)
    }

    /// Runs the dispatch loop until the transport closes.
    ///
    /// Spawn this once per connection; pending calls are failed with
    /// `ChannelClosed` when the loop ends.
    pub async fn run(&self) {
        let mut message_rx = self
            .message_rx
            .lock()
            .await
            .take()
            .expect("run() can only be called once");

        while let Some(value) = message_rx.recv().await {
            match serde_json::from_value::<Message>(value.clone()) {
                Ok(message) => {
                    if let Err(e) = self.dispatch(message).await {
                        error!(target = "cdp.connection", error = %e, "dispatch failed");
                    }
                }
                Err(e) => {
                    error!(target = "cdp.connection", error = %e, message = %value, "bad message");
                }
            }
        }

        debug!(target = "cdp.connection", "message loop ended");
        self.callbacks.lock().await.clear();
    }

    async fn dispatch(&self, message: Message) -> Result<()> {
        match message {
            Message::Response(response) => {
                let callback = self
                    .callbacks
                    .lock()
                    .await
                    .remove(&response.id)
                    .ok_or_else(|| {
                        CdpError::Protocol(format!("no pending call for id={}", response.id))
                    })?;

                let result = match response.error {
                    Some(err) => Err(CdpError::Protocol(format!(
                        "{} (code {})",
                        err.message, err.code
                    ))),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };

                // Receiver may have given up waiting; that is fine.
                let _ = callback.send(result);
                Ok(())
            }
            Message::Event(event) => {
                debug!(
                    target = "cdp.connection",
                    method = %event.method,
                    "event"
                );
                let _ = self.event_tx.send(event);
                Ok(())
            }
        }
    }
}
