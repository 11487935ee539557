//! Operations on an attached page target.
//!
//! Element access goes through `Runtime.evaluate` with `returnByValue`,
//! which is all a scripted form login needs. Selector arguments are
//! embedded as JSON string literals so quoting cannot break the
//! generated expression.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::connection::{CdpConnection, CdpEvent};
use crate::error::{CdpError, Result};

/// One cookie from the browser jar.
#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
}

pub struct Page {
    conn: Arc<CdpConnection>,
    events: Mutex<mpsc::UnboundedReceiver<CdpEvent>>,
}

impl Page {
    pub fn new(conn: Arc<CdpConnection>, events: mpsc::UnboundedReceiver<CdpEvent>) -> Self {
        Self {
            conn,
            events: Mutex::new(events),
        }
    }

    /// Enables the Page and Runtime domains; required before events flow.
    pub async fn enable(&self) -> Result<()> {
        self.conn.send("Page.enable", json!({})).await?;
        self.conn.send("Runtime.enable", json!({})).await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let result = self.conn.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(CdpError::Protocol(format!(
                    "navigation to {url} failed: {error_text}"
                )));
            }
        }
        Ok(())
    }

    /// Evaluates `expression` and returns its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .conn
            .send(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            return Err(CdpError::Evaluate(text.to_string()));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Text content of the first match, or `None` when absent.
    pub async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({}); \
             return el ? el.textContent.trim() : null; }})()",
            js_str(selector)
        );
        Ok(self.evaluate(&expr).await?.as_str().map(str::to_string))
    }

    pub async fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) throw new Error('no element for ' + {sel}); \
             el.value = {val}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); }})()",
            sel = js_str(selector),
            val = js_str(value),
        );
        self.evaluate(&expr).await.map(|_| ())
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) throw new Error('no element for ' + {sel}); \
             el.click(); }})()",
            sel = js_str(selector),
        );
        self.evaluate(&expr).await.map(|_| ())
    }

    /// Waits for the next JavaScript dialog and accepts it.
    ///
    /// Returns the dialog's message text. Times out when no dialog opens
    /// within `timeout`.
    pub async fn accept_next_dialog(&self, timeout: Duration) -> Result<String> {
        let mut events = self.events.lock().await;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let event = tokio::time::timeout(remaining, events.recv())
                .await
                .map_err(|_| CdpError::Timeout {
                    ms: timeout.as_millis() as u64,
                    what: "JavaScript dialog".into(),
                })?
                .ok_or(CdpError::ChannelClosed)?;

            if event.method == "Page.javascriptDialogOpening" {
                let message = event.params["message"].as_str().unwrap_or_default().to_string();
                debug!(target = "cdp.page", %message, "accepting dialog");
                self.conn
                    .send("Page.handleJavaScriptDialog", json!({ "accept": true }))
                    .await?;
                return Ok(message);
            }
            // Unrelated event; keep waiting for the dialog.
        }
    }

    /// Exports the browser cookie jar.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let result = self.conn.send("Network.getCookies", json!({})).await?;
        let cookies = result
            .get("cookies")
            .cloned()
            .ok_or_else(|| CdpError::Protocol("Network.getCookies returned no cookies".into()))?;
        Ok(serde_json::from_value(cookies)?)
    }
}

/// Embeds `s` as a JavaScript string literal (JSON is a subset of JS).
fn js_str(s: &str) -> String {
    serde_json::to_string(s).expect("strings always serialize")
}
