//! Browser process lifecycle and page attachment.
//!
//! The browser is a scoped resource: `launch` acquires it, `close`
//! releases it, and the call site is responsible for calling `close` on
//! every exit path. `Drop` only kills a leaked process as a last resort
//! (panic unwinding); it is not the teardown mechanism.

use std::process::Child;
use std::sync::Arc;

use tracing::{info, warn};

use crate::connection::CdpConnection;
use crate::error::Result;
use crate::launcher;
use crate::page::Page;
use crate::transport;

pub struct Browser {
    child: Option<Child>,
    port: u16,
}

impl Browser {
    /// Launches a headless browser and waits for its debugging endpoint.
    pub async fn launch() -> Result<Self> {
        let port = launcher::free_port()?;
        let mut child = launcher::spawn_chrome(port)?;

        match launcher::wait_for_endpoint(port, &mut child).await {
            Ok(version) => {
                info!(
                    target = "cdp.browser",
                    port,
                    browser = version.browser.as_deref().unwrap_or("unknown"),
                    "browser ready"
                );
                Ok(Self {
                    child: Some(child),
                    port,
                })
            }
            Err(e) => {
                // The process may be half-up; do not leave it behind.
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }

    /// Attaches to the default page target and starts its dispatch loop.
    pub async fn page(&self) -> Result<Page> {
        let ws_url = launcher::page_target(self.port).await?;
        let parts = transport::connect(&ws_url).await?;
        let (connection, event_rx) = CdpConnection::new(parts);

        let conn = Arc::clone(&connection);
        tokio::spawn(async move { conn.run().await });

        let page = Page::new(connection, event_rx);
        page.enable().await?;
        Ok(page)
    }

    /// Terminates the browser process. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!(target = "cdp.browser", port = self.port, "closing browser");
            if let Err(e) = child.kill() {
                warn!(target = "cdp.browser", error = %e, "failed to kill browser process");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        if self.child.is_some() {
            warn!(
                target = "cdp.browser",
                "browser dropped without close(); killing process"
            );
            self.close();
        }
    }
}
