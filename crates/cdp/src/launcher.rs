//! Headless Chrome launch and DevTools endpoint discovery.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CdpError, Result};

/// User agent presented by the automated browser; some portals reject
/// obvious headless defaults.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// `/json/version` response subset.
#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
    #[serde(rename = "Browser")]
    pub browser: Option<String>,
}

/// One entry of `/json/list`.
#[derive(Debug, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// Locates a Chrome/Chromium executable.
///
/// `COURTSNIPE_CHROME` overrides discovery; otherwise well-known names
/// and paths are tried in order.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(path) = std::env::var("COURTSNIPE_CHROME") {
        if std::path::Path::new(&path).exists() {
            return Some(path);
        }
    }

    let candidates: Vec<String> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    } else {
        vec![
            "google-chrome-stable",
            "google-chrome",
            "chromium-browser",
            "chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    };

    for candidate in candidates {
        if candidate.starts_with('/') {
            if std::path::Path::new(&candidate).exists() {
                return Some(candidate);
            }
        } else if which::which(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    None
}

/// Picks a port the kernel reports as free on localhost.
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Spawns a headless Chrome with remote debugging on `port`.
pub fn spawn_chrome(port: u16) -> Result<Child> {
    let chrome_path = find_chrome_executable().ok_or_else(|| {
        CdpError::Launch(
            "could not find a Chrome/Chromium executable; \
             install one or set COURTSNIPE_CHROME"
                .into(),
        )
    })?;

    debug!(target = "cdp.launcher", path = %chrome_path, port, "spawning browser");

    let mut cmd = Command::new(&chrome_path);
    cmd.args([
        "--headless=new".to_string(),
        format!("--remote-debugging-port={port}"),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-gpu".to_string(),
        format!("--user-agent={USER_AGENT}"),
        "about:blank".to_string(),
    ])
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null());

    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    cmd.spawn()
        .map_err(|e| CdpError::Launch(format!("failed to spawn {chrome_path}: {e}")))
}

/// Polls `/json/version` until the debugging endpoint answers.
pub async fn wait_for_endpoint(port: u16, child: &mut Child) -> Result<VersionInfo> {
    let client = http_client()?;
    let url = format!("http://127.0.0.1:{port}/json/version");
    let max_attempts = 25;
    let mut last_error = "endpoint not reachable".to_string();

    for _ in 0..max_attempts {
        tokio::time::sleep(Duration::from_millis(200)).await;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(CdpError::Launch(format!(
                "browser exited before the debugging endpoint came up (status: {status})"
            )));
        }

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                return response
                    .json::<VersionInfo>()
                    .await
                    .map_err(|e| CdpError::Http(format!("bad /json/version payload: {e}")));
            }
            Ok(response) => last_error = format!("unexpected status {}", response.status()),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(CdpError::Http(format!(
        "debugging endpoint on port {port} never became ready: {last_error}"
    )))
}

/// Returns the WebSocket URL of the default page target.
pub async fn page_target(port: u16) -> Result<String> {
    let client = http_client()?;
    let url = format!("http://127.0.0.1:{port}/json/list");

    let targets: Vec<TargetInfo> = client
        .get(&url)
        .send()
        .await
        .map_err(|e| CdpError::Http(e.to_string()))?
        .json()
        .await
        .map_err(|e| CdpError::Http(format!("bad /json/list payload: {e}")))?;

    targets
        .into_iter()
        .find(|t| t.kind == "page")
        .and_then(|t| t.web_socket_debugger_url)
        .ok_or_else(|| CdpError::Http("no page target with a debugger URL".into()))
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(800))
        .build()
        .map_err(|e| CdpError::Http(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_is_bindable() {
        let port = free_port().unwrap();
        assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn target_list_parses() {
        let json = r#"[
            {"id": "T1", "type": "page",
             "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/T1"},
            {"id": "T2", "type": "service_worker"}
        ]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].kind, "page");
        assert!(targets[1].web_socket_debugger_url.is_none());
    }

    #[test]
    fn version_info_parses() {
        let json = r#"{"Browser": "Chrome/135.0.0.0",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"}"#;
        let info: VersionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.browser.as_deref(), Some("Chrome/135.0.0.0"));
        assert!(info.web_socket_debugger_url.starts_with("ws://"));
    }
}
