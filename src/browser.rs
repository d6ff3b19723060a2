use std::time::Duration;

use serde::Deserialize;

use crate::conn::Connection;
use crate::error::{AuditError, Result};

/// How long to sleep between attempts while the browser is still starting.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Where to find the browser's DevTools endpoint and how long to keep
/// knocking before giving up.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub host: String,
    pub port: u16,
    /// Connection-refused attempts against `/json/version` before startup
    /// is declared failed.
    pub connect_retries: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
            connect_retries: 600,
        }
    }
}

/// The browser's answer to `GET /json/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// Fetch the version metadata over the sidecar HTTP endpoint, retrying while
/// the browser is not up yet.
pub async fn fetch_version(config: &BrowserConfig) -> Result<VersionInfo> {
    let url = format!("http://{}:{}/json/version", config.host, config.port);
    let client = reqwest::Client::new();
    let mut attempts = 0u64;
    loop {
        match client.get(&url).send().await {
            Ok(resp) => return Ok(resp.error_for_status()?.json().await?),
            Err(err) if err.is_connect() => {
                attempts += 1;
                if attempts >= config.connect_retries {
                    return Err(AuditError::BrowserUnreachable(attempts));
                }
                tracing::debug!(%url, attempts, "browser not reachable yet");
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Handshake with the browser and open the multiplexed websocket, returning
/// the connection together with the version metadata (the user agent ends up
/// on the audit session).
pub async fn connect(config: &BrowserConfig) -> Result<(Connection, VersionInfo)> {
    let version = fetch_version(config).await?;
    let ws_url = version
        .web_socket_debugger_url
        .clone()
        .ok_or(AuditError::MalformedHandshake)?;
    tracing::info!(browser = %version.browser, %ws_url, "connecting");
    let conn = Connection::connect(&ws_url).await?;
    Ok((conn, version))
}
