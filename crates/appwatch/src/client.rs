//! SteamCMD appinfo API client.
//!
//! Fetches the current change number for a Steam app from the public
//! `api.steamcmd.net` info endpoint. The response is large; only the
//! `_change_number` field of the requested app is read, the rest is ignored.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.steamcmd.net";

/// Timeout for a single info request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the appinfo client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no change number for app {0} in response")]
    MissingChangeNumber(String),
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    data: HashMap<String, AppInfo>,
}

#[derive(Debug, Deserialize)]
struct AppInfo {
    #[serde(rename = "_change_number")]
    change_number: Option<i64>,
}

/// SteamCMD appinfo API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client against the public SteamCMD API.
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Fetches the current change number for `app_id`.
    pub async fn change_number(&self, app_id: &str) -> Result<i64, Error> {
        let url = format!("{}/v1/info/{app_id}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let info: InfoResponse = serde_json::from_slice(&body)?;
        info.data
            .get(app_id)
            .and_then(|app| app.change_number)
            .ok_or_else(|| Error::MissingChangeNumber(app_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a mock HTTP server that responds with the given JSON body.
    async fn mock_server(body: &str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;

                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    /// Starts a mock HTTP server that responds with an error status.
    async fn mock_server_error(status: u16, body: &str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;

                let resp = format!(
                    "HTTP/1.1 {status} Error\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    #[tokio::test]
    async fn change_number_extracted_from_response() {
        let json = r#"{"status":"success","data":{"896660":{"_change_number":31964045,"common":{"name":"Valheim Dedicated Server"}}}}"#;
        let (url, handle) = mock_server(json).await;

        let client = Client::new().unwrap().with_base_url(url);
        let n = client.change_number("896660").await.unwrap();
        assert_eq!(n, 31964045);

        handle.abort();
    }

    #[tokio::test]
    async fn missing_app_in_response_is_an_error() {
        let json = r#"{"status":"success","data":{"12345":{"_change_number":1}}}"#;
        let (url, handle) = mock_server(json).await;

        let client = Client::new().unwrap().with_base_url(url);
        let err = client.change_number("896660").await.unwrap_err();
        assert!(matches!(err, Error::MissingChangeNumber(_)));

        handle.abort();
    }

    #[tokio::test]
    async fn missing_change_number_field_is_an_error() {
        let json = r#"{"status":"success","data":{"896660":{"common":{"name":"x"}}}}"#;
        let (url, handle) = mock_server(json).await;

        let client = Client::new().unwrap().with_base_url(url);
        let err = client.change_number("896660").await.unwrap_err();
        assert!(matches!(err, Error::MissingChangeNumber(_)));

        handle.abort();
    }

    #[tokio::test]
    async fn api_error_carries_status() {
        let (url, handle) = mock_server_error(503, "upstream down").await;

        let client = Client::new().unwrap().with_base_url(url);
        let err = client.change_number("896660").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("503"), "error should mention 503: {msg}");

        handle.abort();
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let (url, handle) = mock_server("not json at all").await;

        let client = Client::new().unwrap().with_base_url(url);
        let err = client.change_number("896660").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        handle.abort();
    }
}
