use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SyncError;
use crate::models::{LoginRequest, LoginResponse, Snapshot};
use crate::protocol::UpdateEvent;

/// Inbound half of a push channel. Ends when the connection closes.
pub type PushChannel = BoxStream<'static, Result<UpdateEvent, SyncError>>;

/// How a sync agent reaches the server.
pub trait SyncTransport: Send + Sync {
    fn pull_snapshot(&self) -> impl Future<Output = Result<Snapshot, SyncError>> + Send;

    fn open_channel(&self) -> impl Future<Output = Result<PushChannel, SyncError>> + Send;
}

/// HTTP snapshot pulls plus a websocket push channel.
///
/// Every request and channel handshake is bounded by `timeout`, so a server
/// that accepts connections but never answers reads as unreachable.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn ws_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|r| format!("wss://{}", r))
            .or_else(|| self.base_url.strip_prefix("http://").map(|r| format!("ws://{}", r)))
            .unwrap_or_else(|| self.base_url.clone());
        format!("{}/ws", rest)
    }

    pub async fn login(
        &self,
        username: &str,
        location: &str,
    ) -> Result<LoginResponse, SyncError> {
        let url = format!("{}/api/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&LoginRequest {
                username: username.to_string(),
                location: location.to_string(),
            })
            .send()
            .await
            .map_err(|e| SyncError::LoginRejected(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response.text().await.unwrap_or_default();
            return Err(SyncError::LoginRejected(format!("{}: {}", status, reason)));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }
}

impl SyncTransport for HttpTransport {
    async fn pull_snapshot(&self) -> Result<Snapshot, SyncError> {
        let url = format!("{}/api/snapshot", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SyncError::Poll(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Poll(format!("HTTP error: {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }

    async fn open_channel(&self) -> Result<PushChannel, SyncError> {
        let url = self.ws_url();
        let (socket, _) = tokio::time::timeout(
            self.timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await
        .map_err(|_| SyncError::ChannelUnavailable(format!("timed out connecting to {}", url)))?
        .map_err(|e| SyncError::ChannelUnavailable(e.to_string()))?;

        tracing::debug!("Push channel open at {}", url);

        let channel = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(
                    UpdateEvent::from_json(&text).map_err(|e| SyncError::Decode(e.to_string())),
                ),
                Ok(_) => None,
                Err(e) => Some(Err(SyncError::ChannelUnavailable(e.to_string()))),
            }
        });
        Ok(channel.boxed())
    }
}
