//! Main Vibe.FM backend client.

use crate::error::{Result, ServerClientError};
use crate::types::{
    ChatRequest, ChatResponse, PlayFromQueueRequest, QueueResponse, ServerConfig, TransferRequest,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the Vibe.FM backend.
///
/// Cheap to clone; clones share the HTTP connection pool and the token.
///
/// # Example
///
/// ```ignore
/// use vibe_server_client::{ServerConfig, VibeServerClient};
///
/// let client = VibeServerClient::new(ServerConfig::with_token("http://localhost:8000", token))?;
///
/// let reply = client.chat("something calm for a rainy evening").await?;
/// println!("{}", reply.message);
///
/// let queue = client.queue().await?;
/// println!("{} tracks up next", queue.queue.len());
/// ```
#[derive(Clone)]
pub struct VibeServerClient {
    http: Client,
    config: Arc<RwLock<ServerConfig>>,
}

impl VibeServerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&url).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("VibeFM/{} (CLI)", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        Ok(Self {
            http,
            config: Arc::new(RwLock::new(ServerConfig {
                url,
                access_token: config.access_token,
            })),
        })
    }

    /// Get the server URL.
    pub async fn url(&self) -> String {
        self.config.read().await.url.clone()
    }

    /// Check if the client has an access token.
    pub async fn is_authenticated(&self) -> bool {
        self.config.read().await.access_token.is_some()
    }

    /// Replace the access token used for subsequent requests.
    pub async fn set_token(&self, access_token: impl Into<String>) {
        self.config.write().await.access_token = Some(access_token.into());
    }

    /// Forget the access token.
    pub async fn clear_token(&self) {
        self.config.write().await.access_token = None;
        info!("Cleared backend token");
    }

    /// Ask the curation agent for a playlist matching `message`.
    ///
    /// The backend queues the generated tracks itself; the response only
    /// summarizes what was added.
    pub async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let request = self.post("/chat").await.json(&ChatRequest { message });
        let response: ChatResponse = self.execute(request, "chat").await?;

        if response.is_success() {
            info!(
                total_tracks = response.total_tracks.unwrap_or_default(),
                "Playlist generated"
            );
        } else {
            warn!(message = %response.message, "Playlist generation failed");
        }
        Ok(response)
    }

    /// Fetch the currently playing track and the upcoming queue.
    pub async fn queue(&self) -> Result<QueueResponse> {
        let request = self.get("/spotify/queue").await;
        let queue: QueueResponse = self.execute(request, "queue").await?;

        debug!(
            upcoming = queue.queue.len(),
            playing = queue.currently_playing.is_some(),
            "Fetched queue"
        );
        Ok(queue)
    }

    /// Start playback at position `index` of the queue.
    pub async fn play_from_queue(&self, index: usize) -> Result<()> {
        let request = self
            .post("/spotify/play_from_queue")
            .await
            .json(&PlayFromQueueRequest { index });
        self.execute::<serde_json::Value>(request, "play_from_queue")
            .await?;

        info!(index, "Started playback from queue");
        Ok(())
    }

    /// Move playback to the device identified by `device_id`.
    pub async fn transfer_playback(&self, device_id: &str) -> Result<()> {
        let request = self
            .post("/spotify/transfer")
            .await
            .json(&TransferRequest { device_id });
        self.execute::<serde_json::Value>(request, "transfer")
            .await?;

        info!(device_id, "Transferred playback");
        Ok(())
    }

    async fn get(&self, path: &str) -> RequestBuilder {
        let (url, token) = self.endpoint(path).await;
        debug!(url = %url, "GET");
        authorize(self.http.get(url), token)
    }

    async fn post(&self, path: &str) -> RequestBuilder {
        let (url, token) = self.endpoint(path).await;
        debug!(url = %url, "POST");
        authorize(self.http.post(url), token)
    }

    async fn endpoint(&self, path: &str) -> (String, Option<String>) {
        let config = self.config.read().await;
        (format!("{}{}", config.url, path), config.access_token.clone())
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ServerClientError::ServerUnreachable(e.to_string())
            } else {
                ServerClientError::Request(e)
            }
        })?;
        decode(response, what).await
    }
}

fn authorize(request: RequestBuilder, token: Option<String>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Map status codes and in-body errors, then deserialize
async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();

    if status.as_u16() == 401 {
        return Err(ServerClientError::AuthRequired);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ServerClientError::ServerError {
            status: status.as_u16(),
            message: error_text,
        });
    }

    let body: serde_json::Value = response.json().await.map_err(|e| {
        ServerClientError::ParseError(format!("Failed to parse {} response: {}", what, e))
    })?;

    // The backend reports most failures as {"error": "..."} with a 200
    if let Some(error) = body.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        warn!(endpoint = what, error = %message, "Backend reported an error");
        return Err(ServerClientError::Backend(message));
    }

    serde_json::from_value(body).map_err(|e| {
        ServerClientError::ParseError(format!("Failed to parse {} response: {}", what, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        // Valid URLs
        assert!(VibeServerClient::new(ServerConfig::new("https://example.com")).is_ok());
        assert!(VibeServerClient::new(ServerConfig::new("http://localhost:8000")).is_ok());

        // Invalid URLs
        assert!(VibeServerClient::new(ServerConfig::new("")).is_err());
        assert!(VibeServerClient::new(ServerConfig::new("not-a-url")).is_err());
        assert!(VibeServerClient::new(ServerConfig::new("ftp://example.com")).is_err());
    }

    #[tokio::test]
    async fn test_url_normalization() {
        let client =
            VibeServerClient::new(ServerConfig::new("https://example.com//")).expect("valid url");
        assert_eq!(client.url().await, "https://example.com");
    }

    #[tokio::test]
    async fn test_token_replacement() {
        let client = VibeServerClient::new(ServerConfig::new("http://localhost:8000")).unwrap();
        assert!(!client.is_authenticated().await);

        client.set_token("abc").await;
        assert!(client.is_authenticated().await);

        client.clear_token().await;
        assert!(!client.is_authenticated().await);
    }
}
