//! Types for Vibe.FM backend requests and responses.

use serde::{Deserialize, Serialize};

/// Configuration for connecting to the Vibe.FM backend.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    pub url: String,
    /// Bearer token forwarded on every request, if any
    pub access_token: Option<String>,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: None,
        }
    }

    /// Create a config carrying an access token.
    pub fn with_token(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: Some(access_token.into()),
        }
    }
}

// =============================================================================
// Chat
// =============================================================================

/// Request body for the chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Result of asking the curation agent for a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// "success" or "error"
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub total_tracks: Option<u32>,
    /// First few track URIs that were queued
    #[serde(default)]
    pub playlist_preview: Vec<String>,
}

impl ChatResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Artist credit on a queued track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueArtist {
    pub name: String,
}

/// A track as reported by the playback queue endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<QueueArtist>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl QueueTrack {
    /// Artist names joined for display
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Currently playing track plus upcoming tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub currently_playing: Option<QueueTrack>,
    #[serde(default)]
    pub queue: Vec<QueueTrack>,
}

/// Request body for starting playback at a queue position.
#[derive(Debug, Serialize)]
pub struct PlayFromQueueRequest {
    pub index: usize,
}

/// Request body for moving playback to a device.
#[derive(Debug, Serialize)]
pub struct TransferRequest<'a> {
    pub device_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_error_shape() {
        let json = r#"{"status": "error", "message": "Failed to generate playlist"}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();

        assert!(!response.is_success());
        assert!(response.total_tracks.is_none());
        assert!(response.playlist_preview.is_empty());
    }

    #[test]
    fn test_queue_response_parses_platform_tracks() {
        let json = r#"{
            "currently_playing": {
                "id": "abc",
                "uri": "spotify:track:abc",
                "name": "Weightless",
                "artists": [{"name": "Marconi Union", "uri": "spotify:artist:1"}],
                "duration_ms": 480000,
                "explicit": false
            },
            "queue": [
                {"uri": "spotify:track:def", "name": "Holocene"}
            ]
        }"#;
        let response: QueueResponse = serde_json::from_str(json).unwrap();

        let current = response.currently_playing.unwrap();
        assert_eq!(current.artist_names(), "Marconi Union");
        assert_eq!(current.duration_ms, 480_000);
        assert_eq!(response.queue.len(), 1);
        assert_eq!(response.queue[0].duration_ms, 0);
        assert!(response.queue[0].artists.is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let response: QueueResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response, QueueResponse::default());
    }
}
