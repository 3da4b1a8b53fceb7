//! Vibe.FM Backend Client
//!
//! HTTP client library for the Vibe.FM backend API.
//!
//! # Features
//!
//! - **Chat**: Ask the curation agent for a mood playlist
//! - **Queue**: Read the playback queue and start playback from it
//! - **Transfer**: Move playback onto a freshly connected device
//! - **Session adapters**: [`QueueSync`] and [`PlaybackTransfer`] plug the
//!   backend into a `vibe_playback::DeviceSession`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vibe_playback::Collaborators;
//! use vibe_server_client::{PlaybackTransfer, QueueSync, ServerConfig, VibeServerClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VibeServerClient::new(ServerConfig::with_token("http://localhost:8000", "token"))?;
//!
//!     let reply = client.chat("late night drive").await?;
//!     println!("{}", reply.message);
//!
//!     let collaborators = Collaborators::new(
//!         Arc::new(QueueSync::new(client.clone())),
//!         Arc::new(PlaybackTransfer::new(client)),
//!     );
//!     Ok(())
//! }
//! ```

mod client;
mod collaborators;
mod error;
mod types;

pub use client::VibeServerClient;
pub use collaborators::{PlaybackTransfer, QueueSync};
pub use error::{Result, ServerClientError};
pub use types::{ChatResponse, QueueArtist, QueueResponse, QueueTrack, ServerConfig};
