//! Playback device control surface
//!
//! The engine never talks to a concrete player. A platform SDK is wrapped in a
//! [`DevicePlatform`] (loading, readiness, construction) and every device it
//! constructs implements [`PlaybackDevice`]. Device notifications are pushed
//! into an [`EventSink`] handed over at listener registration.

use crate::error::{PlayerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

// =============================================================================
// Raw device state
// =============================================================================

/// State object as reported by the device
///
/// Mirrors the platform's JSON shape; unknown fields are ignored and every
/// numeric field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(default)]
    pub paused: bool,

    /// Position in milliseconds
    pub position: Option<u64>,

    /// Duration in milliseconds
    pub duration: Option<u64>,

    #[serde(default)]
    pub track_window: TrackWindow,
}

/// Tracks around the playhead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWindow {
    pub current_track: Option<DeviceTrack>,

    #[serde(default)]
    pub previous_tracks: Vec<DeviceTrack>,

    #[serde(default)]
    pub next_tracks: Vec<DeviceTrack>,
}

/// A track as described by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTrack {
    #[serde(default)]
    pub uri: String,

    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub album: DeviceAlbum,

    #[serde(default)]
    pub artists: Vec<DeviceArtist>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAlbum {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub images: Vec<DeviceImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceArtist {
    #[serde(default)]
    pub name: String,

    pub uri: Option<String>,
}

// =============================================================================
// Events and listeners
// =============================================================================

/// The three notifications a device can push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceEventKind {
    Ready,
    NotReady,
    StateChanged,
}

impl DeviceEventKind {
    /// Every kind, in registration order
    pub const ALL: [DeviceEventKind; 3] = [
        DeviceEventKind::Ready,
        DeviceEventKind::NotReady,
        DeviceEventKind::StateChanged,
    ];

    /// Platform event name
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceEventKind::Ready => "ready",
            DeviceEventKind::NotReady => "not_ready",
            DeviceEventKind::StateChanged => "player_state_changed",
        }
    }
}

impl fmt::Display for DeviceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification pushed by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Device became usable
    Ready { device_id: String },

    /// Device went from usable to unusable
    NotReady { device_id: String },

    /// Playback state changed; `None` means the device stopped reporting
    StateChanged(Option<DeviceState>),
}

impl DeviceEvent {
    pub fn kind(&self) -> DeviceEventKind {
        match self {
            DeviceEvent::Ready { .. } => DeviceEventKind::Ready,
            DeviceEvent::NotReady { .. } => DeviceEventKind::NotReady,
            DeviceEvent::StateChanged(_) => DeviceEventKind::StateChanged,
        }
    }
}

/// Channel a device pushes notifications into
pub type EventSink = mpsc::UnboundedSender<DeviceEvent>;

/// Handle returned by listener registration, needed to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

// =============================================================================
// Credentials
// =============================================================================

/// Supplies the bearer token the device authenticates with
///
/// Called on demand by the device, possibly many times over the session.
/// Implementations must return their current value, not the one they held at
/// construction.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Replaceable in-memory token
#[derive(Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<String>>,
}

impl SharedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token.into())),
        }
    }

    /// Replace the token; later `token()` calls observe the new value
    pub async fn set(&self, token: impl Into<String>) {
        *self.inner.write().await = token.into();
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for SharedToken {
    async fn token(&self) -> Result<String> {
        let token = self.inner.read().await.clone();
        if token.is_empty() {
            return Err(PlayerError::Credentials("no token set".to_string()));
        }
        Ok(token)
    }
}

// =============================================================================
// Device and platform
// =============================================================================

/// Construction parameters for a device
#[derive(Clone)]
pub struct DeviceOptions {
    /// Display name advertised to the platform
    pub name: String,

    /// Initial volume in [0.0, 1.0]
    pub volume: f32,

    /// Asked for a token whenever the device needs one
    pub credentials: Arc<dyn CredentialProvider>,
}

impl fmt::Debug for DeviceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOptions")
            .field("name", &self.name)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

/// Remote-controlled playback device
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Connect to the platform; `false` when the platform refused
    async fn connect(&self) -> Result<bool>;

    async fn disconnect(&self) -> Result<()>;

    fn add_listener(&self, kind: DeviceEventKind, sink: EventSink) -> Result<ListenerId>;

    fn remove_listener(&self, kind: DeviceEventKind, id: ListenerId) -> Result<()>;

    /// Liveness probe: `None` when the device is detached from playback
    async fn get_current_state(&self) -> Result<Option<DeviceState>>;

    async fn toggle_play(&self) -> Result<()>;

    async fn previous_track(&self) -> Result<()>;

    async fn next_track(&self) -> Result<()>;
}

/// Proof that a session loaded the platform SDK and must release it
#[derive(Debug, PartialEq, Eq)]
pub struct SdkLease {
    id: u64,
}

impl SdkLease {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Platform SDK wrapper: loading, readiness, and device construction
#[async_trait]
pub trait DevicePlatform: Send + Sync {
    /// Load the SDK unless already present in this process.
    ///
    /// Returns a lease only when this call did the loading.
    fn load_sdk(&self) -> Result<Option<SdkLease>>;

    /// Resolves once the SDK signals it is ready to construct devices
    async fn sdk_ready(&self) -> Result<()>;

    fn create_device(&self, options: DeviceOptions) -> Result<Arc<dyn PlaybackDevice>>;

    fn release_sdk(&self, lease: SdkLease) -> Result<()>;
}
