//! Vibe.FM - Playback Synchronization
//!
//! Keeps a smoothly moving playback clock in sync with a remote playback
//! device that only reports its state sporadically.
//!
//! This crate provides:
//! - Device session lifecycle (one-shot initialization, guaranteed teardown)
//! - Normalization of device state reports into snapshots
//! - Clock interpolation between snapshots at ~4 Hz
//! - Track-change detection driving queue refreshes
//!
//! # Architecture
//!
//! `vibe-playback` knows nothing about a concrete streaming SDK or about HTTP:
//! - The platform SDK and its devices are reached through [`DevicePlatform`]
//!   and [`PlaybackDevice`]
//! - Side effects go through [`QueueRefresher`] and [`DeviceActivator`]
//! - Display state is published as a [`PlayerView`] on a `watch` channel
//!
//! All state mutation happens on one runner task per session, which processes
//! device events and clock ticks strictly in order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vibe_playback::sim::{demo_tracks, SimulatedPlatform};
//! use vibe_playback::{Collaborators, DeviceSession, PlayerConfig, SharedToken};
//!
//! # async fn run() -> vibe_playback::Result<()> {
//! let platform = Arc::new(SimulatedPlatform::new(demo_tracks()));
//! let session = DeviceSession::new(PlayerConfig::default(), platform, Collaborators::default())?;
//!
//! session.initialize(Arc::new(SharedToken::new("token")));
//! session.toggle_play().await.ok();
//!
//! let view = session.view();
//! println!("{} {}/{}", view.track.title, view.position_label(), view.duration_label());
//!
//! session.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
mod collaborators;
pub mod device;
mod error;
pub mod ingest;
mod session;
pub mod sim;
pub mod track_change;
pub mod types;

// Public exports
pub use clock::{ClockSimulator, ClockState};
pub use collaborators::{Collaborators, DeviceActivator, QueueRefresher};
pub use device::{
    CredentialProvider, DeviceEvent, DeviceEventKind, DeviceOptions, DevicePlatform, DeviceState,
    EventSink, ListenerId, PlaybackDevice, SdkLease, SharedToken,
};
pub use error::{PlayerError, Result};
pub use session::DeviceSession;
pub use track_change::TrackChangeDetector;
pub use types::{
    format_time, PlaybackSnapshot, PlayerConfig, PlayerView, SessionState, TrackMetadata,
};
