//! Core types for playback synchronization

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};

/// Default tick period of the clock simulator (4 Hz)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 250;

/// Longest tick period that still reads as a smoothly moving clock
pub const MAX_TICK_INTERVAL_MS: u64 = 500;

/// Display fields of the loaded track
///
/// Passed through untouched; the engine never interprets these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title
    pub title: String,

    /// Artist names, in platform order
    pub artists: Vec<String>,

    /// Album name
    pub album: String,

    /// Cover art URL (first image reported by the platform)
    pub artwork_url: Option<String>,
}

impl TrackMetadata {
    /// First artist, or an empty string
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

/// Normalized playback status at one device event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Opaque track identity (the track URI), stable across position updates
    pub track_id: Option<String>,

    /// Total track length in milliseconds
    pub duration_ms: u64,

    /// Device-reported position at event time
    pub position_ms: u64,

    /// Whether the device is paused
    pub paused: bool,

    /// Display passthrough
    pub track: TrackMetadata,
}

/// Lifecycle of the connection to the playback device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// `initialize` has not been called
    #[default]
    Uninitialized,

    /// Waiting for the SDK, the device handle, or the first live state
    Connecting,

    /// Device is reporting state and passes the liveness probe
    Active,

    /// Device exists but is not usable (not-ready, detached, or failed to connect)
    Inactive,

    /// Torn down; terminal
    Disconnected,
}

/// Downstream display state, republished on every change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub session: SessionState,
    pub is_active: bool,
    pub is_paused: bool,
    pub device_id: Option<String>,
    pub track_id: Option<String>,
    pub track: TrackMetadata,
    pub position_ms: u64,
    pub duration_ms: u64,

    /// Whether the clock simulator currently has a tick timer armed
    pub ticking: bool,
}

impl PlayerView {
    /// Initial view: paused, nothing loaded
    pub fn new() -> Self {
        Self {
            is_paused: true,
            ..Self::default()
        }
    }

    /// Position as a percentage of duration (0 when duration is unknown)
    pub fn progress_percent(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64) * 100.0
    }

    /// Position formatted as `m:ss`
    pub fn position_label(&self) -> String {
        format_time(self.position_ms)
    }

    /// Duration formatted as `m:ss`
    pub fn duration_label(&self) -> String {
        format_time(self.duration_ms)
    }
}

/// Format milliseconds as `m:ss` (seconds truncated, minutes unbounded)
pub fn format_time(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Configuration for a device session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Name the device advertises to the platform (default: "VibeFM")
    pub name: String,

    /// Initial device volume in [0.0, 1.0] (default: 0.15)
    pub volume: f32,

    /// Clock simulator tick period in milliseconds (default: 250, max: 500)
    pub tick_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "VibeFM".to_string(),
            volume: 0.15,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl PlayerConfig {
    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlayerError::InvalidConfig(
                "device name cannot be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(PlayerError::InvalidConfig(format!(
                "volume {} outside [0.0, 1.0]",
                self.volume
            )));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(PlayerError::InvalidConfig(format!(
                "tick interval {}ms outside (0, {}]",
                self.tick_interval_ms, MAX_TICK_INTERVAL_MS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.name, "VibeFM");
        assert_eq!(config.volume, 0.15);
        assert_eq!(config.tick_interval_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_slow_or_zero_tick() {
        let mut config = PlayerConfig::default();
        config.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(PlayerError::InvalidConfig(_))));

        config.tick_interval_ms = 501;
        assert!(matches!(config.validate(), Err(PlayerError::InvalidConfig(_))));

        config.tick_interval_ms = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_volume_and_name() {
        let mut config = PlayerConfig::default();
        config.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn format_time_truncates_seconds() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(9_999), "0:09");
        assert_eq!(format_time(61_500), "1:01");
        assert_eq!(format_time(3_600_000), "60:00");
    }

    #[test]
    fn progress_is_zero_without_duration() {
        let mut view = PlayerView::new();
        view.position_ms = 5_000;
        assert_eq!(view.progress_percent(), 0.0);

        view.duration_ms = 20_000;
        assert_eq!(view.progress_percent(), 25.0);
        assert_eq!(view.position_label(), "0:05");
        assert_eq!(view.duration_label(), "0:20");
    }

    #[test]
    fn new_view_is_paused_and_uninitialized() {
        let view = PlayerView::new();
        assert!(view.is_paused);
        assert!(!view.is_active);
        assert_eq!(view.session, SessionState::Uninitialized);
    }
}
