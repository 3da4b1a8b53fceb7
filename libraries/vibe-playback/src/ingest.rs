//! Device state normalization
//!
//! Turns the loosely-typed state object a device reports into a
//! [`PlaybackSnapshot`].

use crate::device::{DeviceState, DeviceTrack};
use crate::types::{PlaybackSnapshot, TrackMetadata};

/// Normalize a device report into a snapshot
///
/// Duration comes from the top-level field, falling back to the current
/// track's own duration when the former is missing or zero. Missing numbers
/// become 0; a missing or empty track URI yields no track id.
pub fn normalize(state: &DeviceState) -> PlaybackSnapshot {
    let current = state.track_window.current_track.as_ref();

    let duration_ms = state
        .duration
        .filter(|duration| *duration > 0)
        .or_else(|| current.and_then(|track| track.duration_ms))
        .unwrap_or(0);

    PlaybackSnapshot {
        track_id: current
            .map(|track| track.uri.clone())
            .filter(|uri| !uri.is_empty()),
        duration_ms,
        position_ms: state.position.unwrap_or(0),
        paused: state.paused,
        track: current.map(track_metadata).unwrap_or_default(),
    }
}

fn track_metadata(track: &DeviceTrack) -> TrackMetadata {
    TrackMetadata {
        title: track.name.clone(),
        artists: track
            .artists
            .iter()
            .map(|artist| artist.name.clone())
            .collect(),
        album: track.album.name.clone(),
        artwork_url: track
            .album
            .images
            .first()
            .map(|image| image.url.clone())
            .filter(|url| !url.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceAlbum, DeviceArtist, DeviceImage, TrackWindow};

    fn track(uri: &str, duration_ms: Option<u64>) -> DeviceTrack {
        DeviceTrack {
            uri: uri.to_string(),
            id: None,
            name: "Intro".to_string(),
            duration_ms,
            album: DeviceAlbum {
                name: "xx".to_string(),
                images: vec![DeviceImage {
                    url: "https://img/xx".to_string(),
                }],
            },
            artists: vec![
                DeviceArtist {
                    name: "The xx".to_string(),
                    uri: None,
                },
                DeviceArtist {
                    name: "Guest".to_string(),
                    uri: None,
                },
            ],
        }
    }

    fn state(duration: Option<u64>, current: Option<DeviceTrack>) -> DeviceState {
        DeviceState {
            paused: false,
            position: Some(4_000),
            duration,
            track_window: TrackWindow {
                current_track: current,
                ..TrackWindow::default()
            },
        }
    }

    #[test]
    fn top_level_duration_wins() {
        let snapshot = normalize(&state(Some(180_000), Some(track("t:1", Some(200_000)))));
        assert_eq!(snapshot.duration_ms, 180_000);
        assert_eq!(snapshot.position_ms, 4_000);
        assert_eq!(snapshot.track_id.as_deref(), Some("t:1"));
    }

    #[test]
    fn duration_falls_back_to_current_track() {
        let snapshot = normalize(&state(None, Some(track("t:1", Some(200_000)))));
        assert_eq!(snapshot.duration_ms, 200_000);

        let snapshot = normalize(&state(Some(0), Some(track("t:1", Some(200_000)))));
        assert_eq!(snapshot.duration_ms, 200_000);
    }

    #[test]
    fn missing_duration_is_zero() {
        let snapshot = normalize(&state(None, Some(track("t:1", None))));
        assert_eq!(snapshot.duration_ms, 0);

        let snapshot = normalize(&state(None, None));
        assert_eq!(snapshot.duration_ms, 0);
    }

    #[test]
    fn missing_track_yields_empty_metadata() {
        let snapshot = normalize(&state(Some(1_000), None));
        assert_eq!(snapshot.track_id, None);
        assert_eq!(snapshot.track, TrackMetadata::default());

        let snapshot = normalize(&state(Some(1_000), Some(track("", None))));
        assert_eq!(snapshot.track_id, None);
    }

    #[test]
    fn metadata_is_passed_through() {
        let snapshot = normalize(&state(Some(1_000), Some(track("t:1", None))));
        assert_eq!(snapshot.track.title, "Intro");
        assert_eq!(snapshot.track.artists, vec!["The xx", "Guest"]);
        assert_eq!(snapshot.track.primary_artist(), "The xx");
        assert_eq!(snapshot.track.album, "xx");
        assert_eq!(snapshot.track.artwork_url.as_deref(), Some("https://img/xx"));
    }

    #[test]
    fn missing_position_is_zero() {
        let mut raw = state(Some(1_000), None);
        raw.position = None;
        raw.paused = true;
        let snapshot = normalize(&raw);
        assert_eq!(snapshot.position_ms, 0);
        assert!(snapshot.paused);
    }
}
