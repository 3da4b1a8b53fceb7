/// Playback watch loop
use crate::config::CliConfig;
use crate::error::Result;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vibe_playback::sim::{demo_tracks, SimulatedPlatform};
use vibe_playback::{Collaborators, DeviceSession, PlayerView, SessionState, SharedToken};
use vibe_server_client::{PlaybackTransfer, QueueSync, ServerConfig, VibeServerClient};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// How long to follow playback
    pub duration: Duration,

    /// Send queue refreshes and device transfers to the backend
    pub backend: bool,
}

/// One display line for `view`
pub fn render(view: &PlayerView) -> String {
    match view.session {
        SessionState::Uninitialized | SessionState::Connecting => "Connecting...".to_string(),
        SessionState::Disconnected => "Disconnected".to_string(),
        _ if view.track_id.is_none() => "Nothing playing".to_string(),
        _ => {
            let mut line = format!(
                "{} — {}  {} / {}",
                view.track.title,
                view.track.primary_artist(),
                view.position_label(),
                view.duration_label()
            );
            if view.is_paused {
                line.push_str("  [paused]");
            }
            if !view.is_active {
                line.push_str("  [inactive]");
            }
            line
        }
    }
}

/// Follow a simulated device for `options.duration`, writing each distinct
/// display line to `out`
pub async fn watch(config: &CliConfig, options: &WatchOptions, mut out: impl Write) -> Result<()> {
    let collaborators = if options.backend {
        let client = VibeServerClient::new(ServerConfig {
            url: config.server.url.clone(),
            access_token: config.server.token.clone(),
        })?;
        Collaborators::new(
            Arc::new(QueueSync::new(client.clone())),
            Arc::new(PlaybackTransfer::new(client)),
        )
    } else {
        Collaborators::new(
            Arc::new(|| tracing::info!("Track changed")),
            Arc::new(|device_id: &str| tracing::info!(device_id, "Device ready")),
        )
    };

    let platform = Arc::new(SimulatedPlatform::new(demo_tracks()));
    let session = DeviceSession::new(config.player.clone(), platform, collaborators)?;
    let token = config.server.token.clone().unwrap_or_else(|| "simulated".to_string());
    session.initialize(Arc::new(SharedToken::new(token)));

    let mut view = session.subscribe();
    let deadline = Instant::now() + options.duration;
    let mut last_line = String::new();

    loop {
        let line = render(&view.borrow_and_update());
        if line != last_line {
            writeln!(out, "{}", line)?;
            last_line = line;
        }

        tokio::select! {
            () = tokio::time::sleep_until(deadline) => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    session.teardown().await;
    writeln!(out, "{}", render(&session.view()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_playback::TrackMetadata;

    fn playing_view() -> PlayerView {
        PlayerView {
            session: SessionState::Active,
            is_active: true,
            is_paused: false,
            track_id: Some("sim:track:1".to_string()),
            track: TrackMetadata {
                title: "Weightless".to_string(),
                artists: vec!["Marconi Union".to_string()],
                ..TrackMetadata::default()
            },
            position_ms: 65_000,
            duration_ms: 480_000,
            ..PlayerView::new()
        }
    }

    #[test]
    fn test_render_playing() {
        assert_eq!(
            render(&playing_view()),
            "Weightless — Marconi Union  1:05 / 8:00"
        );
    }

    #[test]
    fn test_render_flags() {
        let view = PlayerView {
            is_paused: true,
            is_active: false,
            session: SessionState::Inactive,
            ..playing_view()
        };
        assert_eq!(
            render(&view),
            "Weightless — Marconi Union  1:05 / 8:00  [paused]  [inactive]"
        );
    }

    #[test]
    fn test_render_states() {
        assert_eq!(render(&PlayerView::new()), "Connecting...");

        let idle = PlayerView {
            session: SessionState::Inactive,
            ..PlayerView::new()
        };
        assert_eq!(render(&idle), "Nothing playing");

        let gone = PlayerView {
            session: SessionState::Disconnected,
            ..playing_view()
        };
        assert_eq!(render(&gone), "Disconnected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_follows_simulated_playback() {
        let options = WatchOptions {
            duration: Duration::from_secs(3),
            backend: false,
        };
        let mut out = Vec::new();

        watch(&CliConfig::default(), &options, &mut out)
            .await
            .unwrap();

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.contains(&"Weightless — Marconi Union  0:00 / 0:30"));
        assert!(lines.contains(&"Weightless — Marconi Union  0:02 / 0:30"));
        assert_eq!(lines.last(), Some(&"Disconnected"));
    }
}
