//! Backend-backed implementations of the playback session's side effects.
//!
//! The session fires these without awaiting them, so each one spawns its
//! request onto the current tokio runtime and only logs failures.

use crate::client::VibeServerClient;
use crate::error::Result;
use crate::types::QueueResponse;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};
use vibe_playback::{DeviceActivator, QueueRefresher};

/// Keeps a local copy of the backend queue fresh.
///
/// Every refresh fetches `/spotify/queue` and publishes the result; readers
/// subscribe to the `watch` channel.
pub struct QueueSync {
    client: VibeServerClient,
    latest: Arc<watch::Sender<Option<QueueResponse>>>,
}

impl QueueSync {
    pub fn new(client: VibeServerClient) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            client,
            latest: Arc::new(latest),
        }
    }

    /// Receiver notified whenever a fetch succeeds
    pub fn subscribe(&self) -> watch::Receiver<Option<QueueResponse>> {
        self.latest.subscribe()
    }

    /// Most recently fetched queue, if any fetch has succeeded
    pub fn latest(&self) -> Option<QueueResponse> {
        self.latest.borrow().clone()
    }

    /// Fetch and publish the queue, returning it
    pub async fn refresh_now(&self) -> Result<QueueResponse> {
        fetch_into(&self.client, &self.latest).await
    }
}

async fn fetch_into(
    client: &VibeServerClient,
    latest: &watch::Sender<Option<QueueResponse>>,
) -> Result<QueueResponse> {
    let queue = client.queue().await?;
    latest.send_replace(Some(queue.clone()));
    Ok(queue)
}

impl QueueRefresher for QueueSync {
    fn refresh(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime, skipping queue refresh");
            return;
        };

        let client = self.client.clone();
        let latest = Arc::clone(&self.latest);
        runtime.spawn(async move {
            match fetch_into(&client, &latest).await {
                Ok(queue) => debug!(upcoming = queue.queue.len(), "Queue refreshed"),
                Err(e) => warn!(error = %e, "Queue refresh failed"),
            }
        });
    }
}

/// Moves backend playback onto a newly ready device.
pub struct PlaybackTransfer {
    client: VibeServerClient,
}

impl PlaybackTransfer {
    pub fn new(client: VibeServerClient) -> Self {
        Self { client }
    }
}

impl DeviceActivator for PlaybackTransfer {
    fn activate(&self, device_id: &str) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(device_id, "No tokio runtime, skipping playback transfer");
            return;
        };

        let client = self.client.clone();
        let device_id = device_id.to_string();
        runtime.spawn(async move {
            if let Err(e) = client.transfer_playback(&device_id).await {
                warn!(device_id = %device_id, error = %e, "Playback transfer failed");
            }
        });
    }
}
