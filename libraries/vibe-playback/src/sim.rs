//! In-memory playback platform
//!
//! A local stand-in for a streaming platform SDK: it plays a fixed track list
//! against the tokio clock and pushes the same notifications a remote device
//! would. Used by tests and by the command-line `watch` mode.

use crate::device::{
    DeviceAlbum, DeviceArtist, DeviceEvent, DeviceEventKind, DeviceOptions, DevicePlatform,
    DeviceState, DeviceTrack, EventSink, ListenerId, PlaybackDevice, SdkLease, TrackWindow,
};
use crate::error::{PlayerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

/// A track in the simulated catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTrack {
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
}

impl SimTrack {
    pub fn new(uri: &str, title: &str, artist: &str, duration_ms: u64) -> Self {
        Self {
            uri: uri.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            duration_ms,
        }
    }

    fn to_device_track(&self) -> DeviceTrack {
        DeviceTrack {
            uri: self.uri.clone(),
            id: self.uri.rsplit(':').next().map(str::to_string),
            name: self.title.clone(),
            duration_ms: Some(self.duration_ms),
            album: DeviceAlbum::default(),
            artists: vec![DeviceArtist {
                name: self.artist.clone(),
                uri: None,
            }],
        }
    }
}

/// Short built-in catalogue
pub fn demo_tracks() -> Vec<SimTrack> {
    vec![
        SimTrack::new("sim:track:1", "Weightless", "Marconi Union", 30_000),
        SimTrack::new("sim:track:2", "Holocene", "Bon Iver", 25_000),
        SimTrack::new("sim:track:3", "Teardrop", "Massive Attack", 20_000),
    ]
}

// =============================================================================
// Platform
// =============================================================================

/// Simulated platform SDK
pub struct SimulatedPlatform {
    tracks: Vec<SimTrack>,
    sdk_loaded: AtomicBool,
    next_lease: AtomicU64,
    ready: watch::Sender<bool>,
    constructed: AtomicUsize,
    released: AtomicUsize,
    devices: Mutex<Vec<Arc<SimulatedDevice>>>,
    refuse_connect: AtomicBool,
}

impl SimulatedPlatform {
    /// Platform whose SDK is ready immediately
    pub fn new(tracks: Vec<SimTrack>) -> Self {
        let platform = Self::gated(tracks);
        platform.open_gate();
        platform
    }

    /// Platform whose SDK stays not-ready until [`open_gate`](Self::open_gate)
    pub fn gated(tracks: Vec<SimTrack>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            tracks,
            sdk_loaded: AtomicBool::new(false),
            next_lease: AtomicU64::new(1),
            ready,
            constructed: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            devices: Mutex::new(Vec::new()),
            refuse_connect: AtomicBool::new(false),
        }
    }

    /// Signal SDK readiness
    pub fn open_gate(&self) {
        self.ready.send_replace(true);
    }

    /// Make every later `connect` report refusal
    pub fn refuse_connections(&self) {
        self.refuse_connect.store(true, Ordering::SeqCst);
    }

    /// Devices constructed so far
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// SDK leases released so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn sdk_loaded(&self) -> bool {
        self.sdk_loaded.load(Ordering::SeqCst)
    }

    /// Most recently constructed device
    pub fn last_device(&self) -> Option<Arc<SimulatedDevice>> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl DevicePlatform for SimulatedPlatform {
    fn load_sdk(&self) -> Result<Option<SdkLease>> {
        if self.sdk_loaded.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        let id = self.next_lease.fetch_add(1, Ordering::SeqCst);
        debug!(lease = id, "Simulated SDK loaded");
        Ok(Some(SdkLease::new(id)))
    }

    async fn sdk_ready(&self) -> Result<()> {
        let mut ready = self.ready.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PlayerError::SdkUnavailable("simulated SDK dropped".to_string()))
    }

    fn create_device(&self, options: DeviceOptions) -> Result<Arc<dyn PlaybackDevice>> {
        let index = self.constructed.fetch_add(1, Ordering::SeqCst) + 1;
        let device = Arc::new(SimulatedDevice::new(
            format!("sim-device-{index}"),
            options,
            self.tracks.clone(),
            self.refuse_connect.load(Ordering::SeqCst),
        ));
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&device));
        Ok(device)
    }

    fn release_sdk(&self, lease: SdkLease) -> Result<()> {
        debug!(lease = lease.id(), "Simulated SDK released");
        self.sdk_loaded.store(false, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Device
// =============================================================================

/// Simulated playback device
pub struct SimulatedDevice {
    device_id: String,
    options: DeviceOptions,
    tracks: Vec<SimTrack>,
    refuse_connect: bool,
    state: Mutex<SimState>,
}

struct SimState {
    listeners: HashMap<ListenerId, (DeviceEventKind, EventSink)>,
    next_listener: u64,
    connected: bool,
    attached: bool,
    index: usize,
    paused: bool,
    base_position_ms: u64,
    base_instant: Instant,
    token_requests: usize,
}

impl SimState {
    fn position_ms(&self, tracks: &[SimTrack]) -> u64 {
        let duration = tracks.get(self.index).map_or(0, |track| track.duration_ms);
        if self.paused {
            return self.base_position_ms.min(duration);
        }
        let elapsed = Instant::now().saturating_duration_since(self.base_instant);
        (self.base_position_ms + elapsed.as_millis() as u64).min(duration)
    }

    fn rebase(&mut self, position_ms: u64) {
        self.base_position_ms = position_ms;
        self.base_instant = Instant::now();
    }
}

impl SimulatedDevice {
    fn new(
        device_id: String,
        options: DeviceOptions,
        tracks: Vec<SimTrack>,
        refuse_connect: bool,
    ) -> Self {
        Self {
            device_id,
            options,
            tracks,
            refuse_connect,
            state: Mutex::new(SimState {
                listeners: HashMap::new(),
                next_listener: 1,
                connected: false,
                attached: false,
                index: 0,
                paused: true,
                base_position_ms: 0,
                base_instant: Instant::now(),
                token_requests: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Name and volume the device was constructed with
    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Number of times the device asked for a token
    pub fn token_requests(&self) -> usize {
        self.state().token_requests
    }

    /// Ask the credential provider for a token, as the platform does on refresh
    pub async fn request_token(&self) -> Result<String> {
        self.state().token_requests += 1;
        self.options.credentials.token().await
    }

    /// Push an arbitrary notification to the matching listeners
    pub fn emit(&self, event: DeviceEvent) {
        let kind = event.kind();
        let sinks: Vec<EventSink> = self
            .state()
            .listeners
            .values()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .map(|(_, sink)| sink.clone())
            .collect();
        for sink in sinks {
            // Receiver gone means the session already stopped listening
            let _ = sink.send(event.clone());
        }
    }

    /// Attach or detach the device from playback without notifying
    ///
    /// A detached device answers the liveness probe with `None`.
    pub fn set_attached(&self, attached: bool) {
        self.state().attached = attached;
    }

    /// Current state as the device would report it
    pub fn snapshot(&self) -> DeviceState {
        let state = self.state();
        let current = self.tracks.get(state.index);
        DeviceState {
            paused: state.paused,
            position: Some(state.position_ms(&self.tracks)),
            duration: current.map(|track| track.duration_ms),
            track_window: TrackWindow {
                current_track: current.map(SimTrack::to_device_track),
                previous_tracks: self.tracks[..state.index]
                    .iter()
                    .map(SimTrack::to_device_track)
                    .collect(),
                next_tracks: self
                    .tracks
                    .iter()
                    .skip(state.index + 1)
                    .map(SimTrack::to_device_track)
                    .collect(),
            },
        }
    }

    fn publish_state(&self) {
        self.emit(DeviceEvent::StateChanged(Some(self.snapshot())));
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state().connected {
            Ok(())
        } else {
            Err(PlayerError::Device("not connected".to_string()))
        }
    }

    fn skip(&self, forward: bool) -> Result<()> {
        self.ensure_connected()?;
        {
            let mut state = self.state();
            if self.tracks.is_empty() {
                return Err(PlayerError::Device("nothing to play".to_string()));
            }
            state.index = if forward {
                (state.index + 1) % self.tracks.len()
            } else {
                state.index.checked_sub(1).unwrap_or(self.tracks.len() - 1)
            };
            state.paused = false;
            state.rebase(0);
        }
        self.publish_state();
        Ok(())
    }
}

#[async_trait]
impl PlaybackDevice for SimulatedDevice {
    async fn connect(&self) -> Result<bool> {
        if self.refuse_connect || self.request_token().await.is_err() {
            return Ok(false);
        }
        {
            let mut state = self.state();
            state.connected = true;
            state.attached = true;
            state.paused = self.tracks.is_empty();
            state.rebase(0);
        }
        self.emit(DeviceEvent::Ready {
            device_id: self.device_id.clone(),
        });
        self.publish_state();
        Ok(true)
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state();
        state.connected = false;
        state.attached = false;
        Ok(())
    }

    fn add_listener(&self, kind: DeviceEventKind, sink: EventSink) -> Result<ListenerId> {
        let mut state = self.state();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, (kind, sink));
        Ok(id)
    }

    fn remove_listener(&self, kind: DeviceEventKind, id: ListenerId) -> Result<()> {
        let mut state = self.state();
        match state.listeners.get(&id) {
            Some((registered, _)) if *registered == kind => {
                state.listeners.remove(&id);
                Ok(())
            }
            _ => Err(PlayerError::Listener(format!(
                "no {kind} listener with id {}",
                id.0
            ))),
        }
    }

    async fn get_current_state(&self) -> Result<Option<DeviceState>> {
        let attached = self.state().attached;
        Ok(attached.then(|| self.snapshot()))
    }

    async fn toggle_play(&self) -> Result<()> {
        self.ensure_connected()?;
        {
            let mut state = self.state();
            let position = state.position_ms(&self.tracks);
            state.paused = !state.paused;
            state.rebase(position);
        }
        self.publish_state();
        Ok(())
    }

    async fn previous_track(&self) -> Result<()> {
        self.skip(false)
    }

    async fn next_track(&self) -> Result<()> {
        self.skip(true)
    }
}
