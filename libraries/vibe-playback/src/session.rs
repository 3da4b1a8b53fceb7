//! Device session manager
//!
//! Owns everything tied to one playback device: the one-shot initialization
//! latch, the SDK lease, the device handle, its listener registrations, and
//! the runner task that serializes state handling and clock ticks.
//!
//! Device construction happens in a spawned task once the platform SDK
//! reports ready, so it can race with [`DeviceSession::teardown`]. Both sides
//! take the same lock: construction stores its handle only if teardown has not
//! run yet, and otherwise undoes its own registrations. SDK loading and
//! `connect` can both be overtaken by teardown, so both recheck it afterwards.
//! The runner races `get_current_state` against shutdown, so teardown never
//! waits on a device call that does not return.

use crate::clock::ClockSimulator;
use crate::collaborators::Collaborators;
use crate::device::{
    CredentialProvider, DeviceEvent, DeviceEventKind, DeviceOptions, DevicePlatform, DeviceState,
    ListenerId, PlaybackDevice, SdkLease,
};
use crate::error::{PlayerError, Result};
use crate::ingest;
use crate::track_change::TrackChangeDetector;
use crate::types::{PlayerConfig, PlayerView, SessionState};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Session with a single remote playback device
///
/// # Example
///
/// ```no_run
/// # async fn demo(platform: std::sync::Arc<dyn vibe_playback::DevicePlatform>) -> vibe_playback::Result<()> {
/// use std::sync::Arc;
/// use vibe_playback::{Collaborators, DeviceSession, PlayerConfig, SharedToken};
///
/// let session = DeviceSession::new(PlayerConfig::default(), platform, Collaborators::default())?;
/// session.initialize(Arc::new(SharedToken::new("bearer-token")));
///
/// let mut view = session.subscribe();
/// while view.changed().await.is_ok() {
///     let current = view.borrow().clone();
///     println!("{} / {}", current.position_label(), current.duration_label());
/// }
///
/// session.teardown().await;
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession {
    inner: Arc<Inner>,
    initialized: AtomicBool,
}

struct Inner {
    config: PlayerConfig,
    platform: Arc<dyn DevicePlatform>,
    collaborators: Collaborators,
    view: watch::Sender<PlayerView>,
    shared: Mutex<Shared>,
}

/// Resources released by teardown
#[derive(Default)]
struct Shared {
    torn_down: bool,
    device: Option<Arc<dyn PlaybackDevice>>,
    listeners: Vec<(DeviceEventKind, ListenerId)>,
    sdk: Option<SdkLease>,
    runner: Option<RunnerHandle>,
}

struct RunnerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DeviceSession {
    /// Create an uninitialized session
    pub fn new(
        config: PlayerConfig,
        platform: Arc<dyn DevicePlatform>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;
        let (view, _) = watch::channel(PlayerView::new());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                platform,
                collaborators,
                view,
                shared: Mutex::new(Shared::default()),
            }),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Start acquiring the device
    ///
    /// Loads the platform SDK if needed and spawns the construction task, then
    /// returns without waiting. Only the first call on a session does anything;
    /// later calls (or calls after teardown) return `false`, as does a call
    /// that a concurrent teardown overtook while the SDK was loading.
    /// Construction failures are logged and leave the session `Inactive`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(&self, credentials: Arc<dyn CredentialProvider>) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session already initialized, ignoring");
            return false;
        }
        if self.inner.shared().torn_down {
            debug!("Session torn down before initialization, ignoring");
            return false;
        }

        info!(name = %self.inner.config.name, "Initializing playback device");
        self.inner.update_view(|view| view.session = SessionState::Connecting);

        let lease = match self.inner.platform.load_sdk() {
            Ok(lease) => lease,
            Err(e) => {
                warn!(error = %e, "Failed to load platform SDK");
                self.inner.mark_inactive();
                return true;
            }
        };

        // Teardown may have run while the SDK was loading
        let orphaned = {
            let mut shared = self.inner.shared();
            if shared.torn_down {
                Some(lease)
            } else {
                if let Some(lease) = &lease {
                    debug!(lease = lease.id(), "Platform SDK loaded by this session");
                }
                shared.sdk = lease;
                None
            }
        };
        if let Some(lease) = orphaned {
            debug!("Session torn down while loading the SDK, releasing it");
            if let Some(lease) = lease {
                if let Err(e) = self.inner.platform.release_sdk(lease) {
                    warn!(error = %e, "Failed to release platform SDK");
                }
            }
            return false;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.construct(credentials).await;
        });

        true
    }

    /// Release everything the session holds
    ///
    /// Stops the tick timer, removes listeners, disconnects the device, and
    /// releases the SDK lease, in that order. Failures are logged and the
    /// remaining steps still run. Safe to call at any point and any number of
    /// times.
    pub async fn teardown(&self) {
        let (runner, device, listeners, sdk) = {
            let mut shared = self.inner.shared();
            if shared.torn_down {
                debug!("Session already torn down");
                return;
            }
            shared.torn_down = true;
            (
                shared.runner.take(),
                shared.device.take(),
                std::mem::take(&mut shared.listeners),
                shared.sdk.take(),
            )
        };

        info!("Tearing down playback session");

        if let Some(runner) = runner {
            runner.stop().await;
        }

        if let Some(device) = &device {
            release_device(device.as_ref(), &listeners).await;
        }

        if let Some(lease) = sdk {
            if let Err(e) = self.inner.platform.release_sdk(lease) {
                warn!(error = %e, "Failed to release platform SDK");
            }
        }

        self.inner.view.send_modify(|view| {
            view.session = SessionState::Disconnected;
            view.is_active = false;
            view.ticking = false;
        });
    }

    /// Toggle play/pause on the device
    pub async fn toggle_play(&self) -> Result<()> {
        self.live_device()?.toggle_play().await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.live_device()?.previous_track().await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.live_device()?.next_track().await
    }

    /// Current display state
    pub fn view(&self) -> PlayerView {
        self.inner.view.borrow().clone()
    }

    /// Receiver notified on every display state change
    pub fn subscribe(&self) -> watch::Receiver<PlayerView> {
        self.inner.view.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.view.borrow().session
    }

    pub fn is_active(&self) -> bool {
        self.inner.view.borrow().is_active
    }

    /// Whether a device handle is currently held
    pub fn has_device(&self) -> bool {
        self.inner.shared().device.is_some()
    }

    /// Number of listener registrations currently held
    pub fn listener_count(&self) -> usize {
        self.inner.shared().listeners.len()
    }

    /// Whether the clock simulator has a tick timer armed
    pub fn timer_running(&self) -> bool {
        self.inner.view.borrow().ticking
    }

    fn live_device(&self) -> Result<Arc<dyn PlaybackDevice>> {
        self.inner
            .shared()
            .device
            .clone()
            .ok_or(PlayerError::NotInitialized)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        // Without teardown the device stays connected, but the runner must not outlive us
        let runner = self.inner.shared().runner.take();
        if let Some(runner) = runner {
            debug!("Session dropped without teardown, stopping runner");
            let _ = runner.shutdown.send(());
        }
    }
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` unless the session is already disconnected
    fn update_view(&self, update: impl FnOnce(&mut PlayerView)) {
        update_view(&self.view, update);
    }

    fn mark_inactive(&self) {
        self.update_view(|view| {
            view.session = SessionState::Inactive;
            view.is_active = false;
        });
    }

    /// Construction task: wait for the SDK, build the device, wire it up
    async fn construct(self: Arc<Self>, credentials: Arc<dyn CredentialProvider>) {
        if let Err(e) = self.platform.sdk_ready().await {
            warn!(error = %e, "Platform SDK never became ready");
            self.mark_inactive();
            return;
        }

        {
            let shared = self.shared();
            if shared.torn_down || shared.device.is_some() {
                debug!("Skipping device construction (torn down or already constructed)");
                return;
            }
        }

        let options = DeviceOptions {
            name: self.config.name.clone(),
            volume: self.config.volume,
            credentials,
        };
        let device = match self.platform.create_device(options) {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Failed to construct playback device");
                self.mark_inactive();
                return;
            }
        };

        let (sink, events) = mpsc::unbounded_channel();
        let mut listeners = Vec::with_capacity(DeviceEventKind::ALL.len());
        for kind in DeviceEventKind::ALL {
            match device.add_listener(kind, sink.clone()) {
                Ok(id) => listeners.push((kind, id)),
                Err(e) => warn!(event = %kind, error = %e, "Failed to register listener"),
            }
        }
        drop(sink);

        let stored = {
            let mut shared = self.shared();
            if shared.torn_down || shared.device.is_some() {
                false
            } else {
                let (shutdown, shutdown_rx) = oneshot::channel();
                let runner = SessionRunner {
                    device: Arc::clone(&device),
                    events,
                    shutdown: shutdown_rx,
                    clock: ClockSimulator::new(Duration::from_millis(
                        self.config.tick_interval_ms,
                    )),
                    detector: TrackChangeDetector::new(),
                    inner: Arc::clone(&self),
                };
                let task = tokio::spawn(runner.run());

                shared.device = Some(Arc::clone(&device));
                shared.listeners = std::mem::take(&mut listeners);
                shared.runner = Some(RunnerHandle { shutdown, task });
                true
            }
        };

        if !stored {
            debug!("Session torn down during construction, releasing device");
            release_device(device.as_ref(), &listeners).await;
            return;
        }

        let connected = device.connect().await;

        // Teardown may have released the device while connect was pending
        let torn_down = self.shared().torn_down;
        if torn_down {
            debug!("Session torn down while connecting, disconnecting device");
            if let Err(e) = device.disconnect().await {
                warn!(error = %e, "Failed to disconnect playback device");
            }
            return;
        }

        match connected {
            Ok(true) => info!(name = %self.config.name, "Playback device connected"),
            Ok(false) => {
                warn!("Platform refused the device connection");
                self.mark_inactive();
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect playback device");
                self.mark_inactive();
            }
        }
    }
}

impl RunnerHandle {
    async fn stop(self) {
        // The runner may already have exited on its own
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session runner ended abnormally");
        }
    }
}

fn update_view(view: &watch::Sender<PlayerView>, update: impl FnOnce(&mut PlayerView)) {
    view.send_if_modified(|current| {
        if current.session == SessionState::Disconnected {
            return false;
        }
        let before = current.clone();
        update(current);
        *current != before
    });
}

/// Remove listeners then disconnect, continuing past failures
async fn release_device(device: &dyn PlaybackDevice, listeners: &[(DeviceEventKind, ListenerId)]) {
    for (kind, id) in listeners {
        if let Err(e) = device.remove_listener(*kind, *id) {
            warn!(event = %kind, error = %e, "Failed to remove listener");
        }
    }
    if let Err(e) = device.disconnect().await {
        warn!(error = %e, "Failed to disconnect playback device");
    }
}

// =============================================================================
// Session runner
// =============================================================================

/// Single task that owns the clock and processes device events in order
struct SessionRunner {
    device: Arc<dyn PlaybackDevice>,
    events: mpsc::UnboundedReceiver<DeviceEvent>,
    shutdown: oneshot::Receiver<()>,
    clock: ClockSimulator,
    detector: TrackChangeDetector,
    inner: Arc<Inner>,
}

impl SessionRunner {
    async fn run(mut self) {
        debug!("Session runner starting");

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown => {
                    debug!("Session runner shutdown requested");
                    break;
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.handle_event(event).await.is_break() {
                            debug!("Session runner shutdown requested");
                            break;
                        }
                    }
                    None => {
                        debug!("Device event channel closed");
                        break;
                    }
                },

                () = self.clock.next_tick() => self.on_tick(),
            }
        }

        self.clock.cancel();
        self.inner.update_view(|view| view.ticking = false);
        debug!("Session runner stopped");
    }

    /// Handle one notification; `Break` when shutdown arrived meanwhile
    async fn handle_event(&mut self, event: DeviceEvent) -> ControlFlow<()> {
        match event {
            DeviceEvent::Ready { device_id } => {
                info!(device_id = %device_id, "Playback device ready");
                self.inner
                    .update_view(|view| view.device_id = Some(device_id.clone()));
                self.inner.collaborators.activate_device(&device_id);
            }
            DeviceEvent::NotReady { device_id } => {
                warn!(device_id = %device_id, "Playback device went offline");
                self.inner.mark_inactive();
            }
            DeviceEvent::StateChanged(None) => {
                debug!("Device stopped reporting state");
                self.clock.clear();
                self.inner.update_view(|view| {
                    view.session = SessionState::Inactive;
                    view.is_active = false;
                    view.ticking = false;
                });
            }
            DeviceEvent::StateChanged(Some(state)) => return self.handle_state(&state).await,
        }
        ControlFlow::Continue(())
    }

    async fn handle_state(&mut self, state: &DeviceState) -> ControlFlow<()> {
        // Cancel before reseeding so no stale tick sees the new reference
        self.clock.cancel();

        let snapshot = ingest::normalize(state);
        let now = Instant::now();

        self.inner.update_view(|view| {
            view.track_id.clone_from(&snapshot.track_id);
            view.track = snapshot.track.clone();
            view.duration_ms = snapshot.duration_ms;
            view.position_ms = snapshot.position_ms;
            view.is_paused = snapshot.paused;
            view.ticking = false;
        });

        if self.detector.observe(snapshot.track_id.as_deref()) {
            info!(
                track_id = snapshot.track_id.as_deref().unwrap_or_default(),
                title = %snapshot.track.title,
                "Track changed, refreshing queue"
            );
            self.inner.collaborators.refresh_queue();
        }

        self.clock.reseed(
            snapshot.position_ms,
            snapshot.duration_ms,
            snapshot.paused,
            now,
        );

        // A state event alone does not prove the device is attached
        let current = tokio::select! {
            biased;

            _ = &mut self.shutdown => return ControlFlow::Break(()),
            current = self.device.get_current_state() => current,
        };
        let active = match current {
            Ok(current) => current.is_some(),
            Err(e) => {
                warn!(error = %e, "Liveness probe failed");
                false
            }
        };

        let ticking = self.clock.arm(Instant::now());
        self.inner.update_view(|view| {
            view.is_active = active;
            view.session = if active {
                SessionState::Active
            } else {
                SessionState::Inactive
            };
            view.ticking = ticking;
        });
        ControlFlow::Continue(())
    }

    fn on_tick(&mut self) {
        let position = self.clock.on_tick(Instant::now());
        let ticking = self.clock.is_running();
        self.inner.update_view(|view| {
            view.position_ms = position;
            view.ticking = ticking;
        });
    }
}
