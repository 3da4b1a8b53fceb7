//! Clock simulator
//!
//! Devices report position only on sparse state events. Between two events
//! the displayed position is interpolated from the last reported one:
//!
//! ```text
//! simulated = min(reference_position + (now - reference_instant), duration)
//! ```
//!
//! A single optional tick interval drives republishing. The interval is
//! cancelled before every reseed and re-armed only while playing a track of
//! known length, so at most one timer ever exists.

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Reference point the simulation interpolates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    /// Position at the last real snapshot
    pub reference_position_ms: u64,

    /// When that snapshot was taken
    pub reference_instant: Instant,

    pub duration_ms: u64,

    pub paused: bool,
}

impl ClockState {
    fn at(now: Instant) -> Self {
        Self {
            reference_position_ms: 0,
            reference_instant: now,
            duration_ms: 0,
            paused: true,
        }
    }

    /// Interpolated position at `now`
    ///
    /// Frozen at the reference while paused or while the duration is unknown.
    pub fn simulated_position_ms(&self, now: Instant) -> u64 {
        if self.paused || self.duration_ms == 0 {
            return self.reference_position_ms;
        }
        self.unclamped_position_ms(now).min(self.duration_ms)
    }

    fn unclamped_position_ms(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.reference_instant);
        self.reference_position_ms
            .saturating_add(elapsed.as_millis() as u64)
    }
}

/// Owns the clock reference and the tick timer
#[derive(Debug)]
pub struct ClockSimulator {
    period: Duration,
    state: ClockState,
    timer: Option<Interval>,
}

impl ClockSimulator {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: ClockState::at(Instant::now()),
            timer: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    /// Whether a tick timer is armed
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Drop the tick timer, if any
    pub fn cancel(&mut self) {
        if self.timer.take().is_some() {
            tracing::trace!("Clock tick cancelled");
        }
    }

    /// Move the reference to a freshly reported position
    ///
    /// Cancels the timer first; a stale tick must never observe the new
    /// reference.
    pub fn reseed(&mut self, position_ms: u64, duration_ms: u64, paused: bool, now: Instant) {
        self.cancel();
        self.state = ClockState {
            reference_position_ms: position_ms,
            reference_instant: now,
            duration_ms,
            paused,
        };
    }

    /// Forget the reference and stop ticking
    pub fn clear(&mut self) {
        self.cancel();
        self.state = ClockState::at(Instant::now());
    }

    /// Arm the tick timer if the reference is playing a track of known length
    ///
    /// Returns whether a timer is now running. The first tick lands one
    /// period after `now`.
    pub fn arm(&mut self, now: Instant) -> bool {
        self.cancel();
        if self.state.paused || self.state.duration_ms == 0 {
            return false;
        }
        if self.state.unclamped_position_ms(now) >= self.state.duration_ms {
            return false;
        }

        let mut interval = time::interval_at(now + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(interval);
        tracing::trace!(period_ms = self.period.as_millis() as u64, "Clock tick armed");
        true
    }

    /// Wait for the next tick; never resolves while no timer is armed
    pub async fn next_tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Advance the simulation at `now` and return the position to display
    ///
    /// Stops the timer once the track end is reached.
    pub fn on_tick(&mut self, now: Instant) -> u64 {
        if self.state.unclamped_position_ms(now) >= self.state.duration_ms {
            self.cancel();
        }
        self.state.simulated_position_ms(now)
    }

    pub fn simulated_position_ms(&self, now: Instant) -> u64 {
        self.state.simulated_position_ms(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(250);

    #[tokio::test(start_paused = true)]
    async fn interpolates_between_snapshots() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(10_000, 20_000, false, start);
        assert!(clock.arm(start));

        let mut position = 0;
        for _ in 0..4 {
            clock.next_tick().await;
            position = clock.on_tick(Instant::now());
        }

        assert_eq!(Instant::now() - start, Duration::from_millis(1_000));
        assert_eq!(position, 11_000);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_ticking_at_track_end() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(10_000, 20_000, false, start);
        clock.arm(start);

        let mut ticks = 0;
        let mut last = 0;
        while clock.is_running() {
            clock.next_tick().await;
            let position = clock.on_tick(Instant::now());
            assert!(position >= last, "position went backwards");
            last = position;
            ticks += 1;
        }

        assert_eq!(last, 20_000);
        assert_eq!(ticks, 40);
        assert_eq!(Instant::now() - start, Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_reference_is_frozen() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(5_000, 20_000, true, start);

        assert!(!clock.arm(start));
        assert!(!clock.is_running());

        time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.simulated_position_ms(Instant::now()), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_duration_never_ticks() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(1_000, 0, false, start);
        assert!(!clock.arm(start));
        assert_eq!(clock.simulated_position_ms(start + Duration::from_secs(5)), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn reseed_cancels_the_running_timer() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(0, 60_000, false, start);
        clock.arm(start);
        assert!(clock.is_running());

        clock.reseed(30_000, 60_000, false, start);
        assert!(!clock.is_running());
        assert_eq!(clock.state().reference_position_ms, 30_000);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_at_track_end_does_not_arm() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(20_000, 20_000, false, start);
        assert!(!clock.arm(start));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_reference() {
        let mut clock = ClockSimulator::new(PERIOD);
        let start = Instant::now();
        clock.reseed(7_000, 20_000, false, start);
        clock.arm(start);

        clock.clear();
        assert!(!clock.is_running());
        assert_eq!(clock.state().reference_position_ms, 0);
        assert!(clock.state().paused);
    }
}
