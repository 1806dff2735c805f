//! Pull-to-refresh gesture state machine.
//!
//! Tracks a vertical drag over a scrolled-to-top list, damps it into a
//! visual offset, and decides on release whether a refresh fires. The
//! machine is pure: it owns no timers and performs no I/O. Callers feed it
//! gesture events and invoke their refresh collaborator when [`release`]
//! says so, then report back through [`settle`].
//!
//! [`release`]: PullGesture::release
//! [`settle`]: PullGesture::settle

use tracing::debug;

/// Tuning knobs for the pull gesture. All distances are in the caller's
/// units (pixels, terminal rows scaled up, whatever the surface uses).
#[derive(Debug, Clone, Copy)]
pub struct GestureConfig {
    /// Multiplier < 1 applied to the raw drag before the cap, giving the
    /// indicator its resistance feel.
    pub damping: f32,
    /// Hard ceiling on the damped offset.
    pub cap: f32,
    /// Minimum damped offset required for a release to refresh.
    pub threshold: f32,
    /// Raw drag distance past which native scrolling should be suppressed
    /// for the move.
    pub deadzone: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            damping: 0.4,
            cap: 120.0,
            threshold: 80.0,
            deadzone: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Tracking,
    Refreshing,
}

/// What a drag event amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEffect {
    /// No gesture in progress; the event belongs to normal scrolling.
    Ignored,
    /// Indicator moved. `suppress_native` asks the surface to swallow its
    /// own scroll/overscroll handling for this move.
    Pull { distance: f32, suppress_native: bool },
    /// Direction reversed or the page scrolled; tracking ended.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// No gesture was in progress.
    Ignored,
    /// Released below the threshold; indicator snapped back.
    Reset,
    /// Threshold crossed: start the refresh, then call `settle` when it
    /// resolves.
    Refresh,
}

/// State for one pull-to-refresh surface.
#[derive(Debug)]
pub struct PullGesture {
    config: GestureConfig,
    phase: Phase,
    origin_y: f32,
    pulled: f32,
}

impl PullGesture {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            origin_y: 0.0,
            pulled: 0.0,
        }
    }

    /// Gesture start. Only accepted from `Idle` with the list scrolled to
    /// its very top; a refresh already in flight rejects new gestures so a
    /// second cycle can never overlap the first.
    pub fn begin(&mut self, y: f32, scroll_top: f32) -> bool {
        if self.phase != Phase::Idle || scroll_top != 0.0 {
            return false;
        }
        self.phase = Phase::Tracking;
        self.origin_y = y;
        self.pulled = 0.0;
        true
    }

    /// Pointer moved while the gesture may be live.
    pub fn drag(&mut self, y: f32, scroll_top: f32) -> DragEffect {
        if self.phase != Phase::Tracking {
            return DragEffect::Ignored;
        }
        let diff = y - self.origin_y;
        if diff > 0.0 && scroll_top == 0.0 {
            self.pulled = (diff * self.config.damping).min(self.config.cap);
            DragEffect::Pull {
                distance: self.pulled,
                suppress_native: diff > self.config.deadzone,
            }
        } else {
            // Finger went back up or the page started scrolling; hand the
            // event stream back to normal scrolling.
            self.phase = Phase::Idle;
            self.pulled = 0.0;
            DragEffect::Aborted
        }
    }

    /// Gesture end. On `Refresh` the offset pins at the threshold until
    /// [`settle`](Self::settle) is called.
    pub fn release(&mut self) -> ReleaseOutcome {
        if self.phase != Phase::Tracking {
            return ReleaseOutcome::Ignored;
        }
        if self.pulled >= self.config.threshold {
            debug!(pulled = self.pulled, "pull released past threshold, refreshing");
            self.phase = Phase::Refreshing;
            self.pulled = self.config.threshold;
            ReleaseOutcome::Refresh
        } else {
            self.phase = Phase::Idle;
            self.pulled = 0.0;
            ReleaseOutcome::Reset
        }
    }

    /// The refresh finished, successfully or not. Safe to call when no
    /// refresh is in flight.
    pub fn settle(&mut self) {
        if self.phase == Phase::Refreshing {
            self.phase = Phase::Idle;
        }
        self.pulled = 0.0;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pulled_distance(&self) -> f32 {
        self.pulled
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase == Phase::Refreshing
    }
}

impl Default for PullGesture {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
