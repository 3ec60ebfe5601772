//! The idle camera rotation state machine.
//!
//! Rotation is a chain of camera eases, each turning the bearing by a fixed
//! step around a fixed center. The next ease is requested only after the
//! engine reports that the previous one ended, so at most one rotation
//! transition is ever in flight and the camera never fights the engine's
//! own animation scheduling.
//!
//! ```text
//!  Idle ──start──▶ Stepping ──interrupt / stop──▶ Stopped
//!                   │    ▲
//!         move end  │    │ next step
//!                   ▼    │
//!               (pending step)
//! ```
//!
//! `Stopped` is terminal. Once user input stops the rotation it does not
//! resume for the rest of the session.
//!
//! The animator itself never touches the engine or a clock. It returns the
//! ease requests to issue and tracks the single pending step handle; the
//! session driver owns the engine and the timers.

use panorama_types::{LngLat, StepScheduler};
use serde::Serialize;
use tokio::time::Instant;

use crate::config::RotationConfig;
use crate::engine::{EaseTo, Easing, FrameId};

/// Rotation lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    /// Not started yet.
    #[default]
    Idle,
    /// Stepping around the center.
    Stepping,
    /// Permanently stopped.
    Stopped,
}

/// Handle of the one scheduled-but-not-started rotation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStep {
    /// A timer that fires at `due`.
    Timer {
        /// When the step should start.
        due: Instant,
    },
    /// An engine animation frame request.
    Frame(FrameId),
}

/// Wrap a bearing into `[0, 360)`.
pub fn wrap_bearing(bearing: f64) -> f64 {
    let wrapped = bearing.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Drives bearing steps for one session.
#[derive(Debug, Clone)]
pub struct RotationAnimator {
    config: RotationConfig,
    center: LngLat,
    phase: RotationPhase,
    bearing: f64,
    in_flight: bool,
    pending: Option<PendingStep>,
    steps_completed: u64,
}

impl RotationAnimator {
    /// Create an idle animator rotating around `center`.
    pub const fn new(config: RotationConfig, center: LngLat) -> Self {
        Self {
            config,
            center,
            phase: RotationPhase::Idle,
            bearing: config.initial_bearing,
            in_flight: false,
            pending: None,
            steps_completed: 0,
        }
    }

    /// Begin stepping and return the first ease to request.
    ///
    /// Returns `None` when rotation is disabled or has already started or
    /// stopped.
    pub fn start(&mut self) -> Option<EaseTo> {
        if !self.config.enabled || self.phase != RotationPhase::Idle {
            return None;
        }
        self.phase = RotationPhase::Stepping;
        Some(self.advance())
    }

    /// Record that the engine finished a camera transition.
    ///
    /// Returns `true` if a rotation step just completed and the next one
    /// should be scheduled. Transitions not started by the animator are
    /// ignored.
    pub fn on_move_end(&mut self) -> bool {
        if self.phase != RotationPhase::Stepping || !self.in_flight {
            return false;
        }
        self.in_flight = false;
        self.steps_completed = self.steps_completed.saturating_add(1);
        true
    }

    /// Remember the handle of the scheduled next step.
    ///
    /// Returns the handle it replaced, which the caller must cancel.
    pub fn schedule(&mut self, step: PendingStep) -> Option<PendingStep> {
        self.pending.replace(step)
    }

    /// Take the pending step and return the ease to request for it.
    ///
    /// Returns `None` if the animator is no longer stepping.
    pub fn next_step(&mut self) -> Option<EaseTo> {
        self.pending = None;
        if self.phase != RotationPhase::Stepping || self.in_flight {
            return None;
        }
        Some(self.advance())
    }

    /// Stop because of user input. Has no effect unless stepping.
    ///
    /// Returns the pending step handle, if any, for cancellation.
    pub fn interrupt(&mut self) -> Option<PendingStep> {
        if self.phase != RotationPhase::Stepping {
            return None;
        }
        self.halt()
    }

    /// Stop unconditionally, as on teardown.
    ///
    /// Returns the pending step handle, if any, for cancellation.
    pub fn stop(&mut self) -> Option<PendingStep> {
        self.halt()
    }

    fn halt(&mut self) -> Option<PendingStep> {
        self.phase = RotationPhase::Stopped;
        self.in_flight = false;
        self.pending.take()
    }

    fn advance(&mut self) -> EaseTo {
        self.bearing = wrap_bearing(self.bearing + self.config.degrees_per_step);
        self.in_flight = true;
        EaseTo {
            center: self.center,
            bearing: self.bearing,
            duration_ms: self.config.step_duration_ms,
            easing: Easing::Linear,
            essential: true,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> RotationPhase {
        self.phase
    }

    /// Bearing of the most recently requested step, or the initial bearing
    /// before the first one.
    pub const fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Number of steps the engine reported finished.
    pub const fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// The scheduled next step, if any.
    pub const fn pending(&self) -> Option<PendingStep> {
        self.pending
    }

    /// Due time of a pending timer step.
    pub const fn timer_due(&self) -> Option<Instant> {
        match self.pending {
            Some(PendingStep::Timer { due }) => Some(due),
            _ => None,
        }
    }

    /// How the next step is scheduled.
    pub const fn scheduler(&self) -> StepScheduler {
        self.config.scheduler
    }
}
