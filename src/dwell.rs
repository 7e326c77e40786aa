// Dwell activation: reveal the magnifier once the gaze has held still.
//
// The state is a plain value. `DwellState::step` consumes the previous
// state and returns the next one together with the side effect the caller
// has to perform, so the whole machine is testable with synthetic clocks.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::Point;

/// Thresholds for dwell activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellConfig {
    /// Maximum distance from the dwell center that still counts as holding still.
    pub radius: f64,
    /// How long the gaze must stay within `radius` before revealing.
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DwellState {
    /// Dwell mode off, or nothing observed yet.
    #[default]
    Idle,
    /// Watching for stillness around `center` since `since`.
    Tracking { center: Point, since: Instant },
    /// Held long enough; the overlay is visible.
    Active { center: Point },
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellEffect {
    /// Capture and composite around the point, place the window, show it.
    Reveal(Point),
    /// Hide the overlay.
    Hide,
}

impl DwellState {
    /// Advance by one tick with smoothed position `p` observed at `now`.
    pub fn step(
        self,
        enabled: bool,
        p: Point,
        now: Instant,
        cfg: &DwellConfig,
    ) -> (DwellState, Option<DwellEffect>) {
        if !enabled {
            let effect = self.is_active().then_some(DwellEffect::Hide);
            return (DwellState::Idle, effect);
        }

        match self {
            // Entering Tracking evaluates it right away so a zero hold time
            // activates on the very first sample.
            DwellState::Idle => DwellState::Tracking { center: p, since: now }.step(enabled, p, now, cfg),
            DwellState::Tracking { center, since } => {
                if p.distance(center) > cfg.radius {
                    (DwellState::Tracking { center: p, since: now }, None)
                } else if now.saturating_duration_since(since) >= cfg.hold {
                    (DwellState::Active { center }, Some(DwellEffect::Reveal(p)))
                } else {
                    (self, None)
                }
            }
            DwellState::Active { center } => {
                if p.distance(center) > cfg.radius {
                    (DwellState::Tracking { center: p, since: now }, Some(DwellEffect::Hide))
                } else {
                    (self, None)
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DwellState::Active { .. })
    }
}

/// Owns the dwell state and the on/off switch.
#[derive(Debug, Clone)]
pub struct DwellDetector {
    config: DwellConfig,
    enabled: bool,
    state: DwellState,
}

impl DwellDetector {
    pub fn new(config: DwellConfig, enabled: bool) -> Self {
        Self { config, enabled, state: DwellState::Idle }
    }

    pub fn update(&mut self, p: Point, now: Instant) -> Option<DwellEffect> {
        let before = self.state;
        let (next, effect) = before.step(self.enabled, p, now, &self.config);
        if std::mem::discriminant(&before) != std::mem::discriminant(&next) {
            debug!(?before, ?next, "dwell transition");
        }
        self.state = next;
        effect
    }

    /// Switch dwell mode. Turning it off forces `Idle`, hiding if the
    /// overlay was dwell-revealed.
    pub fn toggle(&mut self, enabled: bool) -> Option<DwellEffect> {
        self.enabled = enabled;
        if enabled {
            return None;
        }
        let was_active = self.state.is_active();
        self.state = DwellState::Idle;
        was_active.then_some(DwellEffect::Hide)
    }

    /// Back to `Idle` (window hidden by command).
    pub fn reset(&mut self) {
        self.state = DwellState::Idle;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
