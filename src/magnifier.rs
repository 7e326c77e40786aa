// One magnifier session: the per-tick pipeline and the commands that steer it.
//
// Per tick: smoothed gaze (or pointer fallback) → dwell gate → hysteresis →
// capture with the overlay shielded → composite → move → present.
// Every stage is reached through a trait or a plain value; the whole
// pipeline runs in tests without a window or a screen.

use std::time::Instant;

use tracing::{info, trace, warn};

use crate::capture::ScreenCapture;
use crate::compositor::{MagnifierCompositor, to_frame_buffer};
use crate::config::Config;
use crate::dwell::{DwellDetector, DwellEffect, DwellState};
use crate::error::Error;
use crate::gaze::PointerDevice;
use crate::geometry::{region_for, window_target};
use crate::overlay::{CaptureShield, Presenter};
use crate::positioner::{Placement, WindowPositioner};
use crate::scale::{ScaleController, ScaleTrigger};
use crate::smoothing::SharedSmoother;
use crate::types::Point;

/// Requests from the command surface (keys on the overlay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleDwell,
    Increase,
    Decrease,
    ToggleVisible,
    Hide,
    Restart,
    Quit,
}

/// What a tick did; mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No gaze yet and no pointer either.
    NoInput,
    /// Hidden by command, or just hidden by the dwell gate.
    Hidden,
    /// Dwell mode, not held still long enough yet.
    Waiting,
    /// Inside the move dead zone; previous frame stays.
    Held,
    /// Recaptured, moved and presented.
    Refreshed,
    /// Dwell just completed; first frame presented and shown.
    Revealed,
    /// Capture failed; previous frame stays.
    CaptureSkipped,
}

pub struct Magnifier<C, P> {
    smoother: SharedSmoother,
    pointer: Box<dyn PointerDevice>,
    dwell: DwellDetector,
    positioner: WindowPositioner,
    scale: ScaleController,
    compositor: MagnifierCompositor,
    capture: C,
    presenter: P,
    shown: bool,
}

impl<C: ScreenCapture, P: Presenter> Magnifier<C, P> {
    pub fn new(
        config: &Config,
        smoother: SharedSmoother,
        pointer: Box<dyn PointerDevice>,
        capture: C,
        presenter: P,
    ) -> Self {
        Self {
            smoother,
            pointer,
            dwell: DwellDetector::new(config.dwell_config(), config.dwell.enabled),
            positioner: WindowPositioner::new(config.positioner.move_dead_zone),
            scale: ScaleController::new(config.scale.initial, config.scale.min, config.scale.max),
            compositor: MagnifierCompositor::new(config.output_size()),
            capture,
            presenter,
            shown: true,
        }
    }

    /// One full pipeline pass at time `now`.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, Error> {
        let Some(point) = self.gaze_point() else {
            return Ok(TickOutcome::NoInput);
        };
        if !self.shown {
            return Ok(TickOutcome::Hidden);
        }

        if !self.dwell.enabled() {
            return self.follow(point);
        }
        match self.dwell.update(point, now) {
            Some(DwellEffect::Reveal(at)) => {
                self.positioner.reset();
                Ok(match self.follow(at)? {
                    TickOutcome::Refreshed => TickOutcome::Revealed,
                    other => other,
                })
            }
            Some(DwellEffect::Hide) => {
                self.conceal();
                Ok(TickOutcome::Hidden)
            }
            None if self.dwell.is_active() => self.follow(point),
            None => Ok(TickOutcome::Waiting),
        }
    }

    /// Gaze if any was ever accepted, otherwise the pointer.
    fn gaze_point(&self) -> Option<Point> {
        self.smoother.current().or_else(|| self.pointer.position())
    }

    fn follow(&mut self, point: Point) -> Result<TickOutcome, Error> {
        let target = window_target(point, self.compositor.output());
        let Some(placement) = self.positioner.propose(target) else {
            return Ok(TickOutcome::Held);
        };
        if !self.refresh(point, placement)? {
            return Ok(TickOutcome::CaptureSkipped);
        }
        if !self.presenter.is_visible() {
            self.presenter.set_visible(true);
        }
        Ok(TickOutcome::Refreshed)
    }

    // Capture while shielded, then commit and move. False if the capture failed.
    fn refresh(&mut self, point: Point, placement: Placement) -> Result<bool, Error> {
        let output = self.compositor.output();
        let region = region_for(point, self.capture.monitor(), output, self.scale.current());

        let captured = {
            let _shield = CaptureShield::new(&mut self.presenter);
            self.capture.capture(region)
        };
        let raw = match captured {
            Ok(raw) => raw,
            Err(e) => {
                warn!(?region, "capture failed, keeping previous frame: {e}");
                return Ok(false);
            }
        };

        let image = self.compositor.compose(&raw, region.size())?;
        self.positioner.commit(placement);
        if let Placement::Move { from, to } = placement {
            trace!(?from, ?to, "window moved");
        }
        self.presenter.move_to(placement.target());
        self.presenter.present(&to_frame_buffer(&image))?;
        Ok(true)
    }

    fn conceal(&mut self) {
        self.presenter.set_visible(false);
        self.positioner.reset();
    }

    /// Apply one command. Returns false when the session should end.
    pub fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::ToggleDwell => self.toggle_dwell(!self.dwell.enabled()),
            Command::Increase => self.adjust_scale(ScaleTrigger::Increase),
            Command::Decrease => self.adjust_scale(ScaleTrigger::Decrease),
            Command::ToggleVisible if self.shown => self.hide(),
            Command::ToggleVisible => self.show(),
            Command::Hide if self.shown => self.hide(),
            Command::Hide => {}
            Command::Restart => self.restart(),
            Command::Quit => return false,
        }
        true
    }

    /// Dwell on: hidden until the next dwell completes. Off: follow continuously.
    pub fn toggle_dwell(&mut self, enabled: bool) {
        self.dwell.toggle(enabled);
        info!(enabled, "dwell mode");
        self.conceal();
    }

    /// Takes effect on the next capture; nothing already shown is rescaled
    /// and no capture is forced while the target stays put.
    pub fn adjust_scale(&mut self, trigger: ScaleTrigger) {
        self.scale.adjust(trigger);
    }

    pub fn show(&mut self) {
        info!("magnifier shown");
        self.shown = true;
        self.positioner.reset();
    }

    pub fn hide(&mut self) {
        info!("magnifier hidden");
        self.shown = false;
        self.dwell.reset();
        self.conceal();
    }

    /// Start over: forget smoothing history, dwell progress and placement.
    pub fn restart(&mut self) {
        info!("magnifier session restarted");
        self.smoother.reset();
        self.dwell.reset();
        self.conceal();
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn scale(&self) -> f64 {
        self.scale.current()
    }

    pub fn dwell_state(&self) -> DwellState {
        self.dwell.state()
    }
}
