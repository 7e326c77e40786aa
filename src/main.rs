// What you SEE now:
// • A borderless window follows your gaze (or the mouse) showing the zoomed screen under it.
// • With dwell mode on, it only appears after you hold your gaze still.
// • D toggles dwell, +/- zoom, H hides/shows, ESC hides, R restarts smoothing, Q quits.
// • Closing your eyes for a while zooms in (with the `blink -` modifier: zooms out).

mod capture;
mod compositor;
mod config;
mod dwell;
mod error;
mod gaze;
mod geometry;
mod magnifier;
mod overlay;
mod positioner;
mod scale;
mod smoothing;
mod types;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{debug, info, warn};

use capture::{ScreenCapture, XcapCapture};
use config::{Config, SourceKind};
use error::Error;
use gaze::{LineSource, PointerSource, spawn_input};
use magnifier::{Magnifier, TickOutcome};
use overlay::Overlay;
use smoothing::{GazeSmoother, SharedSmoother};

#[derive(Debug, Parser)]
#[command(version, about = "Screen magnifier that follows your gaze")]
struct Cli {
    /// TOML config file; defaults are used for anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start in dwell mode.
    #[arg(long)]
    dwell: bool,

    /// Initial magnification.
    #[arg(long)]
    scale: Option<f64>,

    /// Render tick interval in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Where gaze coordinates come from.
    #[arg(long, value_enum)]
    source: Option<SourceKind>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        config.dwell.enabled |= self.dwell;
        if let Some(scale) = self.scale {
            config.scale.initial = scale;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.timing.tick_ms = tick_ms;
        }
        if let Some(source) = self.source {
            config.input.source = source;
        }
    }
}

/// Ticks and captures per second, logged once a second.
struct TickStats {
    since: Instant,
    ticks: u32,
    refreshes: u32,
}

impl TickStats {
    fn new(now: Instant) -> Self {
        Self { since: now, ticks: 0, refreshes: 0 }
    }

    fn record(&mut self, now: Instant, outcome: TickOutcome) {
        self.ticks += 1;
        if matches!(outcome, TickOutcome::Refreshed | TickOutcome::Revealed) {
            self.refreshes += 1;
        }
        let elapsed = now.duration_since(self.since);
        if elapsed >= Duration::from_secs(1) {
            let secs = elapsed.as_secs_f32();
            debug!(
                tps = self.ticks as f32 / secs,
                captures = self.refreshes as f32 / secs,
                "tick rate"
            );
            *self = Self::new(now);
        }
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gaze_magnifier=info".into()),
        )
        .init();

    /* --- Configuration ---
       Rejected here if degenerate; nothing is validated mid-loop. */
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let capture = XcapCapture::primary()?;
    config.validate_against(capture.monitor())?;
    info!(
        output = ?config.output_size(),
        scale = config.scale.initial,
        dwell = config.dwell.enabled,
        source = ?config.input.source,
        "gaze magnifier starting"
    );

    /* --- Gaze input on its own thread ---
       It writes into the shared smoother; sustained blinks come back as scale triggers. */
    let smoother = SharedSmoother::new(GazeSmoother::new(config.smoothing_params()));
    let (trigger_tx, trigger_rx) = crossbeam_channel::unbounded();
    let _input = match config.input.source {
        SourceKind::Pointer => spawn_input(
            PointerSource::new,
            smoother.clone(),
            trigger_tx,
            Some(config.poll_interval()),
            config.blink_trigger(),
        )?,
        SourceKind::Stdin => spawn_input(
            || LineSource::new(io::stdin().lock()),
            smoother.clone(),
            trigger_tx,
            None,
            config.blink_trigger(),
        )?,
    };

    /* --- Overlay window ---
       Starts parked off-screen until the first frame is ready. */
    let overlay = Overlay::new("Gaze Magnifier", config.output_size(), config.window.topmost)?;
    let mut magnifier = Magnifier::new(&config, smoother, Box::new(PointerSource::new()), capture, overlay);

    let tick = config.tick_interval();
    let mut stats = TickStats::new(Instant::now());

    /* ------------------------------ Main loop ------------------------------ */
    while magnifier.presenter().is_open() {
        let now = Instant::now();

        for command in magnifier.presenter().commands() {
            if !magnifier.handle(command) {
                info!("quit requested");
                return Ok(());
            }
            debug!(?command, scale = magnifier.scale(), dwell = ?magnifier.dwell_state(), "command applied");
        }
        for trigger in trigger_rx.try_iter() {
            magnifier.adjust_scale(trigger);
        }

        let outcome = match magnifier.tick(now) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("tick failed: {e}");
                TickOutcome::CaptureSkipped
            }
        };
        if !matches!(outcome, TickOutcome::Refreshed | TickOutcome::Revealed) {
            // keep the window responsive on ticks that presented nothing new
            if let Err(e) = magnifier.presenter_mut().pump() {
                warn!("window update failed: {e}");
            }
        }
        stats.record(now, outcome);

        thread::sleep(tick.saturating_sub(now.elapsed()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file_config() -> Config {
        Config::parse("[scale]\ninitial = 8.0\n\n[timing]\ntick_ms = 50\n").unwrap()
    }

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "gaze-magnifier",
            "--dwell",
            "--scale",
            "4",
            "--tick-ms",
            "15",
            "--source",
            "stdin",
        ])
        .unwrap();
        let mut config = file_config();
        cli.apply(&mut config);

        assert!(config.dwell.enabled);
        assert_eq!(config.scale.initial, 4.0);
        assert_eq!(config.timing.tick_ms, 15);
        assert_eq!(config.input.source, SourceKind::Stdin);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let cli = Cli::try_parse_from(["gaze-magnifier"]).unwrap();
        let mut config = file_config();
        config.dwell.enabled = true;
        cli.apply(&mut config);

        assert!(config.dwell.enabled);
        assert_eq!(config.scale.initial, 8.0);
        assert_eq!(config.timing.tick_ms, 50);
        assert_eq!(config.input.source, SourceKind::Pointer);
    }

    #[test]
    fn tick_stats_reset_once_a_second() {
        let t0 = Instant::now();
        let mut stats = TickStats::new(t0);
        stats.record(t0 + Duration::from_millis(30), TickOutcome::Refreshed);
        stats.record(t0 + Duration::from_millis(60), TickOutcome::Held);
        stats.record(t0 + Duration::from_millis(90), TickOutcome::Revealed);
        assert_eq!((stats.ticks, stats.refreshes), (3, 2));

        let later = t0 + Duration::from_millis(1000);
        stats.record(later, TickOutcome::Held);
        assert_eq!((stats.ticks, stats.refreshes), (0, 0));
        assert_eq!(stats.since, later);
    }
}
