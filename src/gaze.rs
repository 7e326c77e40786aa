// Gaze and pointer input.
//
// Sources run on their own thread and write straight into the
// `SharedSmoother`. Readings without a usable position (blink, lost
// detection) feed a `SignalLossTracker`; a long enough loss turns into a
// `ScaleTrigger` sent to the render loop.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use device_query::{DeviceQuery, DeviceState};
use tracing::{debug, info, trace, warn};

use crate::scale::ScaleTrigger;
use crate::smoothing::SharedSmoother;
use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub timestamp: Instant,
}

impl GazeSample {
    pub fn point(&self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeReading {
    Sample(GazeSample),
    /// No reliable position this time. `decrease` carries the modifier that
    /// turns a sustained loss into a zoom-out instead of a zoom-in.
    NoSignal { decrease: bool, timestamp: Instant },
}

/// Produces gaze readings; `None` means the source is finished.
pub trait GazeSource {
    fn poll(&mut self) -> Option<GazeReading>;
}

/// Where the OS pointer currently is.
pub trait PointerDevice {
    fn position(&self) -> Option<Point>;
}

/// The mouse, read through `device_query`. Doubles as a gaze source.
pub struct PointerSource {
    state: DeviceState,
}

impl PointerSource {
    pub fn new() -> Self {
        Self { state: DeviceState::new() }
    }
}

impl Default for PointerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerDevice for PointerSource {
    fn position(&self) -> Option<Point> {
        let (x, y) = self.state.get_mouse().coords;
        Some(Point::new(x, y))
    }
}

impl GazeSource for PointerSource {
    fn poll(&mut self) -> Option<GazeReading> {
        let p = PointerDevice::position(self)?;
        Some(GazeReading::Sample(GazeSample {
            x: f64::from(p.x),
            y: f64::from(p.y),
            timestamp: Instant::now(),
        }))
    }
}

/// Line protocol from an external tracker: `<x> <y>` for a sample, `blink`
/// (or anything unparseable) for no signal, `blink -` for no signal with the
/// decrease modifier held.
pub struct LineSource<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: String::new() }
    }
}

impl<R: BufRead> GazeSource for LineSource<R> {
    fn poll(&mut self) -> Option<GazeReading> {
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => None,
            Ok(_) => Some(parse_line(&self.line, Instant::now())),
            Err(e) => {
                warn!("gaze input read failed: {e}");
                None
            }
        }
    }
}

pub fn parse_line(line: &str, timestamp: Instant) -> GazeReading {
    let mut parts = line.split_whitespace();
    let coords = match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => a.parse::<f64>().ok().zip(b.parse::<f64>().ok()),
        _ => None,
    };
    match coords {
        Some((x, y)) if x.is_finite() && y.is_finite() => GazeReading::Sample(GazeSample { x, y, timestamp }),
        _ => GazeReading::NoSignal { decrease: line.trim_end().ends_with('-'), timestamp },
    }
}

/// Turns a sustained loss of signal into one scale trigger per episode.
#[derive(Debug, Clone)]
pub struct SignalLossTracker {
    threshold: Duration,
    lost_since: Option<Instant>,
    fired: bool,
}

impl SignalLossTracker {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold, lost_since: None, fired: false }
    }

    pub fn observe(&mut self, reading: &GazeReading) -> Option<ScaleTrigger> {
        match *reading {
            GazeReading::Sample(_) => {
                self.lost_since = None;
                self.fired = false;
                None
            }
            GazeReading::NoSignal { decrease, timestamp } => {
                let since = *self.lost_since.get_or_insert(timestamp);
                if self.fired || timestamp.saturating_duration_since(since) < self.threshold {
                    return None;
                }
                self.fired = true;
                Some(if decrease { ScaleTrigger::Decrease } else { ScaleTrigger::Increase })
            }
        }
    }
}

/// Run a gaze source on its own thread.
///
/// `make_source` is called on the new thread, so the source itself need not
/// be `Send`. With `pace` set the thread sleeps between polls; blocking
/// sources (stdin) pass `None` and pace themselves. The thread ends when the
/// source does or when the trigger receiver is gone.
pub fn spawn_input<S, F>(
    make_source: F,
    smoother: SharedSmoother,
    triggers: Sender<ScaleTrigger>,
    pace: Option<Duration>,
    blink_trigger: Duration,
) -> io::Result<JoinHandle<()>>
where
    S: GazeSource,
    F: FnOnce() -> S + Send + 'static,
{
    thread::Builder::new().name("gaze-input".into()).spawn(move || {
        let mut source = make_source();
        let mut loss = SignalLossTracker::new(blink_trigger);

        while let Some(reading) = source.poll() {
            if let GazeReading::Sample(sample) = reading {
                let p = sample.point();
                let accepted = smoother.set_coordinates(p.x, p.y);
                trace!(?p, accepted, latency = ?sample.timestamp.elapsed(), "gaze sample");
            }
            if let Some(trigger) = loss.observe(&reading) {
                debug!(?trigger, "sustained signal loss");
                if triggers.send(trigger).is_err() {
                    break;
                }
            }
            if let Some(pace) = pace {
                thread::sleep(pace);
            }
        }
        info!("gaze input finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::{GazeSmoother, SmoothingParams};
    use pretty_assertions::assert_eq;

    fn no_signal(t: Instant, decrease: bool) -> GazeReading {
        GazeReading::NoSignal { decrease, timestamp: t }
    }

    fn sample(t: Instant) -> GazeReading {
        GazeReading::Sample(GazeSample { x: 1.0, y: 1.0, timestamp: t })
    }

    #[test]
    fn parses_samples_and_blinks() {
        let t = Instant::now();
        assert_eq!(
            parse_line("812.6 -40.2\n", t),
            GazeReading::Sample(GazeSample { x: 812.6, y: -40.2, timestamp: t })
        );
        assert_eq!(parse_line("blink\n", t), no_signal(t, false));
        assert_eq!(parse_line("blink -\n", t), no_signal(t, true));
        assert_eq!(parse_line("\n", t), no_signal(t, false));
        assert_eq!(parse_line("NaN 3\n", t), no_signal(t, false));
    }

    #[test]
    fn sample_rounds_to_pixel() {
        let s = GazeSample { x: 10.5, y: -3.4, timestamp: Instant::now() };
        assert_eq!(s.point(), Point::new(11, -3));
    }

    #[test]
    fn sustained_loss_fires_once_per_episode() {
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);
        let mut loss = SignalLossTracker::new(Duration::from_millis(1500));

        assert_eq!(loss.observe(&no_signal(at(0), false)), None);
        assert_eq!(loss.observe(&no_signal(at(1000), false)), None);
        assert_eq!(loss.observe(&no_signal(at(1500), false)), Some(ScaleTrigger::Increase));
        assert_eq!(loss.observe(&no_signal(at(4000), false)), None);

        assert_eq!(loss.observe(&sample(at(4030))), None);
        assert_eq!(loss.observe(&no_signal(at(5000), true)), None);
        assert_eq!(loss.observe(&no_signal(at(6600), true)), Some(ScaleTrigger::Decrease));
    }

    #[test]
    fn short_blinks_never_fire() {
        let t0 = Instant::now();
        let mut loss = SignalLossTracker::new(Duration::from_secs(1));
        for i in 0..10u64 {
            let base = t0 + Duration::from_millis(i * 400);
            assert_eq!(loss.observe(&no_signal(base, false)), None);
            assert_eq!(loss.observe(&no_signal(base + Duration::from_millis(300), false)), None);
            assert_eq!(loss.observe(&sample(base + Duration::from_millis(330))), None);
        }
    }

    #[test]
    fn input_thread_feeds_smoother_and_triggers() {
        let smoother = SharedSmoother::new(GazeSmoother::new(SmoothingParams {
            history_size: 1,
            dead_zone: 0,
            max_speed: 10_000,
        }));
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = "100 200\nblink\nblink\n";

        spawn_input(
            move || LineSource::new(io::Cursor::new(input)),
            smoother.clone(),
            tx,
            None,
            Duration::ZERO,
        )
        .unwrap()
        .join()
        .unwrap();

        assert_eq!(smoother.current(), Some(Point::new(100, 200)));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ScaleTrigger::Increase]);
    }
}
