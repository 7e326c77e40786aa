// Gaze smoothing: dead zone, weighted moving average, velocity clamp.
//
// Raw tracker output jitters by tens of pixels between samples. The smoother
// drops samples that stay inside the dead zone around the current estimate,
// averages the accepted ones with a linear recency weighting and caps how
// far the estimate may move per accepted sample.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::types::Point;

/// Tuning for [`GazeSmoother`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingParams {
    /// Number of accepted samples kept for the average (FIFO).
    pub history_size: usize,
    /// Samples closer than this on both axes are ignored.
    pub dead_zone: u32,
    /// Maximum Chebyshev displacement of the estimate per accepted sample.
    pub max_speed: u32,
}

#[derive(Debug, Clone)]
pub struct GazeSmoother {
    params: SmoothingParams,
    history: VecDeque<Point>,
    current: Option<Point>,
}

impl GazeSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        let params = SmoothingParams { history_size: params.history_size.max(1), ..params };
        Self {
            history: VecDeque::with_capacity(params.history_size.min(64)),
            current: None,
            params,
        }
    }

    /// Feed one raw sample. Returns false when the dead zone swallowed it.
    pub fn set_coordinates(&mut self, x: i32, y: i32) -> bool {
        let sample = Point::new(x, y);
        let dead_zone = i64::from(self.params.dead_zone);

        if let Some(prev) = self.current {
            let dx = (i64::from(x) - i64::from(prev.x)).abs();
            let dy = (i64::from(y) - i64::from(prev.y)).abs();
            if dx < dead_zone && dy < dead_zone {
                return false;
            }
        }

        self.history.push_back(sample);
        while self.history.len() > self.params.history_size {
            self.history.pop_front();
        }

        let (ax, ay) = self.weighted_average();
        let next = match self.current {
            Some(prev) => self.clamp_velocity(prev, ax, ay),
            None => Point::new(ax.round() as i32, ay.round() as i32),
        };

        trace!(?sample, ?next, "accepted gaze sample");
        self.current = Some(next);
        true
    }

    /// Current smoothed estimate, `None` until the first sample.
    pub fn current(&self) -> Option<Point> {
        self.current
    }

    /// Forget history and estimate (new magnifier session).
    pub fn reset(&mut self) {
        self.history.clear();
        self.current = None;
    }

    #[cfg(test)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // Oldest sample weighs 1, newest weighs len.
    fn weighted_average(&self) -> (f64, f64) {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut total = 0.0;
        for (i, p) in self.history.iter().enumerate() {
            let w = (i + 1) as f64;
            sum_x += f64::from(p.x) * w;
            sum_y += f64::from(p.y) * w;
            total += w;
        }
        (sum_x / total, sum_y / total)
    }

    fn clamp_velocity(&self, prev: Point, ax: f64, ay: f64) -> Point {
        let dx = ax - f64::from(prev.x);
        let dy = ay - f64::from(prev.y);
        let dist = dx.abs().max(dy.abs());
        let max_speed = f64::from(self.params.max_speed);

        let (dx, dy) = if dist > max_speed {
            let k = max_speed / dist;
            (dx * k, dy * k)
        } else {
            (dx, dy)
        };

        Point::new(
            (f64::from(prev.x) + dx).round() as i32,
            (f64::from(prev.y) + dy).round() as i32,
        )
    }
}

/// Handle shared between the gaze input thread (writer) and the render loop (reader).
#[derive(Debug, Clone)]
pub struct SharedSmoother(Arc<Mutex<GazeSmoother>>);

impl SharedSmoother {
    pub fn new(smoother: GazeSmoother) -> Self {
        Self(Arc::new(Mutex::new(smoother)))
    }

    pub fn set_coordinates(&self, x: i32, y: i32) -> bool {
        self.0.lock().set_coordinates(x, y)
    }

    pub fn current(&self) -> Option<Point> {
        self.0.lock().current()
    }

    pub fn reset(&self) {
        self.0.lock().reset();
    }
}
