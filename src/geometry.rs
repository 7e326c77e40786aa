// Where to capture and where to put the window, given a gaze point.
// Pure functions only; the monitor is passed in.

use crate::types::{Bounds, Point, Region, Size};

/// Source rectangle size for a given output size and zoom.
/// Truncates toward zero, never returns a zero dimension.
pub fn source_size(output: Size, scale_factor: f64) -> Size {
    let w = (f64::from(output.width) / scale_factor) as u32;
    let h = (f64::from(output.height) / scale_factor) as u32;
    Size::new(w.max(1), h.max(1))
}

/// Capture rectangle centered on `point`, pushed back inside `monitor`.
///
/// If the source would be larger than the monitor (zoom below the
/// monitor/output ratio) it is capped to the monitor size, so the result is
/// always fully contained. Config validation keeps callers out of that case.
pub fn region_for(point: Point, monitor: Bounds, output: Size, scale_factor: f64) -> Region {
    let source = source_size(output, scale_factor);
    let width = source.width.min(monitor.width.max(1));
    let height = source.height.min(monitor.height.max(1));

    Region {
        left: clamp_axis(point.x, width, monitor.left, monitor.width),
        top: clamp_axis(point.y, height, monitor.top, monitor.height),
        width,
        height,
    }
}

// One axis: candidate = center - len/2, clamped to [lo, lo + span - len].
fn clamp_axis(center: i32, len: u32, lo: i32, span: u32) -> i32 {
    let candidate = i64::from(center) - i64::from(len / 2);
    let lo = i64::from(lo);
    let hi = lo + i64::from(span.saturating_sub(len));
    candidate.clamp(lo, hi) as i32
}

/// Top-left for a window of `output` size centered on `point`.
pub fn window_target(point: Point, output: Size) -> Point {
    Point::new(
        point.x.saturating_sub((output.width / 2) as i32),
        point.y.saturating_sub((output.height / 2) as i32),
    )
}
