// Screen capture provider: returns the RGBA pixels of one region.
//
// The xcap backend grabs the whole primary monitor and crops, the same way
// region screenshots are taken elsewhere; the crop is what reaches the
// compositor.

use image::RgbaImage;
use image::imageops;
use thiserror::Error;
use tracing::info;
use xcap::Monitor;

use crate::types::{Bounds, Region};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitor available for capture")]
    NoMonitor,

    #[error("capture backend failed: {0}")]
    Backend(String),

    #[error("region {0:?} is outside the captured monitor")]
    InvalidRegion(Region),
}

/// Anything that can hand back the pixels under a screen region.
pub trait ScreenCapture {
    /// Bounds of the monitor regions are clamped against.
    fn monitor(&self) -> Bounds;

    /// Pixels covering exactly `region`, in RGBA order.
    fn capture(&mut self, region: Region) -> Result<RgbaImage, CaptureError>;
}

pub struct XcapCapture {
    monitor: Monitor,
    bounds: Bounds,
}

impl XcapCapture {
    /// Open the primary monitor (or the first one if none claims primary).
    pub fn primary() -> Result<Self, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::Backend(format!("list monitors: {e}")))?;
        let primary = monitors.iter().position(|m| m.is_primary().unwrap_or(false)).unwrap_or(0);
        let monitor = monitors.into_iter().nth(primary).ok_or(CaptureError::NoMonitor)?;

        let bounds = Bounds::new(
            monitor.x().map_err(backend)?,
            monitor.y().map_err(backend)?,
            monitor.width().map_err(backend)?,
            monitor.height().map_err(backend)?,
        );
        info!(name = %monitor.name().unwrap_or_default(), ?bounds, "capturing monitor");
        Ok(Self { monitor, bounds })
    }
}

fn backend(e: xcap::XCapError) -> CaptureError {
    CaptureError::Backend(e.to_string())
}

impl ScreenCapture for XcapCapture {
    fn monitor(&self) -> Bounds {
        self.bounds
    }

    fn capture(&mut self, region: Region) -> Result<RgbaImage, CaptureError> {
        if !self.bounds.contains(&region) {
            return Err(CaptureError::InvalidRegion(region));
        }
        let full = self
            .monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend(format!("capture screen: {e}")))?;
        crop_to_region(&full, self.bounds, region)
    }
}

/// Cut `region` (screen coordinates) out of a full capture of `monitor`.
pub fn crop_to_region(full: &RgbaImage, monitor: Bounds, region: Region) -> Result<RgbaImage, CaptureError> {
    let rel_x = i64::from(region.left) - i64::from(monitor.left);
    let rel_y = i64::from(region.top) - i64::from(monitor.top);
    // The backend may report a different pixel size than the logical bounds (HiDPI).
    if rel_x < 0
        || rel_y < 0
        || rel_x + i64::from(region.width) > i64::from(full.width())
        || rel_y + i64::from(region.height) > i64::from(full.height())
    {
        return Err(CaptureError::InvalidRegion(region));
    }
    let view = imageops::crop_imm(full, rel_x as u32, rel_y as u32, region.width, region.height);
    Ok(view.to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn crops_relative_to_monitor_origin() {
        let monitor = Bounds::new(100, 50, 64, 48);
        let full = gradient(64, 48);
        let region = Region { left: 110, top: 60, width: 8, height: 4 };
        let out = crop_to_region(&full, monitor, region).unwrap();
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.get_pixel(0, 0), &Rgba([10, 10, 0, 255]));
        assert_eq!(out.get_pixel(7, 3), &Rgba([17, 13, 0, 255]));
    }

    #[test]
    fn short_capture_is_an_invalid_region() {
        let monitor = Bounds::new(0, 0, 64, 48);
        let full = gradient(32, 24);
        let region = Region { left: 30, top: 0, width: 8, height: 4 };
        assert!(matches!(crop_to_region(&full, monitor, region), Err(CaptureError::InvalidRegion(_))));
    }

    #[test]
    fn region_left_of_monitor_is_rejected() {
        let monitor = Bounds::new(100, 0, 64, 48);
        let full = gradient(64, 48);
        let region = Region { left: 90, top: 0, width: 8, height: 4 };
        assert!(matches!(crop_to_region(&full, monitor, region), Err(CaptureError::InvalidRegion(_))));
    }
}
