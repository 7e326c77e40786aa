// Turns a captured region into the frame the overlay shows.
// Visual expectation: whatever was under the gaze, scaled up to fill the window.

use image::buffer::ConvertBuffer;
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};

use crate::error::Error;
use crate::types::{FrameBuffer, Size};

pub struct MagnifierCompositor {
    output: Size,
}

impl MagnifierCompositor {
    pub fn new(output: Size) -> Self {
        Self { output }
    }

    pub fn output(&self) -> Size {
        self.output
    }

    /// Drop alpha and resize `raw` (exactly `source` pixels) to the output size
    /// with linear interpolation. Works for both zoom in and zoom out.
    pub fn compose(&self, raw: &RgbaImage, source: Size) -> Result<RgbImage, Error> {
        if raw.dimensions() != (source.width, source.height) {
            return Err(Error::Composite(format!(
                "region buffer is {}x{}, expected {}x{}",
                raw.width(),
                raw.height(),
                source.width,
                source.height
            )));
        }
        if source.is_empty() || self.output.is_empty() {
            return Err(Error::Composite("zero-sized source or output".into()));
        }

        let rgb: RgbImage = raw.convert();
        if (rgb.width(), rgb.height()) == (self.output.width, self.output.height) {
            return Ok(rgb);
        }
        Ok(imageops::resize(&rgb, self.output.width, self.output.height, FilterType::Triangle))
    }
}

/// Pack RGB pixels as 0x00RRGGBB, ready to push to the window.
pub fn to_frame_buffer(img: &RgbImage) -> FrameBuffer {
    let (w, h) = img.dimensions();
    let pixels = img
        .pixels()
        .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
        .collect();
    FrameBuffer { width: w as usize, height: h as usize, pixels }
}
