// The magnifier window, plus the presentation seam the pipeline talks to.
// Visual expectation: a borderless, always-on-top window showing the zoomed
// region, centered on where you look. Hidden = parked off-screen.

use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::debug;

use crate::error::Error;
use crate::magnifier::Command;
use crate::types::{FrameBuffer, Point, Size};

/// What the pipeline needs from whatever owns the window.
pub trait Presenter {
    /// Show this frame from now on.
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Error>;
    /// Move the window's top-left to `top_left` (screen coordinates).
    fn move_to(&mut self, top_left: Point);
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    /// While true the window must not show up in screen captures.
    fn set_capture_excluded(&mut self, excluded: bool);
}

/// Keeps the overlay out of screen captures for as long as it lives.
/// Dropping it restores the window, also when the capture failed.
pub struct CaptureShield<'a, P: Presenter + ?Sized> {
    presenter: &'a mut P,
}

impl<'a, P: Presenter + ?Sized> CaptureShield<'a, P> {
    pub fn new(presenter: &'a mut P) -> Self {
        presenter.set_capture_excluded(true);
        Self { presenter }
    }
}

impl<P: Presenter + ?Sized> Drop for CaptureShield<'_, P> {
    fn drop(&mut self) {
        self.presenter.set_capture_excluded(false);
    }
}

// Far enough off any desktop layout to drop out of a monitor grab.
const PARKED: (isize, isize) = (-32_000, -32_000);

pub struct Overlay {
    window: Window,
    frame: FrameBuffer,
    position: Point,
    visible: bool,
    excluded: bool,
}

impl Overlay {
    /// Create the (initially hidden) overlay window.
    pub fn new(title: &str, size: Size, topmost: bool) -> Result<Self, Error> {
        let options = WindowOptions {
            borderless: true,
            title: false,
            resize: false,
            topmost,
            ..WindowOptions::default()
        };
        let window = Window::new(title, size.width as usize, size.height as usize, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;

        let mut overlay = Self {
            window,
            frame: FrameBuffer::blank(size),
            position: Point::default(),
            visible: false,
            excluded: false,
        };
        overlay.place();
        Ok(overlay)
    }

    /// Returns false when the window was closed (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Process window events and re-show the last frame.
    pub fn pump(&mut self) -> Result<(), Error> {
        self.window
            .update_with_buffer(&self.frame.pixels, self.frame.width, self.frame.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Commands from keys pressed since the last pump.
    pub fn commands(&self) -> Vec<Command> {
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .filter_map(command_for_key)
            .collect()
    }

    fn place(&mut self) {
        let (x, y) = window_position(self.position, self.visible, self.excluded);
        self.window.set_position(x, y);
    }
}

impl Presenter for Overlay {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        self.frame.clone_from(frame);
        self.pump()
    }

    fn move_to(&mut self, top_left: Point) {
        self.position = top_left;
        self.place();
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            debug!(visible, "overlay visibility");
        }
        self.visible = visible;
        self.place();
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_capture_excluded(&mut self, excluded: bool) {
        self.excluded = excluded;
        self.place();
        if excluded {
            // the move must land before the screen is grabbed
            self.window.update();
        }
    }
}

/// Where the window actually sits: its target when shown, parked otherwise.
pub fn window_position(target: Point, visible: bool, excluded: bool) -> (isize, isize) {
    if visible && !excluded {
        (target.x as isize, target.y as isize)
    } else {
        PARKED
    }
}

/// Keyboard shortcuts on the overlay window.
pub fn command_for_key(key: Key) -> Option<Command> {
    match key {
        Key::D => Some(Command::ToggleDwell),
        Key::Equal | Key::NumPadPlus => Some(Command::Increase),
        Key::Minus | Key::NumPadMinus => Some(Command::Decrease),
        Key::H => Some(Command::ToggleVisible),
        Key::R => Some(Command::Restart),
        Key::Escape => Some(Command::Hide),
        Key::Q => Some(Command::Quit),
        _ => None,
    }
}
