//! Operating system seams for display control.
//!
//! Every exclusive OS resource the controllers touch sits behind one of the
//! traits in this module:
//!
//! - [`GammaDevice`] reads and writes the hardware gamma ramp of all displays.
//! - [`DisplayEnumerator`] lists attached monitors and their rectangles.
//! - [`SurfaceFactory`] creates borderless, click-through, topmost surfaces.
//! - [`ForegroundSource`] delivers foreground-window change notifications.
//! - [`MessagePump`] drains the OS message queue on the loop thread.
//!
//! [`detect`] builds a [`Platform`] for the running session. On Windows this is
//! the Win32 backend. On Linux it is the wlr-gamma-control Wayland backend,
//! which supports gamma and enumeration only; overlay creation and foreground
//! tracking return errors there and the controllers degrade to inert.
//!
//! All handles are single-threaded and live on the event loop thread.

use anyhow::Result;
use std::rc::Rc;

use crate::gamma::GammaRamp;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;
#[cfg(target_os = "linux")]
pub mod wayland;
#[cfg(windows)]
pub mod windows;

/// Opaque top-level window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

/// Screen rectangle in virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Union of all rectangles, `None` when the iterator is empty.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, rect| match acc {
                Some(bounds) => Some(bounds.union(rect)),
                None => Some(*rect),
            })
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// An attached display as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Opaque OS handle, stable only until the next topology change.
    pub handle: isize,
    pub name: String,
    pub rect: Rect,
    pub is_primary: bool,
}

/// Exclusive access to the hardware gamma ramp.
pub trait GammaDevice {
    /// Read the ramp currently applied to the primary display.
    fn read_ramp(&mut self) -> Result<GammaRamp>;

    /// Apply `ramp` to every attached display.
    fn write_ramp(&mut self, ramp: &GammaRamp) -> Result<()>;
}

pub trait DisplayEnumerator {
    fn enumerate(&mut self) -> Result<Vec<MonitorInfo>>;
}

/// A borderless, input-transparent, topmost surface filled with black.
///
/// Dropping the surface destroys it.
pub trait OverlaySurface {
    fn handle(&self) -> WindowHandle;

    /// Set the surface opacity, 0 fully transparent and 255 opaque.
    fn set_opacity(&mut self, alpha: u8) -> Result<()>;

    fn show(&mut self) -> Result<()>;

    fn hide(&mut self) -> Result<()>;

    /// Re-stack the surface directly below `window` without activating
    /// either window and without moving `window`.
    fn place_behind(&mut self, window: WindowHandle) -> Result<()>;
}

pub trait SurfaceFactory {
    fn create_surface(&self, bounds: Rect) -> Result<Box<dyn OverlaySurface>>;
}

/// Registration for foreground-window change notifications.
///
/// Dropping the subscription unregisters it.
pub trait ForegroundSubscription {
    /// Next pending foreground change, if any. Never blocks.
    fn try_next(&mut self) -> Option<WindowHandle>;
}

pub trait ForegroundSource {
    /// Register for notifications. Events from this process's own windows
    /// are delivered too; consumers filter them.
    fn subscribe(&self) -> Result<Box<dyn ForegroundSubscription>>;

    /// The window that currently has input focus.
    fn current(&self) -> Option<WindowHandle>;
}

pub trait MessagePump {
    /// Dispatch every queued OS message without blocking.
    fn pump(&mut self);
}

/// The set of OS seams for one session.
pub struct Platform {
    pub name: &'static str,
    pub gamma: Box<dyn GammaDevice>,
    pub displays: Box<dyn DisplayEnumerator>,
    pub surfaces: Rc<dyn SurfaceFactory>,
    pub foreground: Rc<dyn ForegroundSource>,
    pub pump: Box<dyn MessagePump>,
}

/// Pick the backend for the running session.
#[cfg(windows)]
pub fn detect() -> Result<Platform> {
    windows::platform()
}

/// Pick the backend for the running session.
#[cfg(target_os = "linux")]
pub fn detect() -> Result<Platform> {
    wayland::platform()
}

#[cfg(not(any(windows, target_os = "linux")))]
pub fn detect() -> Result<Platform> {
    anyhow::bail!("No display backend is available for this operating system")
}
