//! Desktop-spanning overlay that dims everything except the active window.
//!
//! A single surface covers the union of all displays. Each time the
//! foreground window changes, the surface is re-stacked directly underneath
//! it, so the active window stays clear while everything behind it is dimmed.

use anyhow::{Context, Result};
use std::rc::Rc;

use crate::common::constants::{DEFAULT_FOCUS_DIM, MAXIMUM_FOCUS_DIM, MINIMUM_FOCUS_DIM};
use crate::common::utils::clamp_level;
use crate::platform::{
    ForegroundSource, ForegroundSubscription, MonitorInfo, OverlaySurface, Rect, SurfaceFactory,
    WindowHandle,
};

enum FocusState {
    Disabled,
    Active {
        surface: Box<dyn OverlaySurface>,
        subscription: Box<dyn ForegroundSubscription>,
    },
}

pub struct FocusOverlayController {
    factory: Rc<dyn SurfaceFactory>,
    foreground: Rc<dyn ForegroundSource>,
    dim_level: u8,
    state: FocusState,
}

impl FocusOverlayController {
    pub fn new(factory: Rc<dyn SurfaceFactory>, foreground: Rc<dyn ForegroundSource>) -> Self {
        Self {
            factory,
            foreground,
            dim_level: DEFAULT_FOCUS_DIM as u8,
            state: FocusState::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, FocusState::Active { .. })
    }

    pub fn dim_level(&self) -> u8 {
        self.dim_level
    }

    /// Handle of the overlay surface while active.
    pub fn overlay_handle(&self) -> Option<WindowHandle> {
        match &self.state {
            FocusState::Active { surface, .. } => Some(surface.handle()),
            FocusState::Disabled => None,
        }
    }

    /// Cover the virtual desktop and start following the foreground window.
    ///
    /// Any failure leaves the controller disabled with nothing allocated.
    pub fn enable(&mut self, monitors: &[MonitorInfo]) {
        if self.is_active() {
            return;
        }
        match self.activate(monitors) {
            Ok(()) => log_debug!("Focus mode enabled"),
            Err(e) => {
                log_pipe!();
                log_warning!("Focus mode unavailable: {e:#}");
                self.state = FocusState::Disabled;
            }
        }
    }

    fn activate(&mut self, monitors: &[MonitorInfo]) -> Result<()> {
        let bounds = Rect::union_all(monitors.iter().map(|m| &m.rect))
            .context("no displays to cover")?;

        let mut surface = self
            .factory
            .create_surface(bounds)
            .context("failed to create the focus overlay")?;
        surface.set_opacity(self.dim_level)?;
        surface.show()?;

        // On error the surface is dropped here, which destroys it
        let subscription = self
            .foreground
            .subscribe()
            .context("failed to register for foreground changes")?;

        self.state = FocusState::Active {
            surface,
            subscription,
        };

        if let Some(window) = self.foreground.current() {
            self.on_foreground_changed(window);
        }
        Ok(())
    }

    /// Stack the overlay directly below `window`.
    ///
    /// Notifications about the overlay itself are ignored.
    pub fn on_foreground_changed(&mut self, window: WindowHandle) {
        let FocusState::Active { surface, .. } = &mut self.state else {
            return;
        };
        if surface.handle() == window {
            return;
        }
        if let Err(e) = surface.place_behind(window) {
            log_debug!("Could not restack focus overlay behind {:#x}: {e}", window.0);
        }
    }

    /// Drain queued foreground notifications. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match &mut self.state {
                FocusState::Active { subscription, .. } => subscription.try_next(),
                FocusState::Disabled => None,
            };
            let Some(window) = next else {
                break;
            };
            self.on_foreground_changed(window);
            handled += 1;
        }
        handled
    }

    /// Unregister, hide and destroy.
    pub fn disable(&mut self) {
        if let FocusState::Active {
            mut surface,
            subscription,
        } = std::mem::replace(&mut self.state, FocusState::Disabled)
        {
            drop(subscription);
            if let Err(e) = surface.hide() {
                log_debug!("Hiding focus overlay failed: {e}");
            }
            log_debug!("Focus mode disabled");
        }
    }

    pub fn set_dim_level(&mut self, level: i32) {
        self.dim_level = clamp_level(level, MINIMUM_FOCUS_DIM, MAXIMUM_FOCUS_DIM);
        if let FocusState::Active { surface, .. } = &mut self.state
            && let Err(e) = surface.set_opacity(self.dim_level)
        {
            log_warning!("Failed to repaint focus overlay: {e}");
        }
    }

    /// Rebuild the overlay so it spans a new set of displays.
    pub fn refresh_for_topology_change(&mut self, monitors: &[MonitorInfo]) {
        if self.is_active() {
            self.disable();
            self.enable(monitors);
        }
    }
}
