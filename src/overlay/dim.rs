//! Per-display dimming surfaces.

use std::rc::Rc;

use crate::common::constants::{MAXIMUM_DIM, MINIMUM_DIM};
use crate::common::utils::clamp_level;
use crate::platform::{MonitorInfo, OverlaySurface, SurfaceFactory};

/// One translucent black surface per display, all at the same opacity.
pub struct DimOverlayManager {
    factory: Rc<dyn SurfaceFactory>,
    surfaces: Vec<Box<dyn OverlaySurface>>,
    enabled: bool,
    level: u8,
}

impl DimOverlayManager {
    pub fn new(factory: Rc<dyn SurfaceFactory>) -> Self {
        Self {
            factory,
            surfaces: Vec::new(),
            enabled: false,
            level: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Cover every display at `level`. When already enabled this only
    /// changes the level.
    pub fn enable(&mut self, level: i32, monitors: &[MonitorInfo]) {
        if self.enabled {
            self.set_brightness(level);
            return;
        }

        self.level = clamp_level(level, MINIMUM_DIM, MAXIMUM_DIM);
        for monitor in monitors {
            match self.create_for(monitor) {
                Ok(surface) => self.surfaces.push(surface),
                Err(e) => {
                    log_pipe!();
                    log_warning!("Failed to create dim overlay on {}: {e}", monitor.name);
                }
            }
        }

        if self.surfaces.is_empty() {
            log_warning!("Screen dimming has no displays to cover");
        }
        self.enabled = true;
        log_debug!(
            "Screen dimming enabled at {} on {} display(s)",
            self.level,
            self.surfaces.len()
        );
    }

    fn create_for(&self, monitor: &MonitorInfo) -> anyhow::Result<Box<dyn OverlaySurface>> {
        let mut surface = self.factory.create_surface(monitor.rect)?;
        surface.set_opacity(self.level)?;
        surface.show()?;
        Ok(surface)
    }

    /// Change the opacity of every live surface.
    pub fn set_brightness(&mut self, level: i32) {
        self.level = clamp_level(level, MINIMUM_DIM, MAXIMUM_DIM);
        for surface in &mut self.surfaces {
            if let Err(e) = surface.set_opacity(self.level) {
                log_warning!("Failed to update dim overlay opacity: {e}");
            }
        }
    }

    /// Hide and destroy every surface.
    pub fn disable(&mut self) {
        for mut surface in self.surfaces.drain(..) {
            if let Err(e) = surface.hide() {
                log_debug!("Hiding dim overlay failed: {e}");
            }
        }
        if self.enabled {
            log_debug!("Screen dimming disabled");
        }
        self.enabled = false;
    }

    /// Rebuild the surfaces for a new set of displays, keeping the level.
    pub fn refresh_for_topology_change(&mut self, monitors: &[MonitorInfo]) {
        if !self.enabled {
            return;
        }
        let level = self.level as i32;
        self.disable();
        self.enable(level, monitors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{FakePlatform, monitor};

    fn setup() -> (FakePlatform, DimOverlayManager, Vec<MonitorInfo>) {
        crate::logger::Log::set_enabled(false);
        let monitors = vec![
            monitor(1, 0, 0, 1920, 1080),
            monitor(2, 1920, 0, 2560, 1440),
        ];
        let fake = FakePlatform::new(monitors.clone());
        let manager = DimOverlayManager::new(fake.surfaces());
        (fake, manager, monitors)
    }

    #[test]
    fn one_visible_surface_per_display() {
        let (fake, mut dim, monitors) = setup();
        dim.enable(80, &monitors);
        let surfaces = fake.surface_snapshots();
        assert_eq!(surfaces.len(), 2);
        assert!(surfaces.iter().all(|s| s.visible && s.opacity == 80));
        assert_eq!(surfaces[1].bounds, monitors[1].rect);
    }

    #[test]
    fn enable_disable_leaves_nothing_behind() {
        let (fake, mut dim, monitors) = setup();
        dim.enable(100, &monitors);
        dim.disable();
        assert_eq!(fake.live_surfaces(), 0);
        assert!(!dim.is_enabled());
        dim.disable();
        assert_eq!(fake.live_surfaces(), 0);
    }

    #[test]
    fn brightness_is_clamped() {
        let (fake, mut dim, monitors) = setup();
        dim.enable(500, &monitors);
        assert_eq!(dim.level(), 200);
        dim.set_brightness(-3);
        assert_eq!(dim.level(), 0);
        assert!(fake.surface_snapshots().iter().all(|s| s.opacity == 0));
    }

    #[test]
    fn enabling_twice_only_changes_level() {
        let (fake, mut dim, monitors) = setup();
        dim.enable(50, &monitors);
        dim.enable(120, &monitors);
        assert_eq!(fake.state().borrow().surfaces_created, 2);
        assert!(fake.surface_snapshots().iter().all(|s| s.opacity == 120));
    }

    #[test]
    fn topology_change_recreates_at_previous_level() {
        let (fake, mut dim, monitors) = setup();
        dim.enable(90, &monitors);
        let single = vec![monitor(3, 0, 0, 1280, 800)];
        dim.refresh_for_topology_change(&single);
        let surfaces = fake.surface_snapshots();
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].opacity, 90);
        assert_eq!(surfaces[0].bounds, single[0].rect);
    }

    #[test]
    fn topology_change_while_disabled_is_ignored() {
        let (fake, mut dim, monitors) = setup();
        dim.refresh_for_topology_change(&monitors);
        assert_eq!(fake.live_surfaces(), 0);
        assert!(!dim.is_enabled());
    }

    #[test]
    fn creation_failure_degrades_to_no_surfaces() {
        let (fake, mut dim, monitors) = setup();
        fake.state().borrow_mut().fail_create = true;
        dim.enable(60, &monitors);
        assert!(dim.is_enabled());
        assert_eq!(dim.surface_count(), 0);
        dim.disable();
    }
}
