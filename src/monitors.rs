//! Cached list of attached displays.

use crate::platform::{DisplayEnumerator, MonitorInfo, Rect};

pub struct MonitorRegistry {
    enumerator: Box<dyn DisplayEnumerator>,
    monitors: Vec<MonitorInfo>,
}

impl MonitorRegistry {
    pub fn new(enumerator: Box<dyn DisplayEnumerator>) -> Self {
        Self {
            enumerator,
            monitors: Vec::new(),
        }
    }

    fn enumerate(&mut self) -> Vec<MonitorInfo> {
        match self.enumerator.enumerate() {
            Ok(monitors) => monitors,
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to enumerate displays: {e}");
                Vec::new()
            }
        }
    }

    /// Re-enumerate and replace the cached list in one step.
    pub fn refresh(&mut self) {
        self.monitors = self.enumerate();
        log_debug!("Found {} display(s)", self.monitors.len());
        for monitor in &self.monitors {
            log_debug!(
                "{}: {}{}",
                monitor.name,
                monitor.rect,
                if monitor.is_primary { " (primary)" } else { "" }
            );
        }
    }

    /// Cached displays, enumerating first if the cache is empty.
    pub fn list(&mut self) -> &[MonitorInfo] {
        if self.monitors.is_empty() {
            self.refresh();
        }
        &self.monitors
    }

    /// Rectangle spanning every display.
    pub fn virtual_bounds(&mut self) -> Option<Rect> {
        Rect::union_all(self.list().iter().map(|m| &m.rect))
    }

    /// Whether a fresh enumeration differs from the cache.
    ///
    /// A failed enumeration never counts as a change.
    pub fn has_changed(&mut self) -> bool {
        match self.enumerator.enumerate() {
            Ok(current) => current != self.monitors,
            Err(_) => false,
        }
    }
}
