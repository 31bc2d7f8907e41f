//! In-memory platform used by unit and integration tests.
//!
//! Every seam records what the controllers did to it in a shared
//! [`FakeState`], and tests can inject monitors, foreground changes and
//! failures through the same handle.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use super::{
    DisplayEnumerator, ForegroundSource, ForegroundSubscription, GammaDevice, MessagePump,
    MonitorInfo, OverlaySurface, Platform, Rect, SurfaceFactory, WindowHandle,
};
use crate::gamma::GammaRamp;

/// Recorded state of one live fake surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSurface {
    pub bounds: Rect,
    pub opacity: u8,
    pub visible: bool,
    pub behind: Option<WindowHandle>,
    pub restack_count: usize,
}

#[derive(Debug)]
pub struct FakeState {
    pub hardware_ramp: GammaRamp,
    pub ramp_writes: usize,
    pub fail_read: bool,
    pub fail_write: bool,
    pub monitors: Vec<MonitorInfo>,
    pub fail_enumerate: bool,
    pub surfaces: BTreeMap<isize, FakeSurface>,
    pub surfaces_created: usize,
    pub fail_create: bool,
    pub subscribed: bool,
    pub fail_subscribe: bool,
    pub pending_foreground: VecDeque<WindowHandle>,
    pub foreground: Option<WindowHandle>,
    pub pumps: usize,
    next_handle: isize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            hardware_ramp: GammaRamp::identity(),
            ramp_writes: 0,
            fail_read: false,
            fail_write: false,
            monitors: Vec::new(),
            fail_enumerate: false,
            surfaces: BTreeMap::new(),
            surfaces_created: 0,
            fail_create: false,
            subscribed: false,
            fail_subscribe: false,
            pending_foreground: VecDeque::new(),
            foreground: None,
            pumps: 0,
            next_handle: 0x1000,
        }
    }
}

pub type SharedState = Rc<RefCell<FakeState>>;

/// Build a monitor entry for tests.
pub fn monitor(handle: isize, x: i32, y: i32, width: i32, height: i32) -> MonitorInfo {
    MonitorInfo {
        handle,
        name: format!("DISPLAY{handle}"),
        rect: Rect::new(x, y, width, height),
        is_primary: x == 0 && y == 0,
    }
}

/// Handle to a fake OS shared by every seam it hands out.
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: SharedState,
}

impl FakePlatform {
    pub fn new(monitors: Vec<MonitorInfo>) -> Self {
        let fake = Self::default();
        fake.state.borrow_mut().monitors = monitors;
        fake
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn platform(&self) -> Platform {
        Platform {
            name: "Fake",
            gamma: self.gamma_device(),
            displays: self.enumerator(),
            surfaces: self.surfaces(),
            foreground: self.foreground(),
            pump: Box::new(FakePump {
                state: self.state.clone(),
            }),
        }
    }

    pub fn gamma_device(&self) -> Box<dyn GammaDevice> {
        Box::new(FakeGamma {
            state: self.state.clone(),
        })
    }

    pub fn enumerator(&self) -> Box<dyn DisplayEnumerator> {
        Box::new(FakeDisplays {
            state: self.state.clone(),
        })
    }

    pub fn surfaces(&self) -> Rc<dyn SurfaceFactory> {
        Rc::new(FakeSurfaces {
            state: self.state.clone(),
        })
    }

    pub fn foreground(&self) -> Rc<dyn ForegroundSource> {
        Rc::new(FakeForeground {
            state: self.state.clone(),
        })
    }

    /// Queue a foreground change as the OS hook would.
    pub fn push_foreground(&self, window: WindowHandle) {
        let mut state = self.state.borrow_mut();
        state.foreground = Some(window);
        if state.subscribed {
            state.pending_foreground.push_back(window);
        }
    }

    pub fn set_monitors(&self, monitors: Vec<MonitorInfo>) {
        self.state.borrow_mut().monitors = monitors;
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.borrow().surfaces.len()
    }

    pub fn surface_snapshots(&self) -> Vec<FakeSurface> {
        self.state.borrow().surfaces.values().cloned().collect()
    }

    pub fn hardware_ramp(&self) -> GammaRamp {
        self.state.borrow().hardware_ramp.clone()
    }
}

struct FakeGamma {
    state: SharedState,
}

impl GammaDevice for FakeGamma {
    fn read_ramp(&mut self) -> Result<GammaRamp> {
        let state = self.state.borrow();
        if state.fail_read {
            bail!("fake gamma read failure");
        }
        Ok(state.hardware_ramp.clone())
    }

    fn write_ramp(&mut self, ramp: &GammaRamp) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_write {
            bail!("fake gamma write failure");
        }
        state.hardware_ramp = ramp.clone();
        state.ramp_writes += 1;
        Ok(())
    }
}

struct FakeDisplays {
    state: SharedState,
}

impl DisplayEnumerator for FakeDisplays {
    fn enumerate(&mut self) -> Result<Vec<MonitorInfo>> {
        let state = self.state.borrow();
        if state.fail_enumerate {
            bail!("fake enumeration failure");
        }
        Ok(state.monitors.clone())
    }
}

struct FakeSurfaces {
    state: SharedState,
}

impl SurfaceFactory for FakeSurfaces {
    fn create_surface(&self, bounds: Rect) -> Result<Box<dyn OverlaySurface>> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            bail!("fake surface creation failure");
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.surfaces_created += 1;
        state.surfaces.insert(
            handle,
            FakeSurface {
                bounds,
                opacity: 0,
                visible: false,
                behind: None,
                restack_count: 0,
            },
        );
        Ok(Box::new(FakeSurfaceHandle {
            handle,
            state: self.state.clone(),
        }))
    }
}

struct FakeSurfaceHandle {
    handle: isize,
    state: SharedState,
}

impl FakeSurfaceHandle {
    fn with_surface(&self, update: impl FnOnce(&mut FakeSurface)) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match state.surfaces.get_mut(&self.handle) {
            Some(surface) => {
                update(surface);
                Ok(())
            }
            None => bail!("surface {:#x} was already destroyed", self.handle),
        }
    }
}

impl OverlaySurface for FakeSurfaceHandle {
    fn handle(&self) -> WindowHandle {
        WindowHandle(self.handle)
    }

    fn set_opacity(&mut self, alpha: u8) -> Result<()> {
        self.with_surface(|s| s.opacity = alpha)
    }

    fn show(&mut self) -> Result<()> {
        self.with_surface(|s| s.visible = true)
    }

    fn hide(&mut self) -> Result<()> {
        self.with_surface(|s| s.visible = false)
    }

    fn place_behind(&mut self, window: WindowHandle) -> Result<()> {
        self.with_surface(|s| {
            s.behind = Some(window);
            s.restack_count += 1;
        })
    }
}

impl Drop for FakeSurfaceHandle {
    fn drop(&mut self) {
        self.state.borrow_mut().surfaces.remove(&self.handle);
    }
}

struct FakeForeground {
    state: SharedState,
}

impl ForegroundSource for FakeForeground {
    fn subscribe(&self) -> Result<Box<dyn ForegroundSubscription>> {
        let mut state = self.state.borrow_mut();
        if state.fail_subscribe {
            bail!("fake hook registration failure");
        }
        if state.subscribed {
            bail!("foreground hook already registered");
        }
        state.subscribed = true;
        Ok(Box::new(FakeSubscription {
            state: self.state.clone(),
        }))
    }

    fn current(&self) -> Option<WindowHandle> {
        self.state.borrow().foreground
    }
}

struct FakeSubscription {
    state: SharedState,
}

impl ForegroundSubscription for FakeSubscription {
    fn try_next(&mut self) -> Option<WindowHandle> {
        self.state.borrow_mut().pending_foreground.pop_front()
    }
}

impl Drop for FakeSubscription {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.subscribed = false;
        state.pending_foreground.clear();
    }
}

struct FakePump {
    state: SharedState,
}

impl MessagePump for FakePump {
    fn pump(&mut self) {
        self.state.borrow_mut().pumps += 1;
    }
}
