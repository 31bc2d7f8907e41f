//! Wayland backend using wlr-gamma-control-unstable-v1.
//!
//! Works on wlroots-based compositors (Sway, Hyprland, river, Wayfire, labwc,
//! niri). The protocol offers write-only gamma tables per output, so
//! [`GammaDevice::read_ramp`] reports the identity ramp the compositor
//! restores when the control object is destroyed. Output geometry comes from
//! `wl_output` geometry, mode and name events.
//!
//! Layer-shell overlays and foreground tracking are not implemented here;
//! the surface factory and foreground source return errors and the overlay
//! controllers stay disabled.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::{Seek, SeekFrom, Write};
use std::os::fd::AsFd;
use std::rc::Rc;

use wayland_client::{
    Connection, Dispatch, EventQueue, Proxy, QueueHandle, WEnum,
    protocol::{wl_output, wl_output::WlOutput, wl_registry::WlRegistry},
};
use wayland_protocols_wlr::gamma_control::v1::client::{
    zwlr_gamma_control_manager_v1::ZwlrGammaControlManagerV1,
    zwlr_gamma_control_v1::{Event as GammaControlEvent, ZwlrGammaControlV1},
};

use super::{
    DisplayEnumerator, ForegroundSource, ForegroundSubscription, GammaDevice, MessagePump,
    MonitorInfo, OverlaySurface, Platform, Rect, SurfaceFactory, WindowHandle,
};
use crate::common::constants::RAMP_SIZE;
use crate::gamma::GammaRamp;

#[derive(Debug)]
struct OutputInfo {
    output: WlOutput,
    registry_name: u32,
    name: String,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    gamma_control: Option<ZwlrGammaControlV1>,
    gamma_size: Option<usize>,
    /// Set when the output has not yet received the current ramp.
    needs_apply: bool,
}

#[derive(Debug, Default)]
struct State {
    gamma_manager: Option<ZwlrGammaControlManagerV1>,
    outputs: Vec<OutputInfo>,
}

impl State {
    fn setup_gamma_controls(&mut self, qh: &QueueHandle<State>) {
        let Some(manager) = &self.gamma_manager else {
            return;
        };
        for output in &mut self.outputs {
            if output.gamma_control.is_none() {
                output.gamma_control = Some(manager.get_gamma_control(&output.output, qh, ()));
                output.needs_apply = true;
            }
        }
    }
}

/// Connection state shared by the gamma device, enumerator and pump.
struct Session {
    connection: Connection,
    event_queue: EventQueue<State>,
    state: State,
    /// Last ramp written, replayed onto hot-plugged outputs.
    current_ramp: Option<GammaRamp>,
}

type SharedSession = Rc<RefCell<Session>>;

impl Session {
    fn connect() -> Result<Self> {
        if std::env::var_os("WAYLAND_DISPLAY").is_none() {
            anyhow::bail!("WAYLAND_DISPLAY is not set. Are you running on Wayland?");
        }

        let connection =
            Connection::connect_to_env().context("Failed to connect to Wayland display")?;
        let mut event_queue = connection.new_event_queue();
        let qh = event_queue.handle();
        let mut state = State::default();

        let _registry = connection.display().get_registry(&qh, ());
        event_queue
            .roundtrip(&mut state)
            .context("Failed to enumerate Wayland globals")?;

        if state.gamma_manager.is_none() {
            anyhow::bail!(
                "Compositor does not support wlr-gamma-control-unstable-v1 (KWin and Mutter are unsupported)"
            );
        }

        state.setup_gamma_controls(&qh);
        // Second roundtrip delivers output names, modes and gamma sizes.
        event_queue
            .roundtrip(&mut state)
            .context("Failed during roundtrip after setting up gamma controls")?;

        Ok(Self {
            connection,
            event_queue,
            state,
            current_ramp: None,
        })
    }

    /// Read pending events from the socket, including output hot-plug.
    fn sync(&mut self) -> Result<()> {
        self.event_queue
            .roundtrip(&mut self.state)
            .context("Wayland roundtrip failed")?;

        if self.state.outputs.iter().any(|o| o.gamma_control.is_none()) {
            let qh = self.event_queue.handle();
            self.state.setup_gamma_controls(&qh);
            self.event_queue
                .roundtrip(&mut self.state)
                .context("Wayland roundtrip failed")?;
        }

        if let Some(ramp) = self.current_ramp.clone()
            && self.state.outputs.iter().any(|o| o.needs_apply)
        {
            self.apply(&ramp, false)?;
        }
        Ok(())
    }

    /// Send `ramp` to outputs. With `all` false only outputs still waiting
    /// for the current ramp are updated.
    fn apply(&mut self, ramp: &GammaRamp, all: bool) -> Result<()> {
        // Temp files must outlive the roundtrip that hands them over.
        let mut files = Vec::new();
        let mut applied = 0;

        for output in &mut self.state.outputs {
            if !all && !output.needs_apply {
                continue;
            }
            let (Some(control), Some(size)) = (&output.gamma_control, output.gamma_size) else {
                continue;
            };

            let mut file = tempfile::tempfile().context("Failed to create temporary file")?;
            file.write_all(&encode_table(ramp, size))
                .context("Failed to write gamma data")?;
            file.flush().context("Failed to flush gamma data")?;
            // The compositor reads from the current offset.
            file.seek(SeekFrom::Start(0))
                .context("Failed to reset file position")?;

            control.set_gamma(file.as_fd());
            files.push(file);
            output.needs_apply = false;
            applied += 1;
        }

        self.connection.flush().context("Failed to flush Wayland connection")?;
        self.event_queue
            .roundtrip(&mut self.state)
            .context("Wayland roundtrip failed")?;
        drop(files);

        log_debug!("Applied gamma table to {} output(s)", applied);
        Ok(())
    }
}

/// Resample a 256-entry channel to `size` entries by linear interpolation.
pub(crate) fn resample(channel: &[u16; RAMP_SIZE], size: usize) -> Vec<u16> {
    if size == 0 {
        return Vec::new();
    }
    if size == 1 {
        return vec![channel[0]];
    }
    let last = (RAMP_SIZE - 1) as f64;
    (0..size)
        .map(|j| {
            let pos = j as f64 * last / (size - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = (lower + 1).min(RAMP_SIZE - 1);
            let frac = pos - lower as f64;
            let value = channel[lower] as f64 * (1.0 - frac) + channel[upper] as f64 * frac;
            value.round().clamp(0.0, u16::MAX as f64) as u16
        })
        .collect()
}

/// Gamma table in the layout the protocol expects: all red, then green,
/// then blue, native-endian u16.
pub(crate) fn encode_table(ramp: &GammaRamp, size: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size * 3 * 2);
    for channel in ramp.channels() {
        for value in resample(channel, size) {
            bytes.extend_from_slice(&value.to_ne_bytes());
        }
    }
    bytes
}

struct WaylandGamma {
    session: SharedSession,
}

impl GammaDevice for WaylandGamma {
    fn read_ramp(&mut self) -> Result<GammaRamp> {
        Ok(GammaRamp::identity())
    }

    fn write_ramp(&mut self, ramp: &GammaRamp) -> Result<()> {
        let mut session = self.session.borrow_mut();
        if !session.state.outputs.iter().any(|o| o.gamma_size.is_some()) {
            anyhow::bail!("No outputs are available for gamma control");
        }
        session.current_ramp = Some(ramp.clone());
        session.apply(ramp, true)
    }
}

struct WaylandDisplays {
    session: SharedSession,
}

impl DisplayEnumerator for WaylandDisplays {
    fn enumerate(&mut self) -> Result<Vec<MonitorInfo>> {
        let mut session = self.session.borrow_mut();
        session.sync()?;
        Ok(session
            .state
            .outputs
            .iter()
            .enumerate()
            .map(|(index, output)| MonitorInfo {
                handle: output.registry_name as isize,
                name: output.name.clone(),
                rect: Rect::new(output.x, output.y, output.width, output.height),
                is_primary: index == 0,
            })
            .collect())
    }
}

struct WaylandPump {
    session: SharedSession,
}

impl MessagePump for WaylandPump {
    fn pump(&mut self) {
        let mut session = self.session.borrow_mut();
        let Session {
            connection,
            event_queue,
            state,
            ..
        } = &mut *session;
        let _ = connection.flush();
        if let Some(guard) = event_queue.prepare_read() {
            // Non-blocking: the socket is only read when data is ready.
            let _ = guard.read();
        }
        if let Err(e) = event_queue.dispatch_pending(state) {
            log_debug!("Wayland event dispatch failed: {e}");
        }
    }
}

struct NoOverlays;

impl SurfaceFactory for NoOverlays {
    fn create_surface(&self, _bounds: Rect) -> Result<Box<dyn OverlaySurface>> {
        anyhow::bail!("Overlay surfaces are not supported on Wayland")
    }
}

struct NoForeground;

impl ForegroundSource for NoForeground {
    fn subscribe(&self) -> Result<Box<dyn ForegroundSubscription>> {
        anyhow::bail!("Foreground window tracking is not supported on Wayland")
    }

    fn current(&self) -> Option<WindowHandle> {
        None
    }
}

/// Connect to the compositor and build the Wayland platform.
pub fn platform() -> Result<Platform> {
    let session = Rc::new(RefCell::new(Session::connect()?));
    Ok(Platform {
        name: "Wayland",
        gamma: Box::new(WaylandGamma {
            session: session.clone(),
        }),
        displays: Box::new(WaylandDisplays {
            session: session.clone(),
        }),
        surfaces: Rc::new(NoOverlays),
        foreground: Rc::new(NoForeground),
        pump: Box::new(WaylandPump { session }),
    })
}

impl Dispatch<WlRegistry, ()> for State {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: <WlRegistry as Proxy>::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        use wayland_client::protocol::wl_registry::Event;

        match event {
            Event::Global {
                name,
                interface,
                version,
            } => match interface.as_str() {
                "zwlr_gamma_control_manager_v1" => {
                    state.gamma_manager =
                        Some(registry.bind::<ZwlrGammaControlManagerV1, _, _>(name, 1, qh, ()));
                }
                "wl_output" => {
                    let output = registry.bind::<WlOutput, _, _>(name, version.min(4), qh, ());
                    state.outputs.push(OutputInfo {
                        output,
                        registry_name: name,
                        name: format!("output-{name}"),
                        x: 0,
                        y: 0,
                        width: 0,
                        height: 0,
                        gamma_control: None,
                        gamma_size: None,
                        needs_apply: true,
                    });
                }
                _ => {}
            },
            Event::GlobalRemove { name } => {
                state.outputs.retain(|output| {
                    if output.registry_name == name {
                        log_debug!("Output removed: {}", output.name);
                        false
                    } else {
                        true
                    }
                });
            }
            _ => {}
        }
    }
}

impl Dispatch<ZwlrGammaControlManagerV1, ()> for State {
    fn event(
        _: &mut Self,
        _: &ZwlrGammaControlManagerV1,
        _: <ZwlrGammaControlManagerV1 as Proxy>::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwlrGammaControlV1, ()> for State {
    fn event(
        state: &mut Self,
        gamma_control: &ZwlrGammaControlV1,
        event: GammaControlEvent,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let Some(output) = state
            .outputs
            .iter_mut()
            .find(|o| o.gamma_control.as_ref() == Some(gamma_control))
        else {
            return;
        };

        match event {
            GammaControlEvent::GammaSize { size } => {
                output.gamma_size = Some(size as usize);
                output.needs_apply = true;
                log_debug!("Output '{}' gamma size: {}", output.name, size);
            }
            GammaControlEvent::Failed => {
                // Another client holds the control; retry on the next sync.
                log_warning!("Gamma control failed for output '{}'", output.name);
                output.gamma_control = None;
                output.gamma_size = None;
                output.needs_apply = true;
            }
            _ => {}
        }
    }
}

impl Dispatch<WlOutput, ()> for State {
    fn event(
        state: &mut Self,
        output: &WlOutput,
        event: <WlOutput as Proxy>::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let Some(info) = state.outputs.iter_mut().find(|o| &o.output == output) else {
            return;
        };

        match event {
            wl_output::Event::Geometry { x, y, .. } => {
                info.x = x;
                info.y = y;
            }
            wl_output::Event::Mode {
                flags,
                width,
                height,
                ..
            } => {
                if let WEnum::Value(flags) = flags
                    && flags.contains(wl_output::Mode::Current)
                {
                    info.width = width;
                    info.height = height;
                }
            }
            wl_output::Event::Name { name } => {
                log_debug!("Output identified: {}", name);
                info.name = name;
            }
            _ => {}
        }
    }
}
