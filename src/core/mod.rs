//! The event loop that owns every display controller.
//!
//! [`Core`] holds the gamma controller, both overlay managers, the break
//! session and the solar scheduler, and is the only code that calls into
//! them. Other threads talk to it through the [`SignalMessage`] channel:
//! the signal thread, the config watcher, and any [`CoreHandle`] given to a
//! UI or tray collaborator.
//!
//! Each loop iteration:
//!
//! 1. pumps OS messages so foreground notifications get delivered
//! 2. drains foreground changes into the focus overlay
//! 3. drains channel messages (`Shutdown`, `Reload`, `Command`)
//! 4. fires due break-session ticks and solar events
//! 5. checks display topology every `topology_poll_interval` seconds
//! 6. waits for the next deadline, never longer than one loop slice
//!
//! On exit the controllers are torn down focus first and gamma last, so the
//! original ramp is restored after every overlay is gone.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use crate::common::constants::*;
use crate::common::utils::format_countdown;
use crate::config::{self, Config};
use crate::gamma::GammaRampController;
use crate::geo::{AstronomicalScheduler, SolarEventKind};
use crate::io::lock::LockGuard;
use crate::io::signals::{SignalMessage, SignalState};
use crate::monitors::MonitorRegistry;
use crate::overlay::{DimOverlayManager, FocusOverlayController};
use crate::platform::{MessagePump, Platform};
use crate::session::{BreakMode, BreakSession, SessionEvent};
use crate::time_source::TimeSource;

/// A request from a UI or tray collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    SetFilterEnabled(bool),
    SetTemperature(i32),
    SetDimEnabled(bool),
    SetDimLevel(i32),
    SetFocusEnabled(bool),
    SetFocusDimLevel(i32),
    StartBreaks,
    StopBreaks,
    PauseBreaks,
    ResumeBreaks,
    SkipBreak,
    SetBreakMode(BreakMode),
    SetWorkDuration(i64),
    SetBreakDuration(i64),
    SetForceBreak(bool),
    SetScheduleEnabled(bool),
    SetLocation { latitude: f64, longitude: f64 },
}

/// Cloneable sender for driving a running [`Core`] from another thread.
#[derive(Debug, Clone)]
pub struct CoreHandle {
    sender: Sender<SignalMessage>,
}

impl CoreHandle {
    pub fn new(sender: Sender<SignalMessage>) -> Self {
        Self { sender }
    }

    pub fn send(&self, command: CoreCommand) -> Result<()> {
        self.sender
            .send(SignalMessage::Command(command))
            .map_err(|_| anyhow::anyhow!("Event loop is no longer running"))
    }

    pub fn reload(&self) -> Result<()> {
        self.sender
            .send(SignalMessage::Reload)
            .map_err(|_| anyhow::anyhow!("Event loop is no longer running"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SignalMessage::Shutdown)
            .map_err(|_| anyhow::anyhow!("Event loop is no longer running"))
    }
}

/// Everything needed to build a [`Core`].
pub struct CoreParams {
    pub platform: Platform,
    pub config: Config,
    pub signal_state: SignalState,
    pub time_source: Arc<dyn TimeSource>,
    pub lock: Option<LockGuard>,
}

pub struct Core {
    platform_name: &'static str,
    pump: Box<dyn MessagePump>,
    monitors: MonitorRegistry,
    gamma: GammaRampController,
    dim: DimOverlayManager,
    focus: FocusOverlayController,
    session: BreakSession,
    scheduler: AstronomicalScheduler,
    config: Config,
    signal_state: SignalState,
    time_source: Arc<dyn TimeSource>,
    session_log: Receiver<SessionEvent>,
    next_topology_check: Instant,
    shutdown_requested: bool,
    _lock: Option<LockGuard>,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let CoreParams {
            platform,
            config,
            signal_state,
            time_source,
            lock,
        } = params;

        let (latitude, longitude) = config.coordinates();
        let mut session = BreakSession::new();
        let session_log = session.subscribe();
        let next_topology_check =
            time_source.now() + Duration::from_secs(config.topology_poll_interval());

        Self {
            platform_name: platform.name,
            pump: platform.pump,
            monitors: MonitorRegistry::new(platform.displays),
            gamma: GammaRampController::new(platform.gamma),
            dim: DimOverlayManager::new(platform.surfaces.clone()),
            focus: FocusOverlayController::new(platform.surfaces, platform.foreground),
            session,
            scheduler: AstronomicalScheduler::new(latitude, longitude, config.temperature()),
            config,
            signal_state,
            time_source,
            session_log,
            next_topology_check,
            shutdown_requested: false,
            _lock: lock,
        }
    }

    pub fn handle(&self) -> CoreHandle {
        CoreHandle::new(self.signal_state.signal_sender.clone())
    }

    /// Receive break-session events.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gamma(&self) -> &GammaRampController {
        &self.gamma
    }

    pub fn dim(&self) -> &DimOverlayManager {
        &self.dim
    }

    pub fn focus(&self) -> &FocusOverlayController {
        &self.focus
    }

    pub fn session(&self) -> &BreakSession {
        &self.session
    }

    pub fn scheduler(&self) -> &AstronomicalScheduler {
        &self.scheduler
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested || !self.signal_state.running.load(Ordering::SeqCst)
    }

    /// Bring every controller in line with the loaded configuration.
    pub fn start(&mut self) {
        log_block_start!("Using {} backend", self.platform_name);
        self.monitors.refresh();
        self.apply_config(None);
    }

    /// Run until a shutdown is requested, then tear everything down.
    pub fn run(mut self) -> Result<()> {
        self.start();

        while !self.is_shutting_down() {
            self.step();
            if self.is_shutting_down() {
                break;
            }
            self.wait();
        }

        self.shutdown();
        Ok(())
    }

    /// One loop iteration without waiting.
    pub fn step(&mut self) {
        self.pump.pump();
        self.focus.process_pending();

        loop {
            match self.signal_state.signal_receiver.try_recv() {
                Ok(message) => self.handle_message(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log_warning!("Message channel closed, shutting down");
                    self.shutdown_requested = true;
                    break;
                }
            }
            if self.shutdown_requested {
                return;
            }
        }

        self.advance_timers();
        self.poll_topology();
    }

    /// Block on the channel until the earliest deadline, capped at one slice.
    fn wait(&mut self) {
        let now = self.time_source.now();
        let slice = Duration::from_millis(LOOP_SLICE_MS);
        let timeout = [self.session.next_deadline(), self.scheduler.next_deadline()]
            .into_iter()
            .flatten()
            .map(|deadline| deadline.saturating_duration_since(now))
            .fold(slice, Duration::min);

        match self.signal_state.signal_receiver.recv_timeout(timeout) {
            Ok(message) => self.handle_message(message),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log_warning!("Message channel closed, shutting down");
                self.shutdown_requested = true;
            }
        }
    }

    fn advance_timers(&mut self) {
        let now = self.time_source.now();
        self.session.advance(now);
        self.log_session_events();
        self.scheduler
            .advance(self.time_source.as_ref(), &mut self.gamma);
    }

    fn log_session_events(&mut self) {
        while let Ok(event) = self.session_log.try_recv() {
            match event {
                SessionEvent::BreakStarted { duration, force } => {
                    log_block_start!(
                        "Break time: rest your eyes for {}{}",
                        format_countdown(duration),
                        if force { "" } else { " (skippable)" }
                    );
                }
                SessionEvent::BreakEnded => {
                    log_block_start!("Break over, back to work");
                }
                SessionEvent::Tick { remaining, total } => {
                    if remaining % 60 == 0 && remaining != 0 {
                        log_debug!(
                            "{} of {} left",
                            format_countdown(remaining),
                            format_countdown(total)
                        );
                    }
                }
            }
        }
    }

    fn poll_topology(&mut self) {
        let now = self.time_source.now();
        if now < self.next_topology_check {
            return;
        }
        self.next_topology_check =
            now + Duration::from_secs(self.config.topology_poll_interval());

        if !self.monitors.has_changed() {
            return;
        }

        log_block_start!("Display configuration changed");
        self.monitors.refresh();
        let monitors = self.monitors.list().to_vec();
        self.dim.refresh_for_topology_change(&monitors);
        self.focus.refresh_for_topology_change(&monitors);
    }

    fn handle_message(&mut self, message: SignalMessage) {
        match message {
            SignalMessage::Shutdown => self.shutdown_requested = true,
            SignalMessage::Reload => self.reload(),
            SignalMessage::Command(command) => self.handle_command(command),
        }
    }

    /// Re-read the config file and apply what changed.
    pub fn reload(&mut self) {
        match config::load() {
            Ok(new_config) => self.apply_new_config(new_config),
            Err(e) => {
                log_pipe!();
                log_warning!("Configuration reload failed: {e:#}");
                log_indented!("Keeping the current settings");
            }
        }
    }

    /// Switch to `new_config`, touching only controllers whose settings changed.
    pub fn apply_new_config(&mut self, new_config: Config) {
        if new_config == self.config {
            log_debug!("Configuration unchanged");
            return;
        }
        log_block_start!("Configuration reloaded");
        let previous = std::mem::replace(&mut self.config, new_config);
        self.apply_config(Some(&previous));
    }

    fn apply_config(&mut self, previous: Option<&Config>) {
        let config = self.config.clone();

        // Filter and schedule
        if config.schedule_enabled() {
            let (latitude, longitude) = config.coordinates();
            let moved = previous.is_none_or(|p| p.coordinates() != (latitude, longitude));
            self.scheduler
                .set_temperature(config.temperature(), &mut self.gamma);
            if !self.scheduler.is_running() {
                self.scheduler.set_location(
                    latitude,
                    longitude,
                    self.time_source.as_ref(),
                    &mut self.gamma,
                );
                self.start_schedule();
            } else if moved {
                self.scheduler.set_location(
                    latitude,
                    longitude,
                    self.time_source.as_ref(),
                    &mut self.gamma,
                );
            }
        } else {
            if self.scheduler.is_running() {
                self.scheduler.stop();
            }
            if config.filter_enabled() {
                if !self.gamma.is_enabled() {
                    self.gamma.enable(config.temperature());
                } else if self.gamma.temperature() != config.temperature() {
                    self.gamma.set_temperature(config.temperature());
                }
            } else {
                self.gamma.disable();
            }
        }

        // Dimming
        if config.dim_enabled() {
            let monitors = self.monitors.list().to_vec();
            self.dim.enable(config.dim_level(), &monitors);
        } else {
            self.dim.disable();
        }

        // Focus
        if previous.is_none_or(|p| p.focus_dim_level() != config.focus_dim_level()) {
            self.focus.set_dim_level(config.focus_dim_level());
        }
        if config.focus_enabled() {
            let monitors = self.monitors.list().to_vec();
            self.focus.enable(&monitors);
        } else {
            self.focus.disable();
        }

        // Break session
        let mode = config.break_mode();
        self.session.set_mode(mode);
        if mode == BreakMode::Custom {
            self.session
                .set_work_duration(i64::from(config.work_duration()));
            self.session
                .set_break_duration(i64::from(config.break_duration()));
        }
        self.session.set_force_break(config.force_break());
        if config.break_enabled() {
            self.session.start(self.time_source.now());
        } else {
            self.session.stop();
        }
        self.log_session_events();

        if previous.is_none() {
            config.log_config();
        }
    }

    /// Arm the solar timer. During the day a filter left on from manual
    /// mode is switched off, since the schedule now owns it.
    fn start_schedule(&mut self) {
        self.scheduler
            .start(self.time_source.as_ref(), &mut self.gamma);
        let daytime = self
            .scheduler
            .pending()
            .is_some_and(|event| event.kind == SolarEventKind::Sunset);
        if daytime {
            self.gamma.disable();
        }
    }

    pub fn handle_command(&mut self, command: CoreCommand) {
        log_debug!("Command: {:?}", command);
        let now = self.time_source.now();
        match command {
            CoreCommand::SetFilterEnabled(true) => {
                let temperature = self.config.temperature();
                self.gamma.enable(temperature);
            }
            CoreCommand::SetFilterEnabled(false) => self.gamma.disable(),
            CoreCommand::SetTemperature(kelvin) => {
                self.config.temperature = Some(kelvin.clamp(MINIMUM_TEMP, MAXIMUM_TEMP));
                let kelvin = self.config.temperature();
                self.scheduler.set_temperature(kelvin, &mut self.gamma);
                if !self.scheduler.is_running() && self.gamma.is_enabled() {
                    self.gamma.set_temperature(kelvin);
                }
            }
            CoreCommand::SetDimEnabled(true) => {
                let level = if self.dim.level() == 0 {
                    DEFAULT_DIM_ON
                } else {
                    i32::from(self.dim.level())
                };
                let monitors = self.monitors.list().to_vec();
                self.dim.enable(level, &monitors);
            }
            CoreCommand::SetDimEnabled(false) => self.dim.disable(),
            CoreCommand::SetDimLevel(level) => self.dim.set_brightness(level),
            CoreCommand::SetFocusEnabled(true) => {
                let monitors = self.monitors.list().to_vec();
                self.focus.enable(&monitors);
            }
            CoreCommand::SetFocusEnabled(false) => self.focus.disable(),
            CoreCommand::SetFocusDimLevel(level) => self.focus.set_dim_level(level),
            CoreCommand::StartBreaks => self.session.start(now),
            CoreCommand::StopBreaks => self.session.stop(),
            CoreCommand::PauseBreaks => self.session.pause(),
            CoreCommand::ResumeBreaks => self.session.resume(now),
            CoreCommand::SkipBreak => {
                if self.session.force_break() {
                    log_debug!("Forced break cannot be skipped");
                } else {
                    self.session.skip_break(now);
                }
            }
            CoreCommand::SetBreakMode(mode) => self.session.set_mode(mode),
            CoreCommand::SetWorkDuration(seconds) => self.session.set_work_duration(seconds),
            CoreCommand::SetBreakDuration(seconds) => self.session.set_break_duration(seconds),
            CoreCommand::SetForceBreak(force) => self.session.set_force_break(force),
            CoreCommand::SetScheduleEnabled(true) => {
                if !self.scheduler.is_running() {
                    self.start_schedule();
                }
            }
            CoreCommand::SetScheduleEnabled(false) => {
                if self.scheduler.is_running() {
                    self.scheduler.stop();
                    self.gamma.disable();
                }
            }
            CoreCommand::SetLocation {
                latitude,
                longitude,
            } => {
                let latitude = latitude.clamp(-90.0, 90.0);
                let longitude = longitude.clamp(-180.0, 180.0);
                self.scheduler.set_location(
                    latitude,
                    longitude,
                    self.time_source.as_ref(),
                    &mut self.gamma,
                );
            }
        }
        self.log_session_events();
    }

    /// Tear down in dependency order: overlays, timers, then gamma.
    pub fn shutdown(&mut self) {
        log_block_start!("Shutting down eyeshade...");
        self.focus.disable();
        self.dim.disable();
        self.scheduler.stop();
        self.session.stop();
        self.log_session_events();
        self.gamma.disable();
        log_end!();
    }
}

#[cfg(test)]
mod tests;
