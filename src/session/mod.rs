//! Work/break cycle driven by a one-second tick.
//!
//! The session alternates between a work phase and a break phase. Pausing
//! freezes the countdown in either phase. The session never sleeps or spawns
//! timers itself: the owner calls [`BreakSession::advance`] with the current
//! instant and waits until [`BreakSession::next_deadline`] in between.
//!
//! ```text
//!  Stopped ──start──▶ Working ──(0s)──▶ OnBreak ──(0s)──▶ Working ...
//!     ▲                  │  ▲              │ skip_break ──────┘
//!     └────── stop ──────┴──┴──────────────┘
//! ```

pub mod events;

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crate::common::constants::*;
pub use events::{EventBus, SessionEvent};

const TICK: Duration = Duration::from_secs(1);

/// Work/break duration preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakMode {
    /// 25 minutes of work, 5 minutes of rest.
    Pomodoro,
    /// Every 20 minutes, look away for 20 seconds.
    TwentyTwentyTwenty,
    /// Durations are set explicitly.
    Custom,
}

impl BreakMode {
    /// Preset durations as `(work, break)` seconds. `None` for custom.
    pub fn durations(self) -> Option<(u32, u32)> {
        match self {
            BreakMode::Pomodoro => Some((POMODORO_WORK, POMODORO_BREAK)),
            BreakMode::TwentyTwentyTwenty => Some((TWENTY_WORK, TWENTY_BREAK)),
            BreakMode::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreakMode::Pomodoro => "pomodoro",
            BreakMode::TwentyTwentyTwenty => "20-20-20",
            BreakMode::Custom => "custom",
        }
    }
}

impl fmt::Display for BreakMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pomodoro" => Ok(BreakMode::Pomodoro),
            "20-20-20" | "twenty-twenty-twenty" => Ok(BreakMode::TwentyTwentyTwenty),
            "custom" => Ok(BreakMode::Custom),
            other => anyhow::bail!(
                "Unknown break mode '{other}' (expected \"pomodoro\", \"20-20-20\", \"twenty-twenty-twenty\" or \"custom\")"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Working,
    OnBreak,
}

pub struct BreakSession {
    mode: BreakMode,
    work_duration: u32,
    break_duration: u32,
    remaining: u32,
    total: u32,
    phase: Phase,
    paused: bool,
    force_break: bool,
    next_tick: Option<Instant>,
    bus: EventBus,
}

fn clamp_duration(seconds: i64) -> u32 {
    seconds.clamp(MINIMUM_DURATION as i64, u32::MAX as i64) as u32
}

impl Default for BreakSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakSession {
    pub fn new() -> Self {
        Self {
            mode: BreakMode::Pomodoro,
            work_duration: POMODORO_WORK,
            break_duration: POMODORO_BREAK,
            remaining: 0,
            total: 0,
            phase: Phase::Stopped,
            paused: false,
            force_break: DEFAULT_FORCE_BREAK,
            next_tick: None,
            bus: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != Phase::Stopped
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_on_break(&self) -> bool {
        self.phase == Phase::OnBreak
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn mode(&self) -> BreakMode {
        self.mode
    }

    pub fn work_duration(&self) -> u32 {
        self.work_duration
    }

    pub fn break_duration(&self) -> u32 {
        self.break_duration
    }

    pub fn force_break(&self) -> bool {
        self.force_break
    }

    /// When the next tick is due, `None` while stopped or paused.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Begin a work phase. Ignored if the session is already running.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            log_debug!("Break session already running");
            return;
        }
        self.phase = Phase::Working;
        self.paused = false;
        self.remaining = self.work_duration;
        self.total = self.work_duration;
        self.next_tick = Some(now + TICK);
        log_debug!("Break session started ({}, {}s work)", self.mode, self.work_duration);
    }

    /// Stop from any state. A break in progress is reported as ended.
    pub fn stop(&mut self) {
        if self.phase == Phase::OnBreak {
            self.bus.publish(SessionEvent::BreakEnded);
        }
        if self.is_running() {
            log_debug!("Break session stopped");
        }
        self.phase = Phase::Stopped;
        self.paused = false;
        self.remaining = 0;
        self.next_tick = None;
    }

    pub fn pause(&mut self) {
        if !self.is_running() || self.paused {
            return;
        }
        self.paused = true;
        self.next_tick = None;
    }

    /// Continue counting down; the next tick lands one full second from `now`.
    pub fn resume(&mut self, now: Instant) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.next_tick = Some(now + TICK);
    }

    /// End the current break early and start a fresh work phase.
    pub fn skip_break(&mut self, now: Instant) {
        if self.phase != Phase::OnBreak {
            return;
        }
        self.bus.publish(SessionEvent::BreakEnded);
        self.enter_work();
        if !self.paused {
            self.next_tick = Some(now + TICK);
        }
    }

    /// Apply a preset. Custom keeps the current durations.
    pub fn set_mode(&mut self, mode: BreakMode) {
        self.mode = mode;
        if let Some((work, rest)) = mode.durations() {
            self.work_duration = work;
            self.break_duration = rest;
        }
    }

    pub fn set_work_duration(&mut self, seconds: i64) {
        self.work_duration = clamp_duration(seconds);
    }

    pub fn set_break_duration(&mut self, seconds: i64) {
        self.break_duration = clamp_duration(seconds);
    }

    pub fn set_force_break(&mut self, force: bool) {
        self.force_break = force;
    }

    /// Run the tick due at or before `now`, if any. Returns the number of ticks.
    ///
    /// At most one tick runs per call. When the owner fell behind by more than
    /// a second (a suspended machine, a stalled loop) the missed seconds are
    /// dropped and the next tick is scheduled one second after `now`.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let Some(due) = self.next_tick else {
            return 0;
        };
        if due > now {
            return 0;
        }
        self.tick();
        // a tick may have stopped or paused the session
        if let Some(next) = self.next_tick.as_mut() {
            *next = if due + TICK <= now { now + TICK } else { due + TICK };
        }
        1
    }

    fn tick(&mut self) {
        if !self.is_running() || self.paused {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.bus.publish(SessionEvent::Tick {
            remaining: self.remaining,
            total: self.total,
        });

        if self.remaining == 0 {
            match self.phase {
                Phase::Working => self.enter_break(),
                Phase::OnBreak => {
                    self.bus.publish(SessionEvent::BreakEnded);
                    self.enter_work();
                    log_debug!("Break over, back to work");
                }
                Phase::Stopped => {}
            }
        }
    }

    fn enter_work(&mut self) {
        self.phase = Phase::Working;
        self.remaining = self.work_duration;
        self.total = self.work_duration;
    }

    fn enter_break(&mut self) {
        self.phase = Phase::OnBreak;
        self.remaining = self.break_duration;
        self.total = self.break_duration;
        self.bus.publish(SessionEvent::BreakStarted {
            duration: self.break_duration,
            force: self.force_break,
        });
        log_debug!("Break started ({}s)", self.break_duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn session(work: i64, rest: i64) -> (BreakSession, Receiver<SessionEvent>) {
        crate::logger::Log::set_enabled(false);
        let mut session = BreakSession::new();
        session.set_mode(BreakMode::Custom);
        session.set_work_duration(work);
        session.set_break_duration(rest);
        let rx = session.subscribe();
        (session, rx)
    }

    /// Advance once per second through `t0 + 1s ..= t0 + n s`
    fn run_for(s: &mut BreakSession, t0: Instant, n: u64) {
        for i in 1..=n {
            assert_eq!(s.advance(t0 + secs(i)), 1, "tick at {i}s");
        }
    }

    #[test]
    fn ticks_once_per_second() {
        let (mut s, rx) = session(3, 2);
        let t0 = Instant::now();
        s.start(t0);
        assert_eq!(s.advance(t0 + Duration::from_millis(999)), 0);
        assert_eq!(s.advance(t0 + secs(1)), 1);
        assert_eq!(
            rx.try_recv(),
            Ok(SessionEvent::Tick {
                remaining: 2,
                total: 3
            })
        );
    }

    #[test]
    fn break_starts_before_any_break_tick() {
        let (mut s, rx) = session(3, 2);
        let t0 = Instant::now();
        s.start(t0);
        run_for(&mut s, t0, 4);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::Tick { remaining: 2, total: 3 },
                SessionEvent::Tick { remaining: 1, total: 3 },
                SessionEvent::Tick { remaining: 0, total: 3 },
                SessionEvent::BreakStarted { duration: 2, force: true },
                SessionEvent::Tick { remaining: 1, total: 2 },
            ]
        );
        assert!(s.is_on_break());
    }

    #[test]
    fn long_gap_runs_a_single_tick() {
        crate::logger::Log::set_enabled(false);
        let mut s = BreakSession::new();
        s.set_mode(BreakMode::TwentyTwentyTwenty);
        let rx = s.subscribe();
        let t0 = Instant::now();
        s.start(t0);

        let wake = t0 + secs(8 * 60 * 60);
        assert_eq!(s.advance(wake), 1);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![SessionEvent::Tick {
                remaining: 1199,
                total: 1200
            }]
        );
        assert_eq!(s.phase(), Phase::Working);
        assert_eq!(s.next_deadline(), Some(wake + secs(1)));

        // the cadence picks up from the wake-up instant
        assert_eq!(s.advance(wake + Duration::from_millis(500)), 0);
        assert_eq!(s.advance(wake + secs(1)), 1);
        assert_eq!(s.remaining(), 1198);
    }

    #[test]
    fn late_tick_within_a_second_keeps_the_grid() {
        let (mut s, _rx) = session(10, 5);
        let t0 = Instant::now();
        s.start(t0);
        assert_eq!(s.advance(t0 + Duration::from_millis(1_400)), 1);
        assert_eq!(s.next_deadline(), Some(t0 + secs(2)));
    }

    #[test]
    fn break_ends_and_work_restarts() {
        let (mut s, rx) = session(1, 1);
        let t0 = Instant::now();
        s.start(t0);
        run_for(&mut s, t0, 2);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.last(), Some(&SessionEvent::BreakEnded));
        assert_eq!(s.phase(), Phase::Working);
        assert_eq!(s.remaining(), 1);
    }

    #[test]
    fn skip_break_resets_work_without_a_tick() {
        let (mut s, rx) = session(1, 60);
        let t0 = Instant::now();
        s.start(t0);
        s.advance(t0 + secs(1));
        rx.try_iter().for_each(drop);

        s.skip_break(t0 + secs(5));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![SessionEvent::BreakEnded]);
        assert_eq!(s.phase(), Phase::Working);
        assert_eq!(s.remaining(), 1);
        assert_eq!(s.next_deadline(), Some(t0 + secs(6)));

        // skipping while working does nothing
        s.skip_break(t0 + secs(5));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn pause_and_resume_lose_no_time() {
        let (mut s, _rx) = session(10, 5);
        let t0 = Instant::now();
        s.start(t0);
        run_for(&mut s, t0, 3);
        assert_eq!(s.remaining(), 7);

        s.pause();
        s.pause();
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.advance(t0 + secs(60)), 0);
        assert_eq!(s.remaining(), 7);

        s.resume(t0 + secs(60));
        assert_eq!(s.advance(t0 + Duration::from_millis(60_500)), 0);
        assert_eq!(s.advance(t0 + secs(61)), 1);
        assert_eq!(s.remaining(), 6);
    }

    #[test]
    fn resume_without_pause_is_ignored() {
        let (mut s, _rx) = session(10, 5);
        let t0 = Instant::now();
        s.start(t0);
        s.resume(t0 + secs(30));
        assert_eq!(s.next_deadline(), Some(t0 + secs(1)));
    }

    #[test]
    fn stop_during_break_reports_the_end() {
        let (mut s, rx) = session(1, 30);
        let t0 = Instant::now();
        s.start(t0);
        s.advance(t0 + secs(1));
        rx.try_iter().for_each(drop);
        s.stop();
        assert_eq!(rx.try_recv(), Ok(SessionEvent::BreakEnded));
        assert_eq!(s.phase(), Phase::Stopped);
        assert_eq!(s.remaining(), 0);
        s.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn durations_are_clamped_to_one_second() {
        let (mut s, _rx) = session(0, -5);
        assert_eq!(s.work_duration(), 1);
        assert_eq!(s.break_duration(), 1);
        s.set_work_duration(90);
        assert_eq!(s.work_duration(), 90);
    }

    #[test]
    fn presets_set_durations() {
        let mut s = BreakSession::new();
        s.set_mode(BreakMode::TwentyTwentyTwenty);
        assert_eq!((s.work_duration(), s.break_duration()), (1200, 20));
        s.set_work_duration(77);
        s.set_mode(BreakMode::Custom);
        assert_eq!(s.work_duration(), 77);
        s.set_mode(BreakMode::Pomodoro);
        assert_eq!((s.work_duration(), s.break_duration()), (1500, 300));
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("pomodoro".parse::<BreakMode>().unwrap(), BreakMode::Pomodoro);
        assert_eq!(
            "20-20-20".parse::<BreakMode>().unwrap(),
            BreakMode::TwentyTwentyTwenty
        );
        assert_eq!(" Custom ".parse::<BreakMode>().unwrap(), BreakMode::Custom);
        assert!("tomato".parse::<BreakMode>().is_err());
        assert_eq!(
            "twenty-twenty-twenty".parse::<BreakMode>().unwrap(),
            BreakMode::TwentyTwentyTwenty
        );
        assert!("202020".parse::<BreakMode>().is_err());
    }

    #[test]
    fn force_flag_travels_with_break_start() {
        let (mut s, rx) = session(1, 5);
        s.set_force_break(false);
        let t0 = Instant::now();
        s.start(t0);
        s.advance(t0 + secs(1));
        assert!(rx.try_iter().any(|e| e
            == SessionEvent::BreakStarted {
                duration: 5,
                force: false
            }));
    }
}
