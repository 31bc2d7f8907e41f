use super::*;
use crate::config::loading::apply_defaults;
use crate::gamma::GammaRamp;
use crate::platform::WindowHandle;
use crate::platform::testing::{FakePlatform, monitor};
use crate::session::Phase;
use crate::time_source::ManualTimeSource;
use chrono::{TimeZone, Utc};

fn config(edit: impl FnOnce(&mut Config)) -> Config {
    let mut config = Config::default();
    edit(&mut config);
    apply_defaults(&mut config);
    config
}

struct Harness {
    fake: FakePlatform,
    clock: Arc<ManualTimeSource>,
    core: Core,
}

fn harness_at(hour_utc: u32, edit: impl FnOnce(&mut Config)) -> Harness {
    crate::logger::Log::set_enabled(false);
    let fake = FakePlatform::new(vec![
        monitor(1, 0, 0, 1920, 1080),
        monitor(2, 1920, 0, 2560, 1440),
    ]);
    let start = Utc.with_ymd_and_hms(2025, 1, 15, hour_utc, 0, 0).unwrap();
    let clock = Arc::new(ManualTimeSource::new(start));
    let core = Core::new(CoreParams {
        platform: fake.platform(),
        config: config(edit),
        signal_state: SignalState::detached(),
        time_source: clock.clone(),
        lock: None,
    });
    Harness { fake, clock, core }
}

/// Noon in New York, well between sunrise and sunset.
fn harness(edit: impl FnOnce(&mut Config)) -> Harness {
    harness_at(17, edit)
}

#[test]
fn start_applies_manual_filter() {
    let mut h = harness(|c| {
        c.filter_enabled = Some(true);
        c.temperature = Some(4000);
    });
    h.core.start();

    assert!(h.core.gamma().is_enabled());
    assert_eq!(h.core.gamma().temperature(), 4000);
    assert_eq!(h.fake.hardware_ramp(), GammaRamp::for_temperature(4000));
}

#[test]
fn start_with_everything_off_touches_nothing() {
    let mut h = harness(|_| {});
    h.core.start();

    assert!(!h.core.gamma().is_enabled());
    assert_eq!(h.fake.state().borrow().ramp_writes, 0);
    assert_eq!(h.fake.live_surfaces(), 0);
    assert!(!h.core.session().is_running());
}

#[test]
fn dimming_covers_each_display() {
    let mut h = harness(|c| {
        c.dim_enabled = Some(true);
        c.dim_level = Some(120);
    });
    h.core.start();

    assert_eq!(h.core.dim().surface_count(), 2);
    assert!(h.fake.surface_snapshots().iter().all(|s| s.opacity == 120 && s.visible));
}

#[test]
fn reload_only_touches_changed_controllers() {
    let mut h = harness(|c| {
        c.filter_enabled = Some(true);
        c.dim_enabled = Some(true);
        c.dim_level = Some(60);
    });
    h.core.start();
    let writes = h.fake.state().borrow().ramp_writes;

    let mut next = h.core.config().clone();
    next.dim_enabled = Some(false);
    h.core.apply_new_config(next);

    assert_eq!(h.fake.live_surfaces(), 0);
    assert!(h.core.gamma().is_enabled());
    assert_eq!(h.fake.state().borrow().ramp_writes, writes);
}

#[test]
fn reload_changes_filter_temperature() {
    let mut h = harness(|c| {
        c.filter_enabled = Some(true);
        c.temperature = Some(4500);
    });
    h.core.start();

    let mut next = h.core.config().clone();
    next.temperature = Some(3000);
    h.core.apply_new_config(next);

    assert_eq!(h.core.gamma().temperature(), 3000);
    assert_eq!(h.fake.hardware_ramp(), GammaRamp::for_temperature(3000));
}

#[test]
fn disabling_the_filter_restores_the_original_ramp() {
    let mut h = harness(|c| c.filter_enabled = Some(true));
    h.core.start();

    let mut next = h.core.config().clone();
    next.filter_enabled = Some(false);
    h.core.apply_new_config(next);

    assert!(!h.core.gamma().is_enabled());
    assert_eq!(h.fake.hardware_ramp(), GammaRamp::identity());
}

#[test]
fn commands_arrive_through_the_handle() {
    let mut h = harness(|c| {
        c.dim_enabled = Some(true);
        c.dim_level = Some(40);
    });
    h.core.start();

    let handle = h.core.handle();
    handle.send(CoreCommand::SetDimLevel(80)).unwrap();
    handle.send(CoreCommand::SetFilterEnabled(true)).unwrap();
    h.core.step();

    assert_eq!(h.core.dim().level(), 80);
    assert!(h.fake.surface_snapshots().iter().all(|s| s.opacity == 80));
    assert!(h.core.gamma().is_enabled());
}

#[test]
fn dim_command_uses_default_level_when_unset() {
    let mut h = harness(|_| {});
    h.core.start();

    h.core.handle_command(CoreCommand::SetDimEnabled(true));

    assert_eq!(i32::from(h.core.dim().level()), DEFAULT_DIM_ON);
    assert_eq!(h.fake.live_surfaces(), 2);
}

#[test]
fn break_session_ticks_with_the_clock() {
    let mut h = harness(|c| {
        c.break_enabled = Some(true);
        c.break_mode = Some("custom".to_string());
        c.work_duration = Some(2);
        c.break_duration = Some(1);
    });
    let events = h.core.subscribe();
    h.core.start();
    assert_eq!(h.core.session().phase(), Phase::Working);

    h.clock.advance(Duration::from_secs(1));
    h.core.step();
    assert_eq!(h.core.session().remaining(), 1);
    h.clock.advance(Duration::from_secs(1));
    h.core.step();

    assert!(h.core.session().is_on_break());
    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert!(received.contains(&SessionEvent::BreakStarted {
        duration: 1,
        force: true
    }));

    h.clock.advance(Duration::from_secs(1));
    h.core.step();
    assert_eq!(h.core.session().phase(), Phase::Working);
    assert!(events.try_iter().any(|e| e == SessionEvent::BreakEnded));
}

#[test]
fn forced_break_cannot_be_skipped() {
    let mut h = harness(|c| {
        c.break_enabled = Some(true);
        c.break_mode = Some("custom".to_string());
        c.work_duration = Some(1);
        c.break_duration = Some(600);
        c.force_break = Some(true);
    });
    h.core.start();
    h.clock.advance(Duration::from_secs(1));
    h.core.step();
    assert!(h.core.session().is_on_break());

    h.core.handle_command(CoreCommand::SkipBreak);
    assert!(h.core.session().is_on_break());

    h.core.handle_command(CoreCommand::SetForceBreak(false));
    h.core.handle_command(CoreCommand::SkipBreak);
    assert_eq!(h.core.session().phase(), Phase::Working);
}

#[test]
fn preset_modes_ignore_configured_durations() {
    let mut h = harness(|c| {
        c.break_enabled = Some(true);
        c.break_mode = Some("20-20-20".to_string());
        c.work_duration = Some(5);
    });
    h.core.start();

    assert_eq!(h.core.session().work_duration(), TWENTY_WORK);
    assert_eq!(h.core.session().break_duration(), TWENTY_BREAK);
}

#[test]
fn topology_change_rebuilds_dim_surfaces() {
    let mut h = harness(|c| c.dim_enabled = Some(true));
    h.core.start();
    assert_eq!(h.core.dim().surface_count(), 2);

    h.fake.set_monitors(vec![
        monitor(1, 0, 0, 1920, 1080),
        monitor(2, 1920, 0, 2560, 1440),
        monitor(3, 4480, 0, 1920, 1080),
    ]);

    h.core.step();
    assert_eq!(h.core.dim().surface_count(), 2, "polled before the interval");

    h.clock
        .advance(Duration::from_secs(DEFAULT_TOPOLOGY_POLL_SECS));
    h.core.step();
    assert_eq!(h.core.dim().surface_count(), 3);
    assert_eq!(h.fake.live_surfaces(), 3);
}

#[test]
fn focus_overlay_follows_foreground_window() {
    let mut h = harness(|c| c.focus_enabled = Some(true));
    h.core.start();
    assert!(h.core.focus().is_active());

    h.fake.push_foreground(WindowHandle(0x42));
    h.core.step();

    let surfaces = h.fake.surface_snapshots();
    assert_eq!(surfaces.len(), 1);
    assert_eq!(surfaces[0].behind, Some(WindowHandle(0x42)));
    assert!(h.fake.state().borrow().pumps > 0);
}

#[test]
fn schedule_enables_filter_at_night() {
    // 05:00 UTC is midnight in New York
    let mut h = harness_at(5, |c| {
        c.schedule_enabled = Some(true);
        c.temperature = Some(3500);
    });
    h.core.start();

    assert!(h.core.scheduler().is_running());
    assert!(h.core.gamma().is_enabled());
    assert_eq!(h.core.gamma().temperature(), 3500);
}

#[test]
fn schedule_takes_over_manual_filter_during_the_day() {
    let mut h = harness(|c| c.filter_enabled = Some(true));
    h.core.start();
    assert!(h.core.gamma().is_enabled());

    let mut next = h.core.config().clone();
    next.schedule_enabled = Some(true);
    h.core.apply_new_config(next);

    assert!(h.core.scheduler().is_running());
    assert!(!h.core.gamma().is_enabled());

    // past sunset
    h.clock.advance(Duration::from_secs(6 * 60 * 60));
    h.core.step();
    assert!(h.core.gamma().is_enabled());
}

#[test]
fn shutdown_message_tears_everything_down() {
    let h = harness(|c| {
        c.filter_enabled = Some(true);
        c.dim_enabled = Some(true);
        c.focus_enabled = Some(true);
        c.break_enabled = Some(true);
    });
    let fake = h.fake.clone();
    h.core.handle().shutdown().unwrap();

    h.core.run().unwrap();

    assert_eq!(fake.live_surfaces(), 0);
    assert_eq!(fake.hardware_ramp(), GammaRamp::identity());
    assert!(!fake.state().borrow().subscribed);
}

#[test]
fn cleared_run_flag_stops_the_loop() {
    let mut h = harness(|_| {});
    assert!(!h.core.is_shutting_down());
    h.core
        .signal_state
        .running
        .store(false, Ordering::SeqCst);
    assert!(h.core.is_shutting_down());
    h.core.shutdown();
}
