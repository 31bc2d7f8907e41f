use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use eyeshade::config::{self, Config};
use eyeshade::core::{Core, CoreCommand, CoreParams};
use eyeshade::gamma::GammaRamp;
use eyeshade::io::signals::SignalState;
use eyeshade::logger::Log;
use eyeshade::platform::testing::{FakePlatform, monitor};
use eyeshade::time_source::RealTimeSource;
use tempfile::TempDir;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("eyeshade.toml");
    fs::write(&path, content).unwrap();
    path
}

fn two_monitors() -> FakePlatform {
    FakePlatform::new(vec![
        monitor(1, 0, 0, 1920, 1080),
        monitor(2, -1280, 0, 1280, 1024),
    ])
}

fn core_for(fake: &FakePlatform, config: Config) -> Core {
    Core::new(CoreParams {
        platform: fake.platform(),
        config,
        signal_state: SignalState::detached(),
        time_source: Arc::new(RealTimeSource),
        lock: None,
    })
}

#[test]
fn loaded_config_drives_the_controllers() {
    Log::set_enabled(false);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "filter_enabled = true\ntemperature = 3800\ndim_enabled = true\ndim_level = 40\n",
    );
    let config = Config::load_from_path(&path).unwrap();
    let fake = two_monitors();
    let mut core = core_for(&fake, config);

    core.start();

    assert_eq!(fake.hardware_ramp(), GammaRamp::for_temperature(3800));
    assert_eq!(fake.live_surfaces(), 2);
    assert!(fake.surface_snapshots().iter().all(|s| s.opacity == 40));

    core.shutdown();
    assert_eq!(fake.hardware_ramp(), GammaRamp::identity());
    assert_eq!(fake.live_surfaces(), 0);
}

#[test]
fn preset_rewrite_then_reload_applies_new_values() {
    Log::set_enabled(false);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "filter_enabled = true # on\ntemperature = 5000\ndim_enabled = true\ndim_level = 10\n",
    );
    let fake = two_monitors();
    let mut core = core_for(&fake, Config::load_from_path(&path).unwrap());
    core.start();

    let night = config::find_preset("night").unwrap();
    config::apply_preset(&path, night).unwrap();
    core.apply_new_config(Config::load_from_path(&path).unwrap());

    assert_eq!(core.gamma().temperature(), 3400);
    assert_eq!(core.dim().level(), 50);
    assert!(fake.surface_snapshots().iter().all(|s| s.opacity == 50));
    assert!(fs::read_to_string(&path).unwrap().contains("# on"));
}

#[test]
fn commands_from_another_thread_then_shutdown() {
    Log::set_enabled(false);
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "filter_enabled = true\ntemperature = 4500\n");
    let fake = two_monitors();
    let core = core_for(&fake, Config::load_from_path(&path).unwrap());
    let handle = core.handle();

    let sender = thread::spawn(move || {
        handle.send(CoreCommand::SetTemperature(3000)).unwrap();
        handle.shutdown().unwrap();
    });

    core.run().unwrap();
    sender.join().unwrap();

    let state = fake.state();
    let state = state.borrow();
    // enable, set temperature, restore
    assert_eq!(state.ramp_writes, 3);
    assert_eq!(state.hardware_ramp, GammaRamp::identity());
}

#[test]
fn degraded_platform_keeps_running() {
    Log::set_enabled(false);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "filter_enabled = true\ndim_enabled = true\nfocus_enabled = true\n",
    );
    let fake = two_monitors();
    {
        let state = fake.state();
        let mut state = state.borrow_mut();
        state.fail_create = true;
        state.fail_read = true;
    }
    let mut core = core_for(&fake, Config::load_from_path(&path).unwrap());

    core.start();
    core.step();

    assert!(core.gamma().is_enabled());
    assert!(!core.focus().is_active());
    assert_eq!(fake.live_surfaces(), 0);

    core.shutdown();
    // nothing was saved, so the filtered ramp stays
    assert_ne!(fake.hardware_ramp(), GammaRamp::identity());
}
