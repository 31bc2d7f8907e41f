//! Application-wide defaults and limits.

// # Color temperature
pub const MINIMUM_TEMP: i32 = 1000;
pub const MAXIMUM_TEMP: i32 = 6500;
/// Neutral white point. The filter is considered off at this value.
pub const DEFAULT_TEMP: i32 = 6500;
/// Temperature a freshly created config enables the filter at.
pub const DEFAULT_FILTER_TEMP: i32 = 4500;

// # Gamma ramps
pub const RAMP_SIZE: usize = 256;
/// Scales an 8-bit index to the 16-bit ramp range (255 * 257 = 65535).
pub const RAMP_SCALE: f64 = 257.0;

// # Dimming overlay (opacity per display)
pub const MINIMUM_DIM: i32 = 0;
pub const MAXIMUM_DIM: i32 = 200;
pub const DEFAULT_DIM: i32 = 0;
/// Level used when dimming is switched on without an explicit value.
pub const DEFAULT_DIM_ON: i32 = 100;

// # Focus overlay (opacity of the desktop-spanning surface)
pub const MINIMUM_FOCUS_DIM: i32 = 0;
pub const MAXIMUM_FOCUS_DIM: i32 = 255;
pub const DEFAULT_FOCUS_DIM: i32 = 150;

// # Break sessions (seconds)
pub const POMODORO_WORK: u32 = 25 * 60;
pub const POMODORO_BREAK: u32 = 5 * 60;
pub const TWENTY_WORK: u32 = 20 * 60;
pub const TWENTY_BREAK: u32 = 20;
pub const DEFAULT_WORK_DURATION: u32 = 45 * 60;
pub const DEFAULT_BREAK_DURATION: u32 = 3 * 60;
pub const MINIMUM_DURATION: u32 = 1;
pub const MAXIMUM_DURATION: u32 = 24 * 60 * 60;
pub const DEFAULT_BREAK_MODE: &str = "pomodoro";
pub const DEFAULT_FORCE_BREAK: bool = true;

// # Astronomical scheduling
pub const SCHEDULE_RETRY_SECS: u64 = 60 * 60;
pub const MINIMUM_SCHEDULE_DELAY_MS: i64 = 1000;
pub const DEFAULT_LATITUDE: f64 = 40.7128;
pub const DEFAULT_LONGITUDE: f64 = -74.0060;

// # Event loop
/// Upper bound on a single wait so OS messages keep flowing.
pub const LOOP_SLICE_MS: u64 = 50;
pub const DEFAULT_TOPOLOGY_POLL_SECS: u64 = 3;
pub const MINIMUM_TOPOLOGY_POLL_SECS: u64 = 1;
pub const MAXIMUM_TOPOLOGY_POLL_SECS: u64 = 300;

// # Config file
pub const CONFIG_DIR_NAME: &str = "eyeshade";
pub const CONFIG_FILE_NAME: &str = "eyeshade.toml";
pub const LOCK_FILE_NAME: &str = "eyeshade.lock";
pub const CONFIG_DEBOUNCE_MS: u64 = 500;

// # Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
