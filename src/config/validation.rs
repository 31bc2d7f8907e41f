//! Range and consistency checks run on every loaded configuration.

use anyhow::Result;

use super::Config;
use crate::common::constants::*;
use crate::session::BreakMode;

/// Reject values the controllers cannot honor.
///
/// The first problem found is returned with the offending field named.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(temp) = config.temperature
        && !(MINIMUM_TEMP..=MAXIMUM_TEMP).contains(&temp)
    {
        anyhow::bail!(
            "temperature ({}) must be between {} and {} Kelvin",
            temp,
            MINIMUM_TEMP,
            MAXIMUM_TEMP
        );
    }

    if let Some(level) = config.dim_level
        && !(MINIMUM_DIM..=MAXIMUM_DIM).contains(&level)
    {
        anyhow::bail!(
            "dim_level ({}) must be between {} and {}",
            level,
            MINIMUM_DIM,
            MAXIMUM_DIM
        );
    }

    if let Some(level) = config.focus_dim_level
        && !(MINIMUM_FOCUS_DIM..=MAXIMUM_FOCUS_DIM).contains(&level)
    {
        anyhow::bail!(
            "focus_dim_level ({}) must be between {} and {}",
            level,
            MINIMUM_FOCUS_DIM,
            MAXIMUM_FOCUS_DIM
        );
    }

    if let Some(mode) = config.break_mode.as_deref()
        && mode.parse::<BreakMode>().is_err()
    {
        anyhow::bail!(
            "break_mode must be \"pomodoro\", \"20-20-20\", \"twenty-twenty-twenty\" or \"custom\" (got \"{}\")",
            mode
        );
    }

    validate_duration(config.work_duration, "work_duration")?;
    validate_duration(config.break_duration, "break_duration")?;

    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if let Some(interval) = config.topology_poll_interval
        && !(MINIMUM_TOPOLOGY_POLL_SECS..=MAXIMUM_TOPOLOGY_POLL_SECS).contains(&interval)
    {
        anyhow::bail!(
            "topology_poll_interval ({}) must be between {} and {} seconds",
            interval,
            MINIMUM_TOPOLOGY_POLL_SECS,
            MAXIMUM_TOPOLOGY_POLL_SECS
        );
    }

    if config.schedule_enabled() && config.filter_enabled() {
        log_warning!(
            "filter_enabled is ignored while schedule_enabled is on; the schedule decides when the filter runs"
        );
    }

    Ok(())
}

fn validate_duration(value: Option<u32>, field: &str) -> Result<()> {
    if let Some(secs) = value
        && !(MINIMUM_DURATION..=MAXIMUM_DURATION).contains(&secs)
    {
        anyhow::bail!(
            "{} ({}s) must be between {} and {} seconds",
            field,
            secs,
            MINIMUM_DURATION,
            MAXIMUM_DURATION
        );
    }
    Ok(())
}
