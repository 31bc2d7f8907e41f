//! `eyeshade sun`: show the solar schedule for the configured location.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::config::Config;
use crate::geo::{ScheduledSolarEvent, SolarTimes, plan_next_event, solar_times};

/// Today's sunrise and sunset plus the next event after `now`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunReport {
    pub latitude: f64,
    pub longitude: f64,
    pub today: SolarTimes,
    pub next: ScheduledSolarEvent,
}

pub fn sun_report(latitude: f64, longitude: f64, now: DateTime<Utc>) -> Result<SunReport> {
    let today = solar_times(latitude, longitude, now.date_naive())?;
    let next = plan_next_event(latitude, longitude, now)?;
    Ok(SunReport {
        latitude,
        longitude,
        today,
        next,
    })
}

pub fn handle_sun_command() -> Result<()> {
    log_version!();

    let config = Config::load()?;
    let (latitude, longitude) = config.coordinates();
    let now = Utc::now();

    match sun_report(latitude, longitude, now) {
        Ok(report) => log_report(&report, now),
        Err(e) => {
            log_pipe!();
            log_warning!("{e}");
        }
    }

    if !config.schedule_enabled() {
        log_pipe!();
        log_info!("The sunset schedule is off. Set schedule_enabled = true to use it.");
    }
    log_end!();
    Ok(())
}

fn local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn log_report(report: &SunReport, now: DateTime<Utc>) {
    log_block_start!(
        "Location: {:.4}°{}, {:.4}°{}",
        report.latitude.abs(),
        if report.latitude >= 0.0 { "N" } else { "S" },
        report.longitude.abs(),
        if report.longitude >= 0.0 { "E" } else { "W" }
    );
    log_indented!("Sunrise: {}", local(report.today.sunrise));
    log_indented!("Sunset:  {}", local(report.today.sunset));

    let until = report.next.at - now;
    log_block_start!(
        "Next {} at {} (in {}h {:02}m)",
        report.next.kind,
        local(report.next.at),
        until.num_hours(),
        until.num_minutes() % 60
    );
}

pub fn display_help() {
    log_version!();
    log_block_start!("sun - Show sunrise and sunset");
    log_block_start!("Usage: eyeshade sun");
    log_block_start!("Description:");
    log_indented!("Prints today's sunrise and sunset for the latitude and longitude in");
    log_indented!("the configuration, and when the filter will next switch.");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SolarEventKind;
    use chrono::TimeZone;

    #[test]
    fn report_for_new_york_afternoon() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 17, 0, 0).unwrap();
        let report = sun_report(40.7128, -74.0060, now).unwrap();

        assert!(report.today.sunrise < now);
        assert_eq!(report.next.kind, SolarEventKind::Sunset);
        assert!(report.next.at > now);
    }

    #[test]
    fn invalid_coordinates_are_an_error() {
        let now = Utc.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        assert!(sun_report(95.0, 0.0, now).is_err());
    }
}
