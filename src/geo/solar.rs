//! Sunrise and sunset instants for a coordinate and UTC date.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

/// Sunrise and sunset computed for one UTC date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Whether `instant` plausibly belongs to `date`.
///
/// During polar day or night the hour angle is undefined and the calculation
/// produces instants nowhere near the requested date.
fn near_date(instant: DateTime<Utc>, date: NaiveDate) -> bool {
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        return false;
    };
    let midnight = midnight.and_utc();
    instant >= midnight - Duration::days(1) && instant <= midnight + Duration::days(2)
}

/// Compute sunrise and sunset for `date` at the given coordinates.
pub fn solar_times(latitude: f64, longitude: f64, date: NaiveDate) -> Result<SolarTimes> {
    let coord = Coordinates::new(latitude, longitude)
        .with_context(|| format!("Invalid coordinates ({latitude}, {longitude})"))?;
    let day = SolarDay::new(coord, date);
    let sunrise = day.event_time(SolarEvent::Sunrise);
    let sunset = day.event_time(SolarEvent::Sunset);

    if !near_date(sunrise, date) || !near_date(sunset, date) {
        anyhow::bail!(
            "No sunrise or sunset at ({latitude:.2}, {longitude:.2}) on {date} (polar day or night)"
        );
    }

    Ok(SolarTimes { sunrise, sunset })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_york_in_summer() {
        let times = solar_times(40.7128, -74.0060, date(2024, 6, 21)).unwrap();
        assert!(times.sunrise < times.sunset);
        // about 09:25 UTC and 00:31 UTC the next day
        let day_length = times.sunset - times.sunrise;
        assert!(day_length > Duration::hours(14) && day_length < Duration::hours(16));
    }

    #[test]
    fn equator_has_twelve_hour_days() {
        let times = solar_times(0.0, 0.0, date(2024, 3, 20)).unwrap();
        let day_length = times.sunset - times.sunrise;
        assert!((day_length - Duration::hours(12)).num_minutes().abs() < 20);
    }

    #[test]
    fn invalid_latitude_is_rejected() {
        assert!(solar_times(91.0, 0.0, date(2024, 1, 1)).is_err());
        assert!(solar_times(0.0, 181.0, date(2024, 1, 1)).is_err());
    }
}
