//! One-shot timer that follows the sun.
//!
//! At sunset the blue-light filter is switched on at the configured
//! temperature, at sunrise it is switched off, and the next event is armed.
//! A failed calculation (bad coordinates, polar day or night) is retried an
//! hour later.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::time::{Duration, Instant};

use super::solar::solar_times;
use crate::common::constants::{MINIMUM_SCHEDULE_DELAY_MS, SCHEDULE_RETRY_SECS};
use crate::gamma::GammaRampController;
use crate::time_source::TimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarEventKind {
    Sunrise,
    Sunset,
}

impl fmt::Display for SolarEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolarEventKind::Sunrise => f.write_str("sunrise"),
            SolarEventKind::Sunset => f.write_str("sunset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSolarEvent {
    pub kind: SolarEventKind,
    pub at: DateTime<Utc>,
}

/// The first solar event strictly after `now`.
///
/// Today's sunrise comes first, then today's sunset, then tomorrow's
/// sunrise. Neighbouring dates are also considered so coordinates far from
/// Greenwich, whose UTC sunrise falls on the previous calendar day, still get
/// an event in the future.
pub fn plan_next_event(latitude: f64, longitude: f64, now: DateTime<Utc>) -> Result<ScheduledSolarEvent> {
    let today = now.date_naive();
    let mut last_error = None;
    let mut candidates = Vec::with_capacity(6);

    for offset in -1..=1 {
        let date = today + ChronoDuration::days(offset);
        match solar_times(latitude, longitude, date) {
            Ok(times) => {
                candidates.push(ScheduledSolarEvent {
                    kind: SolarEventKind::Sunrise,
                    at: times.sunrise,
                });
                candidates.push(ScheduledSolarEvent {
                    kind: SolarEventKind::Sunset,
                    at: times.sunset,
                });
            }
            Err(e) => last_error = Some(e),
        }
    }

    candidates
        .into_iter()
        .filter(|event| event.at > now)
        .min_by_key(|event| event.at)
        .ok_or_else(|| {
            last_error.unwrap_or_else(|| anyhow::anyhow!("No upcoming solar event found"))
        })
}

pub struct AstronomicalScheduler {
    latitude: f64,
    longitude: f64,
    temperature: i32,
    running: bool,
    pending: Option<ScheduledSolarEvent>,
    deadline: Option<Instant>,
}

impl AstronomicalScheduler {
    pub fn new(latitude: f64, longitude: f64, temperature: i32) -> Self {
        Self {
            latitude,
            longitude,
            temperature,
            running: false,
            pending: None,
            deadline: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<&ScheduledSolarEvent> {
        self.pending.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn temperature(&self) -> i32 {
        self.temperature
    }

    /// Arm the timer and bring the filter in line with the current period.
    ///
    /// Between sunset and sunrise the filter is enabled right away.
    pub fn start(&mut self, clock: &dyn TimeSource, gamma: &mut GammaRampController) {
        self.running = true;
        self.schedule(clock.utc_now(), clock);
        self.enable_if_night(gamma);
    }

    /// A pending sunrise means the sun is down right now.
    fn enable_if_night(&self, gamma: &mut GammaRampController) {
        if let Some(event) = self.pending
            && event.kind == SolarEventKind::Sunrise
        {
            log_decorated!("It is night, enabling the filter at {}K", self.temperature);
            gamma.enable(self.temperature);
        }
    }

    /// Disarm and forget the pending event.
    pub fn stop(&mut self) {
        if self.running {
            log_debug!("Solar schedule stopped");
        }
        self.running = false;
        self.pending = None;
        self.deadline = None;
    }

    /// Move to new coordinates, re-planning if running.
    pub fn set_location(
        &mut self,
        latitude: f64,
        longitude: f64,
        clock: &dyn TimeSource,
        gamma: &mut GammaRampController,
    ) {
        self.latitude = latitude;
        self.longitude = longitude;
        if self.running {
            self.stop();
            self.start(clock, gamma);
        }
    }

    /// Change the night temperature. Applied immediately if the filter is on.
    pub fn set_temperature(&mut self, temperature: i32, gamma: &mut GammaRampController) {
        self.temperature = temperature;
        if self.running && gamma.is_enabled() {
            gamma.set_temperature(temperature);
        }
    }

    /// Fire the pending event if its deadline has passed. Returns the event
    /// that fired.
    pub fn advance(
        &mut self,
        clock: &dyn TimeSource,
        gamma: &mut GammaRampController,
    ) -> Option<SolarEventKind> {
        let deadline = self.deadline?;
        if !self.running || clock.now() < deadline {
            return None;
        }

        let now_utc = clock.utc_now();
        match self.pending.take() {
            Some(event) => {
                match event.kind {
                    SolarEventKind::Sunset => {
                        log_block_start!("Sunset reached, enabling filter at {}K", self.temperature);
                        gamma.enable(self.temperature);
                    }
                    SolarEventKind::Sunrise => {
                        log_block_start!("Sunrise reached, disabling filter");
                        gamma.disable();
                    }
                }
                // never re-plan the event that just fired
                self.schedule(now_utc.max(event.at), clock);
                Some(event.kind)
            }
            None => {
                // retry after a failed calculation
                self.schedule(now_utc, clock);
                self.enable_if_night(gamma);
                None
            }
        }
    }

    fn schedule(&mut self, from: DateTime<Utc>, clock: &dyn TimeSource) {
        let now = clock.now();
        match plan_next_event(self.latitude, self.longitude, from) {
            Ok(event) => {
                let delay_ms = (event.at - clock.utc_now())
                    .num_milliseconds()
                    .max(MINIMUM_SCHEDULE_DELAY_MS);
                self.deadline = Some(now + Duration::from_millis(delay_ms as u64));
                self.pending = Some(event);
                log_decorated!(
                    "Next {} at {}",
                    event.kind,
                    event
                        .at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                );
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Solar calculation failed: {e}");
                log_indented!("Retrying in one hour");
                self.pending = None;
                self.deadline = Some(now + Duration::from_secs(SCHEDULE_RETRY_SECS));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakePlatform;
    use crate::time_source::ManualTimeSource;
    use chrono::TimeZone;

    const NYC: (f64, f64) = (40.7128, -74.0060);

    fn setup(start: DateTime<Utc>) -> (FakePlatform, GammaRampController, ManualTimeSource) {
        crate::logger::Log::set_enabled(false);
        let fake = FakePlatform::new(Vec::new());
        let gamma = GammaRampController::new(fake.gamma_device());
        (fake, gamma, ManualTimeSource::new(start))
    }

    #[test]
    fn before_sunrise_plans_todays_sunrise() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let today = solar_times(NYC.0, NYC.1, now.date_naive()).unwrap();
        let event = plan_next_event(NYC.0, NYC.1, now).unwrap();
        assert_eq!(event.kind, SolarEventKind::Sunrise);
        assert_eq!(event.at, today.sunrise);
    }

    #[test]
    fn between_sunrise_and_sunset_plans_sunset() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        let event = plan_next_event(NYC.0, NYC.1, now).unwrap();
        assert_eq!(event.kind, SolarEventKind::Sunset);
    }

    #[test]
    fn after_sunset_plans_tomorrows_sunrise() {
        // London sets around 18:00 UTC in March
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        let tomorrow = solar_times(51.5074, -0.1278, now.date_naive().succ_opt().unwrap()).unwrap();
        let event = plan_next_event(51.5074, -0.1278, now).unwrap();
        assert_eq!(event.kind, SolarEventKind::Sunrise);
        assert_eq!(event.at, tomorrow.sunrise);
    }

    #[test]
    fn far_east_longitudes_always_plan_ahead() {
        // Sydney sunrise on the UTC date lands the evening before
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 21, 0, 0).unwrap();
        let event = plan_next_event(-33.8688, 151.2093, now).unwrap();
        assert!(event.at > now);
        assert!(event.at - now < ChronoDuration::hours(24));
    }

    #[test]
    fn starting_at_night_enables_the_filter() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(NYC.0, NYC.1, 3400);
        scheduler.start(&clock, &mut gamma);
        assert!(gamma.is_enabled());
        assert_eq!(gamma.temperature(), 3400);
        assert_eq!(scheduler.pending().map(|e| e.kind), Some(SolarEventKind::Sunrise));
    }

    #[test]
    fn sunrise_then_sunset_toggle_the_filter() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let (fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(NYC.0, NYC.1, 3400);
        scheduler.start(&clock, &mut gamma);

        let sunrise = scheduler.pending().unwrap().at;
        clock.advance((sunrise - now + ChronoDuration::seconds(1)).to_std().unwrap());
        assert_eq!(scheduler.advance(&clock, &mut gamma), Some(SolarEventKind::Sunrise));
        assert!(!gamma.is_enabled());
        assert_eq!(fake.hardware_ramp(), crate::gamma::GammaRamp::identity());

        let pending = *scheduler.pending().unwrap();
        assert_eq!(pending.kind, SolarEventKind::Sunset);
        let wait = (pending.at - clock.utc_now()).to_std().unwrap();
        clock.advance(wait);
        assert_eq!(scheduler.advance(&clock, &mut gamma), Some(SolarEventKind::Sunset));
        assert!(gamma.is_enabled());
        assert_eq!(scheduler.pending().map(|e| e.kind), Some(SolarEventKind::Sunrise));
    }

    #[test]
    fn nothing_fires_before_the_deadline() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(NYC.0, NYC.1, 3400);
        scheduler.start(&clock, &mut gamma);
        assert!(!gamma.is_enabled());
        clock.advance(Duration::from_secs(60));
        assert_eq!(scheduler.advance(&clock, &mut gamma), None);
    }

    #[test]
    fn failed_calculation_retries_in_an_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(95.0, 0.0, 3400);
        let started = clock.now();
        scheduler.start(&clock, &mut gamma);
        assert!(scheduler.pending().is_none());
        assert_eq!(
            scheduler.next_deadline(),
            Some(started + Duration::from_secs(SCHEDULE_RETRY_SECS))
        );
    }

    #[test]
    fn successful_retry_at_night_enables_the_filter() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(95.0, 0.0, 3400);
        scheduler.start(&clock, &mut gamma);
        assert!(scheduler.pending().is_none());
        assert!(!gamma.is_enabled());

        (scheduler.latitude, scheduler.longitude) = NYC;
        clock.advance(Duration::from_secs(SCHEDULE_RETRY_SECS));
        assert_eq!(scheduler.advance(&clock, &mut gamma), None);

        assert_eq!(scheduler.pending().map(|e| e.kind), Some(SolarEventKind::Sunrise));
        assert!(gamma.is_enabled());
        assert_eq!(gamma.temperature(), 3400);
    }

    #[test]
    fn successful_retry_by_day_leaves_the_filter_off() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(95.0, 0.0, 3400);
        scheduler.start(&clock, &mut gamma);

        (scheduler.latitude, scheduler.longitude) = NYC;
        clock.advance(Duration::from_secs(SCHEDULE_RETRY_SECS));
        assert_eq!(scheduler.advance(&clock, &mut gamma), None);

        assert_eq!(scheduler.pending().map(|e| e.kind), Some(SolarEventKind::Sunset));
        assert!(!gamma.is_enabled());
    }

    #[test]
    fn stop_clears_the_pending_event() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        let (_fake, mut gamma, clock) = setup(now);
        let mut scheduler = AstronomicalScheduler::new(NYC.0, NYC.1, 3400);
        scheduler.start(&clock, &mut gamma);
        scheduler.stop();
        assert!(scheduler.pending().is_none());
        assert!(scheduler.next_deadline().is_none());
        clock.advance(Duration::from_secs(86_400));
        assert_eq!(scheduler.advance(&clock, &mut gamma), None);
    }
}
