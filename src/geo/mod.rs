//! Solar calculations and the sunset/sunrise schedule.
//!
//! - [`solar`]: sunrise and sunset instants for a coordinate and UTC date
//! - [`scheduler`]: picks the next solar event and toggles the filter when it arrives

pub mod scheduler;
pub mod solar;

pub use scheduler::{AstronomicalScheduler, ScheduledSolarEvent, SolarEventKind, plan_next_event};
pub use solar::{SolarTimes, solar_times};
