pub mod clock;
pub mod day_night_cycle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use day_night_cycle::{day_phase, DayNightCycle, DayPeriod};
