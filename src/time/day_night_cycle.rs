use serde::{Deserialize, Serialize};

/// Fraction of the current day cycle elapsed since `start_ms`, in `[0, 1)`.
///
/// Times before the start wrap backwards into the previous cycle. A zero
/// cycle length always reports 0.
pub fn day_phase(start_ms: i64, now_ms: i64, cycle_secs: u64) -> f32 {
    let cycle_ms = cycle_secs as i64 * 1000;
    if cycle_ms <= 0 {
        return 0.0;
    }
    let into_cycle = (now_ms - start_ms).rem_euclid(cycle_ms);
    let phase = into_cycle as f64 / cycle_ms as f64;
    // f32 rounding can land exactly on 1.0 for the last millisecond
    (phase as f32).min(1.0 - f32::EPSILON)
}

/// Coarse period of the day, phase 0 being sunrise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Day,
    Sunset,
    Night,
    Sunrise,
}

impl DayPeriod {
    pub fn from_phase(phase: f32) -> Self {
        match phase {
            p if p < 0.45 => DayPeriod::Day,
            p if p < 0.55 => DayPeriod::Sunset,
            p if p < 0.95 => DayPeriod::Night,
            _ => DayPeriod::Sunrise,
        }
    }
}

/// Shared game clock of one room, anchored at the moment play began
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayNightCycle {
    pub start_ms: i64,
    pub cycle_secs: u64,
}

impl DayNightCycle {
    pub fn new(start_ms: i64, cycle_secs: u64) -> Self {
        Self {
            start_ms,
            cycle_secs,
        }
    }

    pub fn phase_at(&self, now_ms: i64) -> f32 {
        day_phase(self.start_ms, now_ms, self.cycle_secs)
    }

    pub fn period_at(&self, now_ms: i64) -> DayPeriod {
        DayPeriod::from_phase(self.phase_at(now_ms))
    }

    /// Completed cycles since the start
    pub fn day_count(&self, now_ms: i64) -> i64 {
        let cycle_ms = self.cycle_secs as i64 * 1000;
        if cycle_ms <= 0 {
            return 0;
        }
        (now_ms - self.start_ms).div_euclid(cycle_ms)
    }
}
