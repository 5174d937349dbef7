//! Simulated time
//!
//! The emulator measures everything in abstract time units. One unit maps to
//! one millisecond of [`Duration`], so the protocol engines can keep using
//! ordinary durations while the channel model works in fractional units.

use std::time::Duration;

/// Length of one simulated time unit
pub const TIME_UNIT: Duration = Duration::from_millis(1);

/// Convert fractional time units to a duration
///
/// Negative and non-finite inputs clamp to zero, values too large for a
/// [`Duration`] saturate at [`Duration::MAX`].
pub fn from_units(units: f64) -> Duration {
    if units.is_finite() && units > 0.0 {
        try_from_units(units).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Convert fractional time units to a duration, if representable
///
/// Returns `None` for negative, non-finite or out-of-range inputs.
pub fn try_from_units(units: f64) -> Option<Duration> {
    if !units.is_finite() || units < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(units * TIME_UNIT.as_secs_f64()).ok()
}

/// Convert a duration to fractional time units
pub fn as_units(duration: Duration) -> f64 {
    duration.as_secs_f64() / TIME_UNIT.as_secs_f64()
}

/// Monotonic simulation clock
///
/// Only moves forward; an attempt to move it backwards is ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    now: Duration,
}

impl SimClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Jump to `at` if it lies in the future
    pub fn advance_to(&mut self, at: Duration) {
        if at > self.now {
            self.now = at;
        }
    }
}
