//! Fixed-unit duration arithmetic for usage logs.
//!
//! Durations are stored as signed 64-bit nanosecond counts and reported in
//! seconds. Heartbeats arrive in whole seconds, so stored values are multiples
//! of [`NANOS_PER_SECOND`] unless written directly in nanoseconds.

use serde::{Deserialize, Serialize};

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Accumulated usage duration with nanosecond granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageDuration(i64);

impl UsageDuration {
    pub const ZERO: Self = Self(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Convert a heartbeat delta in seconds. Returns `None` when the value
    /// does not fit in 64-bit nanoseconds.
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        seconds.checked_mul(NANOS_PER_SECOND).map(Self)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Whole seconds, truncated toward zero (59.999s -> 59).
    pub const fn whole_seconds(self) -> i64 {
        self.0 / NANOS_PER_SECOND
    }

    /// Whole seconds, rounded toward negative infinity.
    ///
    /// Identical to [`whole_seconds`](Self::whole_seconds) for non-negative values.
    pub const fn floor_seconds(self) -> i64 {
        self.0.div_euclid(NANOS_PER_SECOND)
    }

    /// Fractional seconds without truncation.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SECOND as f64
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}
