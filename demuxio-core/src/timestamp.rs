//! Timestamp and time base handling.
//!
//! Container tags carry millisecond timestamps; the consumer boundary uses
//! microseconds. `TimeBase` makes those conversions explicit.

use crate::rational::Rational;
use std::cmp::Ordering;
use std::fmt;

/// A time base for interpreting timestamp values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Microsecond time base (1/1000000).
    pub const MICROSECONDS: Self = Self(Rational {
        num: 1,
        den: 1_000_000,
    });

    /// Second time base (1/1).
    pub const SECONDS: Self = Self(Rational { num: 1, den: 1 });

    /// Convert a value from this time base to another.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        self.0.rescale(value, target.0)
    }

    /// Convert a value in this time base to seconds.
    pub fn to_seconds(&self, value: i64) -> f64 {
        value as f64 * self.0.to_f64()
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MILLISECONDS
    }
}

/// A timestamp paired with its time base.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Sentinel for an undefined timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create an undefined timestamp.
    pub fn none() -> Self {
        Self {
            value: Self::NONE,
            time_base: TimeBase::default(),
        }
    }

    /// Check if this timestamp is defined.
    pub fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }

    /// Convert to a different time base.
    pub fn rescale(&self, target: TimeBase) -> Self {
        if !self.is_valid() {
            return Self::none();
        }
        Self {
            value: self.time_base.convert(self.value, target),
            time_base: target,
        }
    }

    /// Create from milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            value: millis,
            time_base: TimeBase::MILLISECONDS,
        }
    }

    /// Create from microseconds.
    pub fn from_micros(micros: i64) -> Self {
        Self {
            value: micros,
            time_base: TimeBase::MICROSECONDS,
        }
    }

    /// Convert to milliseconds.
    pub fn to_millis(&self) -> Option<i64> {
        if self.is_valid() {
            Some(self.time_base.convert(self.value, TimeBase::MILLISECONDS))
        } else {
            None
        }
    }

    /// Convert to microseconds.
    pub fn to_micros(&self) -> Option<i64> {
        if self.is_valid() {
            Some(self.time_base.convert(self.value, TimeBase::MICROSECONDS))
        } else {
            None
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return !self.is_valid() && !other.is_valid();
        }
        let tb = finer_base(self.time_base, other.time_base);
        self.rescale(tb).value == other.rescale(tb).value
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let tb = finer_base(self.time_base, other.time_base);
        Some(self.rescale(tb).value.cmp(&other.rescale(tb).value))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:.3}s", self.time_base.to_seconds(self.value))
        } else {
            write!(f, "NONE")
        }
    }
}

/// A duration paired with its time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// The raw duration value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Duration {
    /// Create a new duration.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// A zero-length duration.
    pub fn zero() -> Self {
        Self {
            value: 0,
            time_base: TimeBase::default(),
        }
    }

    /// Create from milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            value: millis,
            time_base: TimeBase::MILLISECONDS,
        }
    }

    /// Convert to a different time base.
    pub fn rescale(&self, target: TimeBase) -> Self {
        Self {
            value: self.time_base.convert(self.value, target),
            time_base: target,
        }
    }

    /// Convert to milliseconds.
    pub fn to_millis(&self) -> i64 {
        self.time_base.convert(self.value, TimeBase::MILLISECONDS)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

fn finer_base(a: TimeBase, b: TimeBase) -> TimeBase {
    if a.0.den > b.0.den {
        a
    } else {
        b
    }
}
