//! Virtual time.

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use std::time::Duration;

use crate::runtime::ConfigError;

mod unit;
pub use unit::TimeUnit;

const NANOS_PER_SEC: u128 = 1_000_000_000;

///
/// A point in (or a span of) virtual time, measured in ticks.
///
/// The length of a tick is defined by the process-wide
/// [`TimeUnit::resolution`]. Timestamps are totally ordered
/// and never negative.
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0);

    /// The largest representable timestamp.
    pub const MAX: SimTime = SimTime(i64::MAX as u64);

    ///
    /// Creates a timestamp from a raw tick count.
    ///
    /// # Panics
    ///
    /// Panics if `ticks` exceeds [`SimTime::MAX`].
    ///
    pub fn from_ticks(ticks: u64) -> SimTime {
        if ticks > Self::MAX.0 {
            fatal!("{} ticks exceed the maximum simulation time", ticks);
        }
        SimTime(ticks)
    }

    ///
    /// Returns the raw tick count.
    ///
    pub const fn ticks(self) -> u64 {
        self.0
    }

    pub fn from_secs(secs: u64) -> SimTime {
        Self::from_nanos_u128(secs as u128 * NANOS_PER_SEC)
    }

    pub fn from_millis(millis: u64) -> SimTime {
        Self::from_nanos_u128(millis as u128 * 1_000_000)
    }

    pub fn from_micros(micros: u64) -> SimTime {
        Self::from_nanos_u128(micros as u128 * 1_000)
    }

    pub fn from_nanos(nanos: u64) -> SimTime {
        Self::from_nanos_u128(nanos as u128)
    }

    ///
    /// Converts a wall-clock duration into ticks of the active resolution,
    /// truncating towards zero.
    ///
    pub fn from_duration(duration: Duration) -> SimTime {
        Self::from_nanos_u128(duration.as_nanos())
    }

    ///
    /// Converts the tick count back into a wall-clock duration.
    ///
    pub fn as_duration(self) -> Duration {
        let nanos = self.as_nanos_u128();
        Duration::new(
            (nanos / NANOS_PER_SEC) as u64,
            (nanos % NANOS_PER_SEC) as u32,
        )
    }

    pub(crate) fn as_nanos_u128(self) -> u128 {
        self.0 as u128 * TimeUnit::resolution().nanos_per_tick() as u128
    }

    fn from_nanos_u128(nanos: u128) -> SimTime {
        let ticks = nanos / TimeUnit::resolution().nanos_per_tick() as u128;
        if ticks > Self::MAX.0 as u128 {
            fatal!("time value of {}ns exceeds the maximum simulation time", nanos);
        }
        SimTime(ticks as u64)
    }

    ///
    /// Adds two timestamps, returning `None` beyond [`SimTime::MAX`].
    ///
    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.0
            .checked_add(rhs.0)
            .filter(|&t| t <= Self::MAX.0)
            .map(SimTime)
    }

    pub fn checked_sub(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_sub(rhs.0).map(SimTime)
    }

    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0).min(Self::MAX.0))
    }

    pub fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }

    ///
    /// The distance between two timestamps, regardless of their order.
    ///
    pub fn abs_diff(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.abs_diff(rhs.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        match self.checked_add(rhs) {
            Some(t) => t,
            None => fatal!("time overflow: {:?} + {:?} exceeds SimTime::MAX", self, rhs),
        }
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        match self.checked_sub(rhs) {
            Some(t) => t,
            None => fatal!("time underflow: {:?} - {:?} is negative", self, rhs),
        }
    }
}

impl SubAssign for SimTime {
    fn sub_assign(&mut self, rhs: SimTime) {
        *self = *self - rhs;
    }
}

impl From<Duration> for SimTime {
    fn from(duration: Duration) -> Self {
        SimTime::from_duration(duration)
    }
}

impl From<SimTime> for Duration {
    fn from(time: SimTime) -> Self {
        time.as_duration()
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimTime({} ticks)", self.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_duration())
    }
}

impl FromStr for SimTime {
    type Err = ConfigError;

    ///
    /// Parses a duration such as `"100ms"` or `"1.5s"` (see [`parse_duration`]).
    /// A number without unit is read as a raw tick count.
    ///
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return match trimmed.parse::<u64>() {
                Ok(ticks) if ticks <= Self::MAX.0 => Ok(SimTime(ticks)),
                _ => Err(ConfigError::InvalidTime(s.to_string())),
            };
        }

        let nanos = parse_duration(s)?.as_nanos();
        let ticks = nanos / TimeUnit::resolution().nanos_per_tick() as u128;
        if ticks > Self::MAX.0 as u128 {
            return Err(ConfigError::InvalidTime(s.to_string()));
        }
        Ok(SimTime(ticks as u64))
    }
}

///
/// Parses a wall-clock duration written as `"<number><unit>"`.
///
/// The units `h`, `min`, `s`, `ms`, `us` (or `µs`) and `ns` are accepted,
/// the number may carry a fraction.
///
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let err = || ConfigError::InvalidTime(s.to_string());

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return Err(err());
    }

    let nanos_per_unit: u128 = match unit.trim() {
        "h" => 3600 * NANOS_PER_SEC,
        "min" => 60 * NANOS_PER_SEC,
        "s" => NANOS_PER_SEC,
        "ms" => 1_000_000,
        "us" | "µs" => 1_000,
        "ns" => 1,
        _ => return Err(err()),
    };

    let nanos = if number.contains('.') {
        let value = number.parse::<f64>().map_err(|_| err())?;
        (value * nanos_per_unit as f64).round() as u128
    } else {
        let value = number.parse::<u128>().map_err(|_| err())?;
        value.checked_mul(nanos_per_unit).ok_or_else(err)?
    };

    let secs = u64::try_from(nanos / NANOS_PER_SEC).map_err(|_| err())?;
    Ok(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}
