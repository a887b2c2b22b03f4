use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::runtime::ConfigError;

static RESOLUTION: AtomicU8 = AtomicU8::new(TimeUnit::Nanoseconds as u8);
static FROZEN: AtomicBool = AtomicBool::new(false);

///
/// The real-world length of one tick of virtual time.
///
/// The resolution is a process-wide setting. It may be changed freely
/// until the first kernel is built and is frozen afterwards.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TimeUnit {
    Seconds = 0,
    Milliseconds = 1,
    Microseconds = 2,
    #[default]
    Nanoseconds = 3,
}

impl TimeUnit {
    ///
    /// The number of nanoseconds covered by one tick of this unit.
    ///
    pub const fn nanos_per_tick(self) -> u64 {
        match self {
            Self::Seconds => 1_000_000_000,
            Self::Milliseconds => 1_000_000,
            Self::Microseconds => 1_000,
            Self::Nanoseconds => 1,
        }
    }

    ///
    /// Returns the currently active resolution.
    ///
    pub fn resolution() -> TimeUnit {
        Self::from_raw(RESOLUTION.load(Ordering::Acquire))
    }

    ///
    /// Changes the process-wide resolution.
    ///
    /// # Panics
    ///
    /// Panics if a kernel was already built with a different resolution.
    /// Setting the active resolution again is always allowed.
    ///
    pub fn set_resolution(unit: TimeUnit) {
        let current = Self::resolution();
        if current == unit {
            return;
        }
        if FROZEN.load(Ordering::Acquire) {
            fatal!(
                "cannot change the time resolution from {} to {} once a kernel was built",
                current,
                unit
            );
        }
        RESOLUTION.store(unit as u8, Ordering::Release);
    }

    ///
    /// Indicates whether the resolution can no longer be changed.
    ///
    pub fn is_frozen() -> bool {
        FROZEN.load(Ordering::Acquire)
    }

    pub(crate) fn freeze() {
        FROZEN.store(true, Ordering::Release);
    }

    fn from_raw(raw: u8) -> TimeUnit {
        match raw {
            0 => Self::Seconds,
            1 => Self::Milliseconds,
            2 => Self::Microseconds,
            _ => Self::Nanoseconds,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seconds => write!(f, "s"),
            Self::Milliseconds => write!(f, "ms"),
            Self::Microseconds => write!(f, "us"),
            Self::Nanoseconds => write!(f, "ns"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(Self::Seconds),
            "ms" | "milliseconds" => Ok(Self::Milliseconds),
            "us" | "µs" | "microseconds" => Ok(Self::Microseconds),
            "ns" | "nanoseconds" => Ok(Self::Nanoseconds),
            _ => Err(ConfigError::InvalidUnit(s.to_string())),
        }
    }
}
