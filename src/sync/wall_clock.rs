use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::Synchronizer;
use crate::time::{SimTime, TimeUnit};

const DEFAULT_JIFFY: Duration = Duration::from_millis(1);

// Jiffies left to the spin phase.
const SPIN_JIFFIES: u32 = 3;

///
/// A synchronizer following the monotonic system clock.
///
/// Waits sleep on a condition variable for all but the last few
/// jiffies of a delay and busy-spin for the rest, which trades CPU time
/// for precision close to the deadline. Both phases observe the interrupt
/// condition.
///
pub struct WallClockSynchronizer {
    jiffy: Duration,
    epoch: Instant,

    // nanoseconds since `epoch` at which `origin_ts` was anchored
    origin_real: AtomicU64,
    origin_ts: AtomicU64,
    event_start: AtomicU64,

    condition: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl WallClockSynchronizer {
    ///
    /// Creates a synchronizer with a jiffy of one millisecond,
    /// anchoring virtual time zero to the current instant.
    ///
    pub fn new() -> WallClockSynchronizer {
        Self::with_jiffy(DEFAULT_JIFFY)
    }

    ///
    /// Creates a synchronizer with a custom sleep granularity.
    ///
    pub fn with_jiffy(jiffy: Duration) -> WallClockSynchronizer {
        WallClockSynchronizer {
            jiffy: jiffy.max(Duration::from_nanos(1)),
            epoch: Instant::now(),
            origin_real: AtomicU64::new(0),
            origin_ts: AtomicU64::new(0),
            event_start: AtomicU64::new(0),
            condition: AtomicBool::new(false),
            lock: Mutex::new(()),
            cvar: Condvar::new(),
        }
    }

    pub fn jiffy(&self) -> Duration {
        self.jiffy
    }

    fn real_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    ///
    /// Sleeps until `deadline` unless interrupted.
    ///
    fn sleep_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.condition.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            guard = self
                .cvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    ///
    /// Waits `remaining` unless interrupted. Returns `true` once the full
    /// duration has elapsed.
    ///
    fn wait_for(&self, remaining: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(remaining) else {
            // beyond any representable instant, only a signal ends the wait
            log::trace!("sleeping {:?} until signalled", remaining);
            return self.sleep_until_signalled();
        };

        let spin = self.jiffy * SPIN_JIFFIES;
        if remaining > spin {
            log::trace!("sleeping {:?}, spinning {:?}", remaining - spin, spin);
            if !self.sleep_until(deadline - spin) {
                return false;
            }
        }
        self.spin_until(deadline)
    }

    fn sleep_until_signalled(&self) -> bool {
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.condition.load(Ordering::Acquire) {
            guard = self.cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        false
    }

    ///
    /// Busy-waits until `deadline` unless interrupted.
    ///
    fn spin_until(&self, deadline: Instant) -> bool {
        loop {
            if self.condition.load(Ordering::Acquire) {
                return false;
            }
            if Instant::now() >= deadline {
                return true;
            }
            std::hint::spin_loop();
        }
    }
}

impl Default for WallClockSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchronizer for WallClockSynchronizer {
    fn is_realtime(&self) -> bool {
        true
    }

    fn set_origin(&self, ts: SimTime) {
        self.origin_ts.store(ts.ticks(), Ordering::Release);
        self.origin_real.store(self.real_nanos(), Ordering::Release);
    }

    fn origin(&self) -> SimTime {
        SimTime::from_ticks(self.origin_ts.load(Ordering::Acquire))
    }

    fn now(&self) -> SimTime {
        let elapsed = self
            .real_nanos()
            .saturating_sub(self.origin_real.load(Ordering::Acquire));
        let ticks = elapsed / TimeUnit::resolution().nanos_per_tick();
        self.origin().saturating_add(SimTime::from_ticks(ticks))
    }

    fn drift(&self, ts: SimTime) -> i64 {
        self.now().ticks() as i64 - ts.ticks() as i64
    }

    fn wait(&self, ts_now: SimTime, delay: SimTime) -> bool {
        // Time spent since the caller read the clock counts against the delay.
        let late = self.now().saturating_sub(ts_now);
        if late >= delay {
            return true;
        }
        self.wait_for((delay - late).as_duration())
    }

    fn signal(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.condition.store(true, Ordering::Release);
        self.cvar.notify_all();
    }

    fn set_condition(&self, cond: bool) {
        self.condition.store(cond, Ordering::Release);
    }

    fn event_start(&self) {
        self.event_start.store(self.real_nanos(), Ordering::Release);
    }

    fn event_end(&self) -> SimTime {
        let start = self.event_start.load(Ordering::Acquire);
        SimTime::from_nanos(self.real_nanos().saturating_sub(start))
    }
}

impl Debug for WallClockSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallClockSynchronizer")
            .field("jiffy", &self.jiffy)
            .field("origin", &self.origin())
            .field("condition", &self.condition.load(Ordering::Relaxed))
            .finish()
    }
}
