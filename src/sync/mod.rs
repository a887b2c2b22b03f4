//! Pacing virtual time against the wall clock.

use crate::time::SimTime;

mod wall_clock;
pub use wall_clock::WallClockSynchronizer;

///
/// Maps virtual-time deadlines onto real waits.
///
/// All methods take `&self`: the owning thread waits while other threads
/// [`signal`](Synchronizer::signal) new submissions concurrently.
///
pub trait Synchronizer: Send + Sync {
    ///
    /// Whether this synchronizer follows real time at all.
    ///
    fn is_realtime(&self) -> bool;

    ///
    /// Anchors virtual time `ts` to the current real time.
    ///
    fn set_origin(&self, ts: SimTime);

    ///
    /// The virtual time that was anchored by the last `set_origin`.
    ///
    fn origin(&self) -> SimTime;

    ///
    /// The current real time, expressed in virtual time.
    ///
    fn now(&self) -> SimTime;

    ///
    /// How far real time is ahead of `ts`, in ticks. Negative values
    /// mean real time lags behind.
    ///
    fn drift(&self, ts: SimTime) -> i64;

    ///
    /// Waits `delay` relative to the reading `ts_now` of [`now`](Synchronizer::now).
    ///
    /// Returns `true` if the full delay elapsed and `false` if the
    /// wait was interrupted by a [`signal`](Synchronizer::signal).
    ///
    fn wait(&self, ts_now: SimTime, delay: SimTime) -> bool;

    ///
    /// Interrupts an ongoing or the next wait.
    ///
    fn signal(&self);

    ///
    /// Sets the interrupt condition directly. The kernel clears it before
    /// each wait.
    ///
    fn set_condition(&self, cond: bool);

    ///
    /// Marks the start of an event body.
    ///
    fn event_start(&self);

    ///
    /// Marks the end of an event body, returning its real duration.
    ///
    fn event_end(&self) -> SimTime;
}
