use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

use super::core::KernelCore;
use super::{
    forward_to_core, ConfigError, EventFn, EventId, Kernel, RealtimeHandle, RunOutcome,
    SimulatorHandle, State,
};
use crate::scheduler::SchedulerKind;
use crate::sync::Synchronizer;
use crate::time::SimTime;

///
/// How a [`RealtimeRuntime`] reacts when it cannot keep up with real time.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMode {
    /// Keep going, however late.
    #[default]
    BestEffort,
    /// Abort once the jitter exceeds the hard limit.
    HardLimit,
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => write!(f, "best-effort"),
            Self::HardLimit => write!(f, "hard-limit"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best-effort" | "BestEffort" => Ok(Self::BestEffort),
            "hard-limit" | "HardLimit" => Ok(Self::HardLimit),
            _ => Err(ConfigError::UnknownSyncMode(s.to_string())),
        }
    }
}

///
/// A kernel that executes every event no earlier than its timestamp,
/// measured in real time since the start of the run.
///
/// Before each event the kernel waits on its [`Synchronizer`]. The wait is
/// interrupted by submissions from other threads, after which the kernel
/// re-examines the head of the queue. Once an event has run, the distance
/// between real time and virtual time is compared against the hard limit.
///
/// ```no_run
/// use des_kernel::prelude::*;
///
/// let mut rt = Builder::new().quiet().build_realtime();
/// rt.schedule(SimTime::from_millis(100), |k| {
///     println!("100ms passed: {}", k.as_realtime().unwrap().realtime_now());
/// });
/// rt.run();
/// ```
///
pub struct RealtimeRuntime {
    core: KernelCore,
    synchronizer: Arc<dyn Synchronizer>,

    mode: SyncMode,
    hard_limit: SimTime,
    keep_alive: bool,
    quiet: bool,
}

impl RealtimeRuntime {
    pub(crate) fn from_parts(
        core: KernelCore,
        synchronizer: Arc<dyn Synchronizer>,
        mode: SyncMode,
        hard_limit: SimTime,
        keep_alive: bool,
        quiet: bool,
    ) -> RealtimeRuntime {
        RealtimeRuntime {
            core,
            synchronizer,
            mode,
            hard_limit,
            keep_alive,
            quiet,
        }
    }

    ///
    /// Executes events paced by real time until the queue drains or a
    /// stop is requested.
    ///
    /// With keep-alive enabled an empty queue does not end the run,
    /// the kernel waits for submissions from other threads instead.
    ///
    /// # Panics
    ///
    /// Panics if the kernel was destroyed, or, in
    /// [`SyncMode::HardLimit`], if an event finishes later than the hard
    /// limit allows.
    ///
    pub fn run(&mut self) -> RunOutcome {
        self.core.begin_run();
        self.synchronizer.set_origin(self.core.now());
        if !self.quiet {
            log::info!(
                "Real-time simulation starting at {} ({} events, {}, {} with limit {})",
                self.core.now(),
                self.core.num_events_pending(),
                self.core.scheduler.descriptor(),
                self.mode,
                self.hard_limit
            );
        }

        self.drain_remote();
        let outcome = loop {
            if self.core.stop_requested() {
                break RunOutcome::Stopped;
            }
            if self.core.scheduler.is_empty() {
                if self.keep_alive {
                    self.idle();
                    continue;
                }
                break RunOutcome::Drained;
            }
            self.process_one_event();
        };

        self.core.end_run(outcome);
        if !self.quiet {
            log::info!(
                "Real-time simulation {} at {} after {} events",
                match outcome {
                    RunOutcome::Stopped => "stopped",
                    RunOutcome::Drained => "ended",
                },
                self.core.now(),
                self.core.num_events_dispatched()
            );
        }
        outcome
    }

    fn process_one_event(&mut self) {
        loop {
            // Cleared before draining, so that a submission racing with
            // the drain still interrupts the following wait.
            self.synchronizer.set_condition(false);
            self.drain_remote();
            if self.core.stop_requested() {
                return;
            }

            let ts_now = self.synchronizer.now();
            let next = self.core.scheduler.peek_next().ts();
            let delay = next.saturating_sub(ts_now);
            log::trace!("waiting {} for event at {} (real time {})", delay, next, ts_now);

            if self.synchronizer.wait(ts_now, delay) {
                break;
            }
        }

        let event = self.core.next_event();
        let uid = event.key().uid;

        self.synchronizer.event_start();
        event.invoke(self);
        let elapsed = self.synchronizer.event_end();

        let jitter = self.synchronizer.now().abs_diff(self.core.now());
        log::trace!("event {} took {}, jitter {}", uid, elapsed, jitter);

        if jitter > self.hard_limit {
            match self.mode {
                SyncMode::HardLimit => fatal!(
                    "hard real-time limit exceeded (jitter = {}, limit = {})",
                    jitter,
                    self.hard_limit
                ),
                SyncMode::BestEffort => {
                    log::debug!("falling behind real time (jitter = {})", jitter)
                }
            }
        }
    }

    fn idle(&mut self) {
        self.synchronizer.set_condition(false);
        self.drain_remote();
        if self.core.scheduler.is_empty() && !self.core.stop_requested() {
            let idle = SimTime::from_secs(1);
            self.synchronizer.wait(self.synchronizer.now(), idle);
        }
    }

    fn drain_remote(&mut self) {
        let base = self.realtime_base();
        self.core.drain_remote(Some(base));
    }

    ///
    /// Real time while running, virtual time otherwise. Never earlier
    /// than the current virtual time.
    ///
    fn realtime_base(&self) -> SimTime {
        if self.core.state() == State::Running {
            self.synchronizer.now().max(self.core.now())
        } else {
            self.core.now()
        }
    }

    ///
    /// The current real time, expressed in virtual time since the origin
    /// of the run.
    ///
    pub fn realtime_now(&self) -> SimTime {
        self.synchronizer.now()
    }

    ///
    /// Schedules `f` in the current context, `delay` after the current
    /// real time.
    ///
    pub fn schedule_realtime<F>(&mut self, delay: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        let context = self.core.context();
        self.schedule_realtime_with_context(context, delay, f)
    }

    pub fn schedule_realtime_with_context<F>(&mut self, context: u32, delay: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        let ts = self.realtime_base() + delay;
        self.core.schedule_at(ts, context, Box::new(f))
    }

    ///
    /// Schedules `f` at the current real time.
    ///
    pub fn schedule_realtime_now<F>(&mut self, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        self.schedule_realtime(SimTime::ZERO, f)
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.mode
    }

    pub fn set_sync_mode(&mut self, mode: SyncMode) {
        self.mode = mode;
    }

    pub fn hard_limit(&self) -> SimTime {
        self.hard_limit
    }

    ///
    /// Sets the tolerated distance between real and virtual time.
    ///
    pub fn set_hard_limit(&mut self, limit: SimTime) {
        self.hard_limit = limit;
    }

    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    pub fn synchronizer(&self) -> &Arc<dyn Synchronizer> {
        &self.synchronizer
    }

    ///
    /// Creates a handle for submissions from other threads, including
    /// submissions relative to real time.
    ///
    pub fn realtime_handle(&self) -> RealtimeHandle {
        RealtimeHandle::new(self.core.remote.clone())
    }

    ///
    /// Tears the kernel down, see [`Runtime::destroy`](super::Runtime::destroy).
    ///
    pub fn destroy(&mut self) {
        if self.core.state() == State::Destroyed {
            return;
        }
        self.core.clear_scheduler();
        while let Some(event) = self.core.next_destroy_event() {
            event.invoke(self);
        }
        self.core.set_destroyed();
    }

    pub fn state(&self) -> State {
        self.core.state()
    }

    pub fn scheduler_kind(&self) -> SchedulerKind {
        self.core.kind()
    }

    pub fn num_events_dispatched(&self) -> usize {
        self.core.num_events_dispatched()
    }

    pub fn num_events_pending(&self) -> usize {
        self.core.num_events_pending()
    }
}

impl Kernel for RealtimeRuntime {
    forward_to_core!();

    fn handle(&self) -> SimulatorHandle {
        SimulatorHandle::new(self.core.remote.clone())
    }

    fn as_realtime(&mut self) -> Option<&mut RealtimeRuntime> {
        Some(self)
    }
}

impl Drop for RealtimeRuntime {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.core.clear_destroy_events();
            return;
        }
        self.destroy();
    }
}

impl Debug for RealtimeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeRuntime")
            .field("sim_time", &self.core.now())
            .field("state", &self.core.state())
            .field("dispatched", &self.core.num_events_dispatched())
            .field("enqueued", &self.core.num_events_pending())
            .field("mode", &self.mode)
            .field("hard_limit", &self.hard_limit)
            .finish()
    }
}
