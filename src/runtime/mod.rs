//! Simulation kernels.
//!
//! A kernel owns a [`Scheduler`](crate::scheduler::Scheduler), hands out
//! [`EventId`]s for scheduled work and executes events in order until the
//! queue drains or a stop is requested. The [`Runtime`] does so in pure
//! virtual time, the [`RealtimeRuntime`] paces the execution against the
//! wall clock.

use std::fmt::{Debug, Display};

use crate::scheduler::SchedulerKind;
use crate::time::SimTime;

mod builder;
mod core;
mod error;
mod event;
mod logger;
mod realtime;
mod remote;

pub use self::builder::Builder;
pub use self::error::ConfigError;
pub use self::event::{Event, EventFn, EventId, EventKey, RemoteFn, NO_CONTEXT};
pub use self::logger::StandardLogger;
pub use self::realtime::{RealtimeRuntime, SyncMode};
pub use self::remote::{RealtimeHandle, SimulatorHandle};

use self::core::KernelCore;


///
/// The lifecycle of a kernel.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Built, but never run.
    Idle,
    /// Inside `run`.
    Running,
    /// The last run ended on a stop request.
    Stopped,
    /// The last run ended with an empty queue.
    Drained,
    /// Torn down, the destroy events have fired.
    Destroyed,
}

///
/// Why a call to `run` returned.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// A stop was requested.
    Stopped,
    /// No events were left.
    Drained,
}

///
/// The scheduling interface of a kernel.
///
/// Event bodies receive the executing kernel as `&mut dyn Kernel`. The
/// generic conveniences live in [`KernelExt`], which is implemented for
/// every kernel.
///
/// Kernels are neither `Send` nor `Sync`: this interface can only be used
/// from the thread that built the kernel. Other threads use a
/// [`SimulatorHandle`].
///
/// ```compile_fail
/// use des_kernel::prelude::*;
///
/// let rt = Builder::new().quiet().build();
/// std::thread::spawn(move || drop(rt));
/// ```
///
pub trait Kernel {
    ///
    /// The current virtual time.
    ///
    fn now(&self) -> SimTime;

    ///
    /// The context of the executing event, [`NO_CONTEXT`] outside of events.
    ///
    fn context(&self) -> u32;

    ///
    /// Schedules `body` in `context`, `delay` after the current time.
    ///
    /// # Panics
    ///
    /// Panics if the timestamp would exceed [`Kernel::max_simulation_time`].
    ///
    fn schedule_boxed(&mut self, context: u32, delay: SimTime, body: EventFn) -> EventId;

    ///
    /// Schedules `body` at the current time, after all events already
    /// scheduled for it.
    ///
    fn schedule_now_boxed(&mut self, body: EventFn) -> EventId;

    ///
    /// Registers `body` to run once when the kernel is destroyed.
    ///
    fn schedule_destroy_boxed(&mut self, body: EventFn) -> EventId;

    ///
    /// Removes a pending event from the queue right away.
    ///
    /// Removing an expired event is a no-op.
    ///
    fn remove(&mut self, id: &EventId);

    ///
    /// Cancels a pending event. It stays queued, but its body will
    /// never run.
    ///
    fn cancel(&mut self, id: &EventId);

    ///
    /// Whether the event has run, was cancelled or removed, or never
    /// existed.
    ///
    fn is_expired(&self, id: &EventId) -> bool;

    ///
    /// The virtual time until the event is due, zero once expired.
    ///
    fn delay_left(&self, id: &EventId) -> SimTime;

    fn max_simulation_time(&self) -> SimTime {
        SimTime::MAX
    }

    ///
    /// Stops the run after the executing event.
    ///
    fn stop(&mut self);

    ///
    /// Stops the run `delay` after the current time.
    ///
    fn stop_in(&mut self, delay: SimTime) -> EventId {
        let context = self.context();
        self.schedule_boxed(context, delay, Box::new(|k: &mut dyn Kernel| k.stop()))
    }

    ///
    /// Replaces the scheduler backend, keeping all pending events.
    ///
    fn set_scheduler(&mut self, kind: SchedulerKind);

    ///
    /// Creates a handle for submissions from other threads.
    ///
    fn handle(&self) -> SimulatorHandle;

    ///
    /// Access to the real-time API, if this is a real-time kernel.
    ///
    fn as_realtime(&mut self) -> Option<&mut RealtimeRuntime> {
        None
    }
}

///
/// Generic scheduling shorthands for every [`Kernel`].
///
pub trait KernelExt: Kernel {
    ///
    /// Schedules `f` in the current context, `delay` after the current time.
    ///
    fn schedule<F>(&mut self, delay: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        let context = self.context();
        self.schedule_boxed(context, delay, Box::new(f))
    }

    fn schedule_with_context<F>(&mut self, context: u32, delay: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        self.schedule_boxed(context, delay, Box::new(f))
    }

    fn schedule_now<F>(&mut self, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        self.schedule_now_boxed(Box::new(f))
    }

    fn schedule_destroy<F>(&mut self, f: F) -> EventId
    where
        F: FnOnce(&mut dyn Kernel) + 'static,
    {
        self.schedule_destroy_boxed(Box::new(f))
    }
}

impl<K: Kernel + ?Sized> KernelExt for K {}

// The part of `Kernel` that every kernel forwards to its `KernelCore`.
macro_rules! forward_to_core {
    () => {
        fn now(&self) -> SimTime {
            self.core.now()
        }

        fn context(&self) -> u32 {
            self.core.context()
        }

        fn schedule_boxed(&mut self, context: u32, delay: SimTime, body: EventFn) -> EventId {
            self.core.schedule(context, delay, body)
        }

        fn schedule_now_boxed(&mut self, body: EventFn) -> EventId {
            self.core.schedule_now(body)
        }

        fn schedule_destroy_boxed(&mut self, body: EventFn) -> EventId {
            self.core.schedule_destroy(body)
        }

        fn remove(&mut self, id: &EventId) {
            self.core.remove(id)
        }

        fn cancel(&mut self, id: &EventId) {
            self.core.cancel(id)
        }

        fn is_expired(&self, id: &EventId) -> bool {
            self.core.is_expired(id)
        }

        fn delay_left(&self, id: &EventId) -> SimTime {
            self.core.delay_left(id)
        }

        fn stop(&mut self) {
            self.core.request_stop()
        }

        fn set_scheduler(&mut self, kind: SchedulerKind) {
            self.core.set_scheduler(kind)
        }
    };
}
pub(crate) use forward_to_core;

///
/// A kernel advancing virtual time as fast as events can be executed.
///
/// # Examples
///
/// ```
/// use des_kernel::prelude::*;
///
/// let mut rt = Builder::new().quiet().build();
/// let id = rt.schedule(SimTime::from_secs(1), |_| unreachable!());
/// rt.cancel(&id);
///
/// assert_eq!(rt.run(), RunOutcome::Drained);
/// assert!(rt.is_expired(&id));
/// ```
///
pub struct Runtime {
    core: KernelCore,
    quiet: bool,
}

impl Runtime {
    ///
    /// Creates a runtime with the default configuration.
    ///
    pub fn new() -> Runtime {
        Builder::new().build()
    }

    pub(crate) fn from_parts(core: KernelCore, quiet: bool) -> Runtime {
        Runtime { core, quiet }
    }

    ///
    /// Executes events until the queue drains or a stop is requested.
    ///
    /// Cross-context submissions are drained before the first and after
    /// every event.
    ///
    /// # Panics
    ///
    /// Panics if the kernel was destroyed.
    ///
    pub fn run(&mut self) -> RunOutcome {
        self.core.begin_run();
        if !self.quiet {
            log::info!(
                "Simulation starting at {} ({} events, {})",
                self.core.now(),
                self.core.num_events_pending(),
                self.core.scheduler.descriptor()
            );
        }

        self.core.drain_remote(None);
        let outcome = loop {
            if self.core.stop_requested() {
                break RunOutcome::Stopped;
            }
            if self.core.scheduler.is_empty() {
                break RunOutcome::Drained;
            }

            let event = self.core.next_event();
            event.invoke(self);
            self.core.drain_remote(None);
        };

        self.core.end_run(outcome);
        if !self.quiet {
            log::info!(
                "Simulation {} at {} after {} events",
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

    ///
    /// Tears the kernel down: drops all pending events, then runs the
    /// destroy events in registration order. Destroying twice is a no-op.
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

    pub fn scheduler_descriptor(&self) -> String {
        self.core.scheduler.descriptor()
    }

    ///
    /// The number of events taken from the queue so far, including
    /// cancelled ones.
    ///
    pub fn num_events_dispatched(&self) -> usize {
        self.core.num_events_dispatched()
    }

    ///
    /// The number of events still queued.
    ///
    pub fn num_events_pending(&self) -> usize {
        self.core.num_events_pending()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for Runtime {
    forward_to_core!();

    fn handle(&self) -> SimulatorHandle {
        SimulatorHandle::new(self.core.remote.clone())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // Never run bodies while unwinding.
            self.core.clear_destroy_events();
            return;
        }
        self.destroy();
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("sim_time", &self.core.now())
            .field("state", &self.core.state())
            .field("dispatched", &self.core.num_events_dispatched())
            .field("enqueued", &self.core.num_events_pending())
            .field("scheduler", &self.core.kind())
            .finish()
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime {{ sim_time: {} dispatched: {} enqueued: {} }}",
            self.core.now(),
            self.core.num_events_dispatched(),
            self.core.num_events_pending()
        )
    }
}
