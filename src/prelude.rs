//! Commonly used types, reexported for glob imports.

pub use crate::runtime::{
    Builder, ConfigError, Event, EventFn, EventId, EventKey, Kernel, KernelExt, RealtimeHandle,
    RealtimeRuntime, RunOutcome, Runtime, SimulatorHandle, StandardLogger, State, SyncMode,
    NO_CONTEXT,
};
pub use crate::scheduler::{Scheduler, SchedulerKind};
pub use crate::sync::{Synchronizer, WallClockSynchronizer};
pub use crate::time::{SimTime, TimeUnit};
