use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::core::KernelCore;
use super::{ConfigError, RealtimeRuntime, Runtime, SyncMode};
use crate::scheduler::SchedulerKind;
use crate::sync::{Synchronizer, WallClockSynchronizer};
use crate::time::{parse_duration, SimTime, TimeUnit};

const DEFAULT_HARD_LIMIT: Duration = Duration::from_millis(100);

///
/// A builder for kernel instances.
///
/// ```
/// use des_kernel::prelude::*;
///
/// let rt = Builder::new()
///     .quiet()
///     .scheduler(SchedulerKind::Heap)
///     .build();
/// assert_eq!(rt.scheduler_kind(), SchedulerKind::Heap);
/// ```
///
#[must_use]
#[derive(Debug, Clone)]
pub struct Builder {
    quiet: bool,
    scheduler: SchedulerKind,
    resolution: Option<TimeUnit>,

    sync_mode: SyncMode,
    hard_limit: Duration,
    jiffy: Option<Duration>,
    keep_alive: bool,
}

impl Builder {
    ///
    /// Creates a builder with the default configuration: a calendar queue,
    /// the current resolution, best-effort synchronization with a hard
    /// limit of 100ms.
    ///
    pub fn new() -> Builder {
        Builder {
            quiet: false,
            scheduler: SchedulerKind::default(),
            resolution: None,

            sync_mode: SyncMode::default(),
            hard_limit: DEFAULT_HARD_LIMIT,
            jiffy: None,
            keep_alive: false,
        }
    }

    ///
    /// Creates a builder configured from the environment.
    ///
    /// | Variable | Value |
    /// |---|---|
    /// | `DES_SCHEDULER` | `calendar`, `heap`, `map` or `list` |
    /// | `DES_RESOLUTION` | `s`, `ms`, `us` or `ns` |
    /// | `DES_SYNC_MODE` | `best-effort` or `hard-limit` |
    /// | `DES_HARD_LIMIT` | a duration such as `50ms` |
    ///
    /// Unset variables keep their defaults.
    ///
    pub fn from_env() -> Result<Builder, ConfigError> {
        let mut builder = Builder::new();
        if let Some(kind) = env_var::<SchedulerKind>("DES_SCHEDULER")? {
            builder.scheduler = kind;
        }
        if let Some(unit) = env_var::<TimeUnit>("DES_RESOLUTION")? {
            builder.resolution = Some(unit);
        }
        if let Some(mode) = env_var::<SyncMode>("DES_SYNC_MODE")? {
            builder.sync_mode = mode;
        }
        if let Some(limit) = std::env::var_os("DES_HARD_LIMIT") {
            builder.hard_limit = parse_duration(&limit.to_string_lossy())
                .map_err(|e| ConfigError::env("DES_HARD_LIMIT", e))?;
        }
        Ok(builder)
    }

    ///
    /// Suppresses the start and end messages of runs.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Selects the scheduler backend.
    ///
    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.scheduler = kind;
        self
    }

    ///
    /// Sets the process-wide time resolution when the kernel is built.
    ///
    pub fn resolution(mut self, unit: TimeUnit) -> Self {
        self.resolution = Some(unit);
        self
    }

    ///
    /// Sets the synchronization mode of real-time kernels.
    ///
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    ///
    /// Sets the tolerated jitter of real-time kernels.
    ///
    pub fn hard_limit(mut self, limit: Duration) -> Self {
        self.hard_limit = limit;
        self
    }

    ///
    /// Sets the sleep granularity of the wall-clock synchronizer.
    ///
    pub fn jiffy(mut self, jiffy: Duration) -> Self {
        self.jiffy = Some(jiffy);
        self
    }

    ///
    /// Lets real-time kernels wait for submissions on an empty queue
    /// instead of returning.
    ///
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    ///
    /// Builds a virtual-time kernel.
    ///
    /// # Panics
    ///
    /// Panics if a resolution was requested that differs from the one
    /// already frozen by an earlier kernel.
    ///
    pub fn build(self) -> Runtime {
        self.prepare();
        Runtime::from_parts(KernelCore::new(self.scheduler, None), self.quiet)
    }

    ///
    /// Builds a real-time kernel following the system clock.
    ///
    pub fn build_realtime(self) -> RealtimeRuntime {
        let synchronizer = match self.jiffy {
            Some(jiffy) => WallClockSynchronizer::with_jiffy(jiffy),
            None => WallClockSynchronizer::new(),
        };
        self.build_realtime_with(Arc::new(synchronizer))
    }

    ///
    /// Builds a real-time kernel on a custom synchronizer.
    ///
    pub fn build_realtime_with(self, synchronizer: Arc<dyn Synchronizer>) -> RealtimeRuntime {
        self.prepare();
        let core = KernelCore::new(self.scheduler, Some(synchronizer.clone()));
        RealtimeRuntime::from_parts(
            core,
            synchronizer,
            self.sync_mode,
            SimTime::from_duration(self.hard_limit),
            self.keep_alive,
            self.quiet,
        )
    }

    fn prepare(&self) {
        if let Some(unit) = self.resolution {
            TimeUnit::set_resolution(unit);
        }
        TimeUnit::freeze();
        if !self.quiet {
            log::debug!(
                "building kernel: scheduler = {}, resolution = {}",
                self.scheduler,
                TimeUnit::resolution()
            );
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = ConfigError>,
{
    match std::env::var_os(name) {
        Some(value) => value
            .to_string_lossy()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::env(name, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "DES_SCHEDULER",
            "DES_RESOLUTION",
            "DES_SYNC_MODE",
            "DES_HARD_LIMIT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        std::env::set_var("DES_SCHEDULER", "map");
        std::env::set_var("DES_SYNC_MODE", "hard-limit");
        std::env::set_var("DES_HARD_LIMIT", "25ms");

        let builder = Builder::from_env().unwrap();
        clear_env();

        assert_eq!(builder.scheduler, SchedulerKind::Map);
        assert_eq!(builder.sync_mode, SyncMode::HardLimit);
        assert_eq!(builder.hard_limit, Duration::from_millis(25));
        assert_eq!(builder.resolution, None);
    }

    #[test]
    #[serial]
    fn invalid_env_values_are_reported() {
        clear_env();
        std::env::set_var("DES_SCHEDULER", "fifo");
        let err = Builder::from_env().unwrap_err();
        clear_env();

        assert_eq!(
            err,
            ConfigError::env("DES_SCHEDULER", ConfigError::UnknownScheduler("fifo".into()))
        );
    }

    #[test]
    #[serial]
    fn unset_env_keeps_defaults() {
        clear_env();
        let builder = Builder::from_env().unwrap();
        assert_eq!(builder.scheduler, SchedulerKind::Calendar);
        assert_eq!(builder.sync_mode, SyncMode::BestEffort);
        assert_eq!(builder.hard_limit, DEFAULT_HARD_LIMIT);
    }

    #[test]
    fn realtime_defaults() {
        let rt = Builder::new().quiet().build_realtime();
        assert_eq!(rt.sync_mode(), SyncMode::BestEffort);
        assert_eq!(rt.hard_limit(), SimTime::from_millis(100));
        assert!(TimeUnit::is_frozen());
    }
}
