use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{Kernel, RemoteFn};
use crate::sync::Synchronizer;
use crate::time::SimTime;

///
/// The time a cross-context submission is relative to.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeBase {
    /// The kernel's current virtual time at drain.
    Simulation,
    /// The synchronizer's real time at drain.
    Realtime,
}

pub(crate) struct RemoteEvent {
    pub(crate) context: u32,
    pub(crate) delay: SimTime,
    pub(crate) base: TimeBase,
    pub(crate) body: RemoteFn,
}

///
/// Submissions from foreign threads, waiting to be drained by the
/// owning thread.
///
/// The `empty` flag lets the owner skip the lock while nothing is pending.
///
pub(crate) struct CrossContextQueue {
    events: Mutex<Vec<RemoteEvent>>,
    empty: AtomicBool,
}

impl CrossContextQueue {
    fn new() -> CrossContextQueue {
        CrossContextQueue {
            events: Mutex::new(Vec::new()),
            empty: AtomicBool::new(true),
        }
    }

    fn push(&self, event: RemoteEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push(event);
        self.empty.store(false, Ordering::Release);
    }

    ///
    /// Takes all pending submissions in FIFO order.
    ///
    pub(crate) fn take(&self) -> Vec<RemoteEvent> {
        if self.empty.load(Ordering::Acquire) {
            return Vec::new();
        }
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        self.empty.store(true, Ordering::Release);
        std::mem::take(&mut *events)
    }
}

///
/// The state shared between a kernel and its handles.
///
pub(crate) struct Remote {
    pub(crate) queue: CrossContextQueue,
    stop: AtomicBool,
    synchronizer: Option<Arc<dyn Synchronizer>>,
    // base of `SimulatorHandle::schedule_with_context`
    default_base: TimeBase,
}

impl Remote {
    ///
    /// Creates the shared state of a kernel. Kernels paced by a
    /// synchronizer take plain submissions relative to real time.
    ///
    pub(crate) fn new(synchronizer: Option<Arc<dyn Synchronizer>>) -> Arc<Remote> {
        let default_base = match synchronizer {
            Some(_) => TimeBase::Realtime,
            None => TimeBase::Simulation,
        };
        Arc::new(Remote {
            queue: CrossContextQueue::new(),
            stop: AtomicBool::new(false),
            synchronizer,
            default_base,
        })
    }

    fn submit(&self, event: RemoteEvent) {
        self.queue.push(event);
        self.wake();
    }

    fn wake(&self) {
        if let Some(sync) = &self.synchronizer {
            sync.signal();
        }
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn reset_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }
}

///
/// A thread-safe handle to a kernel.
///
/// Handles can be cloned and sent to other threads. Their submissions
/// are queued and inserted by the owning thread between two events,
/// relative to the kernel's time at that moment: virtual time for a
/// [`Runtime`](super::Runtime), the real time of a running
/// [`RealtimeRuntime`](super::RealtimeRuntime).
///
/// ```
/// use des_kernel::prelude::*;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let mut rt = Builder::new().quiet().build();
/// let handle = rt.handle();
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = fired.clone();
/// std::thread::spawn(move || {
///     handle.schedule_with_context(7, SimTime::from_millis(1), move |k| {
///         assert_eq!(k.context(), 7);
///         flag.store(true, Ordering::SeqCst);
///     });
/// })
/// .join()
/// .unwrap();
///
/// rt.run();
/// assert!(fired.load(Ordering::SeqCst));
/// ```
///
#[derive(Clone)]
pub struct SimulatorHandle {
    remote: Arc<Remote>,
}

impl SimulatorHandle {
    pub(crate) fn new(remote: Arc<Remote>) -> SimulatorHandle {
        SimulatorHandle { remote }
    }

    ///
    /// Schedules `f` in `context`, `delay` after the kernel's time at the
    /// moment the submission is drained.
    ///
    pub fn schedule_with_context<F>(&self, context: u32, delay: SimTime, f: F)
    where
        F: FnOnce(&mut dyn Kernel) + Send + 'static,
    {
        self.submit(context, delay, self.remote.default_base, Box::new(f));
    }

    ///
    /// Asks the kernel to stop before its next event.
    ///
    pub fn stop(&self) {
        self.remote.stop.store(true, Ordering::Release);
        self.remote.wake();
    }

    fn submit(&self, context: u32, delay: SimTime, base: TimeBase, body: RemoteFn) {
        self.remote.submit(RemoteEvent {
            context,
            delay,
            base,
            body,
        });
    }
}

impl std::fmt::Debug for SimulatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorHandle")
            .field("stop_requested", &self.remote.is_stop_requested())
            .finish()
    }
}

///
/// A thread-safe handle to a [`RealtimeRuntime`](super::RealtimeRuntime).
///
/// In addition to the operations of [`SimulatorHandle`], submissions can be
/// made relative to real time.
///
#[derive(Clone, Debug)]
pub struct RealtimeHandle {
    inner: SimulatorHandle,
}

impl RealtimeHandle {
    pub(crate) fn new(remote: Arc<Remote>) -> RealtimeHandle {
        RealtimeHandle {
            inner: SimulatorHandle::new(remote),
        }
    }

    ///
    /// Schedules `f` in `context`, `delay` after the real time at which the
    /// submission is drained.
    ///
    pub fn schedule_realtime_with_context<F>(&self, context: u32, delay: SimTime, f: F)
    where
        F: FnOnce(&mut dyn Kernel) + Send + 'static,
    {
        self.inner
            .submit(context, delay, TimeBase::Realtime, Box::new(f));
    }

    ///
    /// Schedules `f` in `context` at the real time of the drain.
    ///
    pub fn schedule_realtime_now_with_context<F>(&self, context: u32, f: F)
    where
        F: FnOnce(&mut dyn Kernel) + Send + 'static,
    {
        self.schedule_realtime_with_context(context, SimTime::ZERO, f);
    }
}

impl Deref for RealtimeHandle {
    type Target = SimulatorHandle;

    fn deref(&self) -> &SimulatorHandle {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn noop() -> RemoteFn {
        Box::new(|_| {})
    }

    #[test]
    fn queue_is_fifo_and_resets_its_flag() {
        let queue = CrossContextQueue::new();
        assert!(queue.take().is_empty());

        for context in 0..3 {
            queue.push(RemoteEvent {
                context,
                delay: SimTime::ZERO,
                base: TimeBase::Simulation,
                body: noop(),
            });
        }
        let contexts = queue.take().iter().map(|e| e.context).collect::<Vec<_>>();
        assert_eq!(contexts, vec![0, 1, 2]);
        assert!(queue.empty.load(Ordering::Acquire));
        assert!(queue.take().is_empty());
    }

    #[test]
    fn concurrent_submissions_are_all_queued() {
        let remote = Remote::new(None);
        let threads = (0..8)
            .map(|context| {
                let handle = SimulatorHandle::new(remote.clone());
                thread::spawn(move || {
                    for _ in 0..100 {
                        handle.schedule_with_context(context, SimTime::ZERO, |_| {});
                    }
                })
            })
            .collect::<Vec<_>>();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(remote.queue.take().len(), 800);
    }

    #[test]
    fn synchronized_kernels_default_to_real_time() {
        use crate::sync::WallClockSynchronizer;

        let plain = SimulatorHandle::new(Remote::new(None));
        plain.schedule_with_context(0, SimTime::ZERO, |_| {});
        let paced = Remote::new(Some(Arc::new(WallClockSynchronizer::new())));
        SimulatorHandle::new(paced.clone()).schedule_with_context(0, SimTime::ZERO, |_| {});

        assert_eq!(plain.remote.queue.take()[0].base, TimeBase::Simulation);
        assert_eq!(paced.queue.take()[0].base, TimeBase::Realtime);
    }

    #[test]
    fn stop_is_visible_to_the_kernel() {
        let remote = Remote::new(None);
        let handle = SimulatorHandle::new(remote.clone());
        assert!(!remote.is_stop_requested());
        handle.stop();
        assert!(remote.is_stop_requested());
        remote.reset_stop();
        assert!(!remote.is_stop_requested());
    }
}
