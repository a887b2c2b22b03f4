use std::collections::VecDeque;
use std::sync::Arc;

use super::remote::{Remote, TimeBase};
use super::{Event, EventFn, EventId, EventKey, RunOutcome, State, NO_CONTEXT};
use crate::scheduler::{Scheduler, SchedulerKind};
use crate::sync::Synchronizer;
use crate::time::SimTime;

///
/// The state and bookkeeping shared by all kernels.
///
pub(crate) struct KernelCore {
    pub(crate) scheduler: Box<dyn Scheduler>,
    kind: SchedulerKind,

    current_ts: SimTime,
    current_uid: u64,
    current_context: u32,

    next_uid: u64,
    unscheduled: usize,
    dispatched: usize,

    stop: bool,
    state: State,

    destroy_events: VecDeque<Event>,
    pub(crate) remote: Arc<Remote>,
}

impl KernelCore {
    pub(crate) fn new(kind: SchedulerKind, synchronizer: Option<Arc<dyn Synchronizer>>) -> Self {
        KernelCore {
            scheduler: kind.create(),
            kind,

            current_ts: SimTime::ZERO,
            current_uid: EventId::INVALID_UID,
            current_context: NO_CONTEXT,

            next_uid: EventId::FIRST_UID,
            unscheduled: 0,
            dispatched: 0,

            stop: false,
            state: State::Idle,

            destroy_events: VecDeque::new(),
            remote: Remote::new(synchronizer),
        }
    }

    pub(crate) fn now(&self) -> SimTime {
        self.current_ts
    }

    pub(crate) fn context(&self) -> u32 {
        self.current_context
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub(crate) fn num_events_dispatched(&self) -> usize {
        self.dispatched
    }

    pub(crate) fn num_events_pending(&self) -> usize {
        self.unscheduled
    }

    ///
    /// Inserts a new event at the absolute time `ts`.
    ///
    pub(crate) fn schedule_at(&mut self, ts: SimTime, context: u32, body: EventFn) -> EventId {
        if ts < self.current_ts {
            fatal!(
                "cannot schedule an event at {:?} before the current time {:?}",
                ts,
                self.current_ts
            );
        }

        let key = EventKey::new(ts, self.next_uid, context);
        self.next_uid += 1;

        let event = Event::from_boxed(key, body);
        let id = event.handle();
        self.scheduler.insert(event);
        self.unscheduled += 1;

        log::trace!("scheduled event {} at {} (context {})", key.uid, ts, context);
        id
    }

    pub(crate) fn schedule(&mut self, context: u32, delay: SimTime, body: EventFn) -> EventId {
        let Some(ts) = self.current_ts.checked_add(delay) else {
            fatal!(
                "cannot schedule an event {:?} after {:?}, beyond the maximum simulation time",
                delay,
                self.current_ts
            )
        };
        self.schedule_at(ts, context, body)
    }

    pub(crate) fn schedule_now(&mut self, body: EventFn) -> EventId {
        self.schedule_at(self.current_ts, self.current_context, body)
    }

    pub(crate) fn schedule_destroy(&mut self, body: EventFn) -> EventId {
        let key = EventKey::new(self.current_ts, EventId::DESTROY_UID, NO_CONTEXT);
        // Destroy events consume a uid, even though their handles carry the reserved one.
        self.next_uid += 1;

        let event = Event::from_boxed(key, body);
        let id = EventId::destroy(&event);
        self.destroy_events.push_back(event);
        id
    }

    pub(crate) fn remove(&mut self, id: &EventId) {
        if id.is_destroy() {
            self.destroy_events.retain(|event| !event.is(id));
            return;
        }
        if self.is_expired(id) {
            return;
        }

        let event = self.scheduler.remove(&id.key());
        self.unscheduled -= 1;
        event.cancel();
    }

    pub(crate) fn cancel(&mut self, id: &EventId) {
        if !self.is_expired(id) {
            id.cancel();
        }
    }

    pub(crate) fn is_expired(&self, id: &EventId) -> bool {
        if id.is_destroy() {
            return !id.is_live() || !self.destroy_events.iter().any(|event| event.is(id));
        }

        !id.is_live()
            || id.ts() < self.current_ts
            || (id.ts() == self.current_ts && id.uid() <= self.current_uid)
    }

    pub(crate) fn delay_left(&self, id: &EventId) -> SimTime {
        if self.is_expired(id) {
            SimTime::ZERO
        } else {
            id.ts().saturating_sub(self.current_ts)
        }
    }

    ///
    /// Moves all pending cross-context submissions into the scheduler.
    ///
    /// Submissions relative to real time use `realtime` as their base,
    /// never earlier than the current time.
    ///
    pub(crate) fn drain_remote(&mut self, realtime: Option<SimTime>) -> usize {
        let events = self.remote.queue.take();
        let n = events.len();
        for event in events {
            let base = match event.base {
                TimeBase::Simulation => self.current_ts,
                TimeBase::Realtime => realtime.unwrap_or(self.current_ts).max(self.current_ts),
            };
            let body: EventFn = event.body;
            self.schedule(event.context, base.saturating_sub(self.current_ts) + event.delay, body);
        }
        if n > 0 {
            log::trace!("drained {} cross-context submissions", n);
        }
        n
    }

    ///
    /// Dequeues the next event and advances the clock to it.
    ///
    pub(crate) fn next_event(&mut self) -> Event {
        let event = self.scheduler.remove_next();
        self.unscheduled -= 1;

        let key = *event.key();
        if key.ts < self.current_ts {
            fatal!(
                "scheduler order violated: dequeued event {} at {:?} before the current time {:?}",
                key.uid,
                key.ts,
                self.current_ts
            );
        }

        self.current_ts = key.ts;
        self.current_uid = key.uid;
        self.current_context = key.context;
        self.dispatched += 1;

        log::trace!("handling event {} at {} (context {})", key.uid, key.ts, key.context);
        event
    }

    ///
    /// Replaces the scheduler, moving every pending event.
    ///
    pub(crate) fn set_scheduler(&mut self, kind: SchedulerKind) {
        let mut next = kind.create();
        while !self.scheduler.is_empty() {
            next.insert(self.scheduler.remove_next());
        }
        log::debug!(
            "switched scheduler {} -> {} ({} events)",
            self.kind,
            kind,
            next.len()
        );
        self.scheduler = next;
        self.kind = kind;
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop = true;
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop || self.remote.is_stop_requested()
    }

    pub(crate) fn begin_run(&mut self) {
        if self.state == State::Destroyed {
            fatal!("cannot run a kernel that was destroyed");
        }
        // A stop requested through a handle before the run still applies to it.
        self.stop = false;
        self.state = State::Running;
    }

    pub(crate) fn end_run(&mut self, outcome: RunOutcome) {
        if outcome == RunOutcome::Drained && self.unscheduled != 0 {
            fatal!("empty queue and {} unprocessed events", self.unscheduled);
        }
        self.stop = false;
        self.remote.reset_stop();
        self.state = match outcome {
            RunOutcome::Stopped => State::Stopped,
            RunOutcome::Drained => State::Drained,
        };
    }

    ///
    /// Drops every pending event without running it.
    ///
    pub(crate) fn clear_scheduler(&mut self) {
        let mut dropped = 0;
        while !self.scheduler.is_empty() {
            drop(self.scheduler.remove_next());
            dropped += 1;
        }
        self.unscheduled = 0;
        if dropped > 0 {
            log::debug!("dropped {} pending events", dropped);
        }
    }

    ///
    /// Hands out the destroy events one at a time, so that running bodies
    /// may still register or cancel further ones.
    ///
    pub(crate) fn next_destroy_event(&mut self) -> Option<Event> {
        self.destroy_events.pop_front()
    }

    pub(crate) fn clear_destroy_events(&mut self) {
        self.destroy_events.clear();
    }

    pub(crate) fn set_destroyed(&mut self) {
        self.state = State::Destroyed;
    }
}
