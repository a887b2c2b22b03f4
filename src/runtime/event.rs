use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::Kernel;
use crate::time::SimTime;

/// The context of events that were not scheduled on behalf of any context.
pub const NO_CONTEXT: u32 = 0xffff_ffff;

///
/// The deferred work of an event.
///
/// Bodies run on the thread owning the kernel and receive the kernel
/// itself, so that they can schedule follow-up events.
///
pub type EventFn = Box<dyn FnOnce(&mut dyn Kernel) + 'static>;

/// An event body submitted from another thread.
pub type RemoteFn = Box<dyn FnOnce(&mut dyn Kernel) + Send + 'static>;

///
/// The ordering key of a scheduled event.
///
/// Keys are totally ordered by `(ts, uid)`. The `context` travels with the
/// key but takes no part in comparisons.
///
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    pub ts: SimTime,
    pub uid: u64,
    pub context: u32,
}

impl EventKey {
    pub fn new(ts: SimTime, uid: u64, context: u32) -> EventKey {
        EventKey { ts, uid, context }
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.uid == other.uid
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts.cmp(&other.ts).then(self.uid.cmp(&other.uid))
    }
}

impl Hash for EventKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ts.hash(state);
        self.uid.hash(state);
    }
}

pub(crate) struct EventImpl {
    cancelled: Cell<bool>,
    body: Cell<Option<EventFn>>,
}

impl EventImpl {
    fn new(body: EventFn) -> Rc<EventImpl> {
        Rc::new(EventImpl {
            cancelled: Cell::new(false),
            body: Cell::new(Some(body)),
        })
    }

    fn cancel(&self) {
        self.cancelled.set(true);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn has_body(&self) -> bool {
        let body = self.body.take();
        let present = body.is_some();
        self.body.set(body);
        present
    }
}

///
/// A scheduled unit of work.
///
/// The event shares its body with the handles pointing to it, but it
/// is the only owner: once the event is dropped, handles observe the
/// body as gone.
///
pub struct Event {
    key: EventKey,
    imp: Rc<EventImpl>,
}

impl Event {
    ///
    /// Creates a new event with the given key.
    ///
    /// Kernels allocate keys themselves. This constructor exists for
    /// driving a [`Scheduler`](crate::scheduler::Scheduler) directly.
    ///
    pub fn new(key: EventKey, body: impl FnOnce(&mut dyn Kernel) + 'static) -> Event {
        Event::from_boxed(key, Box::new(body))
    }

    pub(crate) fn from_boxed(key: EventKey, body: EventFn) -> Event {
        Event {
            key,
            imp: EventImpl::new(body),
        }
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn ts(&self) -> SimTime {
        self.key.ts
    }

    pub fn is_cancelled(&self) -> bool {
        self.imp.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.imp.cancel()
    }

    ///
    /// Creates a handle observing this event.
    ///
    pub fn handle(&self) -> EventId {
        EventId {
            imp: Rc::downgrade(&self.imp),
            ts: self.key.ts,
            context: self.key.context,
            uid: self.key.uid,
        }
    }

    ///
    /// Indicates whether `id` refers to this very event.
    ///
    pub(crate) fn is(&self, id: &EventId) -> bool {
        std::ptr::eq(Rc::as_ptr(&self.imp), id.imp.as_ptr())
    }

    ///
    /// Consumes the event, running its body unless it was cancelled.
    /// Returns whether the body was executed.
    ///
    pub(crate) fn invoke(self, kernel: &mut dyn Kernel) -> bool {
        if self.imp.is_cancelled() {
            return false;
        }
        match self.imp.body.take() {
            Some(body) => {
                body(kernel);
                true
            }
            None => false,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("ts", &self.key.ts)
            .field("uid", &self.key.uid)
            .field("context", &self.key.context)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

///
/// A handle to a scheduled event.
///
/// Handles never keep an event alive. Use [`Kernel::is_expired`],
/// [`Kernel::cancel`] and [`Kernel::remove`] to observe or
/// withdraw the event.
///
#[derive(Clone)]
pub struct EventId {
    imp: Weak<EventImpl>,
    ts: SimTime,
    context: u32,
    uid: u64,
}

impl EventId {
    /// The uid of handles that never referred to an event.
    pub const INVALID_UID: u64 = 0;
    /// Reserved for events scheduled at the current time.
    pub const NOW_UID: u64 = 1;
    /// The uid shared by all destroy-time events.
    pub const DESTROY_UID: u64 = 2;
    /// The first uid handed out to ordinary events.
    pub const FIRST_UID: u64 = 4;

    pub(crate) fn destroy(event: &Event) -> EventId {
        EventId {
            uid: Self::DESTROY_UID,
            ..event.handle()
        }
    }

    pub fn ts(&self) -> SimTime {
        self.ts
    }

    pub fn context(&self) -> u32 {
        self.context
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.ts, self.uid, self.context)
    }

    pub fn is_destroy(&self) -> bool {
        self.uid == Self::DESTROY_UID
    }

    ///
    /// Indicates whether the body is still present and not cancelled.
    ///
    pub(crate) fn is_live(&self) -> bool {
        match self.imp.upgrade() {
            Some(imp) => !imp.is_cancelled() && imp.has_body(),
            None => false,
        }
    }

    pub(crate) fn cancel(&self) {
        if let Some(imp) = self.imp.upgrade() {
            imp.cancel();
        }
    }
}

impl Default for EventId {
    fn default() -> Self {
        EventId {
            imp: Weak::new(),
            ts: SimTime::ZERO,
            context: 0,
            uid: Self::INVALID_UID,
        }
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.imp.ptr_eq(&other.imp)
            && self.ts == other.ts
            && self.context == other.context
            && self.uid == other.uid
    }
}

impl Eq for EventId {}

impl Debug for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventId")
            .field("ts", &self.ts)
            .field("uid", &self.uid)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ts: u64, uid: u64) -> EventKey {
        EventKey::new(SimTime::from_ticks(ts), uid, NO_CONTEXT)
    }

    #[test]
    fn key_ordering_ignores_context() {
        assert!(key(3, 9) < key(5, 1));
        assert!(key(5, 1) < key(5, 2));
        assert_eq!(
            EventKey::new(SimTime::from_ticks(5), 1, 0),
            EventKey::new(SimTime::from_ticks(5), 1, 7)
        );
    }

    #[test]
    fn handles_observe_without_owning() {
        let event = Event::new(key(1, 4), |_| {});
        let id = event.handle();
        assert!(id.is_live());
        assert!(event.is(&id));

        drop(event);
        assert!(!id.is_live());
    }

    #[test]
    fn cancel_through_handle() {
        let event = Event::new(key(1, 4), |_| {});
        let id = event.handle();
        id.cancel();
        assert!(event.is_cancelled());
        assert!(!id.is_live());
    }

    #[test]
    fn default_handle_is_invalid() {
        let id = EventId::default();
        assert_eq!(id.uid(), EventId::INVALID_UID);
        assert!(!id.is_live());
        // cancelling an invalid handle is a no-op
        id.cancel();
    }

    #[test]
    fn handle_equality() {
        let a = Event::new(key(1, 4), |_| {});
        let b = Event::new(key(1, 4), |_| {});
        assert_eq!(a.handle(), a.handle());
        assert_ne!(a.handle(), b.handle());
        assert_ne!(a.handle(), EventId::destroy(&a));
    }
}
