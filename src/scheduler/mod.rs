//! Ordered containers of pending events.
//!
//! A [`Scheduler`] is a priority queue over [`EventKey`]s. The kernel only
//! depends on the trait, so that backends can be exchanged at construction
//! time or even in the middle of a run (see [`Kernel::set_scheduler`]).
//!
//! [`Kernel::set_scheduler`]: crate::runtime::Kernel::set_scheduler

use std::fmt::Display;
use std::str::FromStr;

use crate::runtime::{ConfigError, Event, EventKey};

mod calendar;
mod heap;
mod list;
mod map;

pub use calendar::CalendarScheduler;
pub use heap::HeapScheduler;
pub use list::ListScheduler;
pub use map::MapScheduler;

#[cfg(test)]
mod tests;

///
/// A priority queue of events, ordered by their [`EventKey`].
///
/// `remove_next` always yields the event with the globally minimal key
/// among those inserted and not yet removed. Since uids are unique, keys
/// never tie.
///
pub trait Scheduler {
    ///
    /// A human-readable name of the backend.
    ///
    fn descriptor(&self) -> String;

    ///
    /// The number of pending events.
    ///
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///
    /// Adds an event to the queue.
    ///
    fn insert(&mut self, event: Event);

    ///
    /// Returns the earliest event without removing it.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    ///
    fn peek_next(&self) -> &Event;

    ///
    /// Removes and returns the earliest event.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    ///
    fn remove_next(&mut self) -> Event;

    ///
    /// Removes the event with the given key.
    ///
    /// # Panics
    ///
    /// Panics if no such event is queued.
    ///
    fn remove(&mut self, key: &EventKey) -> Event;
}

///
/// The available scheduler backends.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulerKind {
    /// A self-resizing calendar queue, amortized O(1).
    #[default]
    Calendar,
    /// A binary heap, O(log n).
    Heap,
    /// A balanced search tree, O(log n).
    Map,
    /// A sorted list, O(n) insertion.
    List,
}

impl SchedulerKind {
    ///
    /// Creates an empty scheduler of this kind.
    ///
    pub fn create(self) -> Box<dyn Scheduler> {
        match self {
            Self::Calendar => Box::new(CalendarScheduler::new()),
            Self::Heap => Box::new(HeapScheduler::new()),
            Self::Map => Box::new(MapScheduler::new()),
            Self::List => Box::new(ListScheduler::new()),
        }
    }

    pub const ALL: [SchedulerKind; 4] = [Self::Calendar, Self::Heap, Self::Map, Self::List];
}

impl Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calendar => write!(f, "calendar"),
            Self::Heap => write!(f, "heap"),
            Self::Map => write!(f, "map"),
            Self::List => write!(f, "list"),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" | "cqueue" => Ok(Self::Calendar),
            "heap" => Ok(Self::Heap),
            "map" => Ok(Self::Map),
            "list" => Ok(Self::List),
            _ => Err(ConfigError::UnknownScheduler(s.to_string())),
        }
    }
}

pub(crate) fn empty_queue() -> ! {
    fatal!("cannot fetch from empty scheduler")
}

pub(crate) fn missing_event(key: &EventKey) -> ! {
    fatal!(
        "cannot remove event (ts: {:?}, uid: {}) that is not scheduled",
        key.ts,
        key.uid
    )
}
