use std::collections::VecDeque;

use super::{empty_queue, missing_event, Scheduler};
use crate::runtime::{Event, EventKey};

///
/// A sorted list of events.
///
/// Insertion binary-searches the position, so the cost lies in shifting
/// the tail. Removing the next event is O(1).
///
#[derive(Debug, Default)]
pub struct ListScheduler {
    list: VecDeque<Event>,
}

impl ListScheduler {
    pub fn new() -> ListScheduler {
        ListScheduler {
            list: VecDeque::new(),
        }
    }
}

impl Scheduler for ListScheduler {
    fn descriptor(&self) -> String {
        format!("ListScheduler {{ len: {} }}", self.list.len())
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn insert(&mut self, event: Event) {
        // Most events are scheduled after all pending ones.
        if self.list.back().map_or(true, |last| *last < event) {
            self.list.push_back(event);
            return;
        }

        let idx = match self.list.binary_search_by(|probe| probe.key().cmp(event.key())) {
            Ok(_) => fatal!(
                "duplicate event key (ts: {:?}, uid: {})",
                event.ts(),
                event.key().uid
            ),
            Err(idx) => idx,
        };
        self.list.insert(idx, event);
    }

    fn peek_next(&self) -> &Event {
        match self.list.front() {
            Some(event) => event,
            None => empty_queue(),
        }
    }

    fn remove_next(&mut self) -> Event {
        match self.list.pop_front() {
            Some(event) => event,
            None => empty_queue(),
        }
    }

    fn remove(&mut self, key: &EventKey) -> Event {
        match self.list.binary_search_by(|probe| probe.key().cmp(key)) {
            Ok(idx) => match self.list.remove(idx) {
                Some(event) => event,
                None => missing_event(key),
            },
            Err(_) => missing_event(key),
        }
    }
}
