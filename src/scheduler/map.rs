use std::collections::BTreeMap;

use super::{empty_queue, missing_event, Scheduler};
use crate::runtime::{Event, EventKey};

///
/// A scheduler backed by an ordered [`BTreeMap`].
///
#[derive(Debug, Default)]
pub struct MapScheduler {
    map: BTreeMap<EventKey, Event>,
}

impl MapScheduler {
    pub fn new() -> MapScheduler {
        MapScheduler {
            map: BTreeMap::new(),
        }
    }
}

impl Scheduler for MapScheduler {
    fn descriptor(&self) -> String {
        format!("MapScheduler {{ len: {} }}", self.map.len())
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn insert(&mut self, event: Event) {
        let key = *event.key();
        if self.map.insert(key, event).is_some() {
            fatal!("duplicate event key (ts: {:?}, uid: {})", key.ts, key.uid);
        }
    }

    fn peek_next(&self) -> &Event {
        match self.map.first_key_value() {
            Some((_, event)) => event,
            None => empty_queue(),
        }
    }

    fn remove_next(&mut self) -> Event {
        match self.map.pop_first() {
            Some((_, event)) => event,
            None => empty_queue(),
        }
    }

    fn remove(&mut self, key: &EventKey) -> Event {
        match self.map.remove(key) {
            Some(event) => event,
            None => missing_event(key),
        }
    }
}
