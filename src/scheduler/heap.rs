use super::{empty_queue, missing_event, Scheduler};
use crate::runtime::{Event, EventKey};

///
/// An implicit binary min-heap.
///
/// The children of slot `i` live at `2i + 1` and `2i + 2`. Removing an
/// arbitrary event needs a linear search, the restoring sift is
/// logarithmic.
///
#[derive(Debug, Default)]
pub struct HeapScheduler {
    heap: Vec<Event>,
}

impl HeapScheduler {
    pub fn new() -> HeapScheduler {
        HeapScheduler { heap: Vec::new() }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[idx] >= self.heap[parent] {
                break;
            }
            self.heap.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < len && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.heap.swap(idx, smallest);
            idx = smallest;
        }
    }

    fn remove_at(&mut self, idx: usize) -> Event {
        let event = self.heap.swap_remove(idx);
        if idx < self.heap.len() {
            // The former last element may violate the order in either direction.
            self.sift_down(idx);
            self.sift_up(idx);
        }
        event
    }
}

impl Scheduler for HeapScheduler {
    fn descriptor(&self) -> String {
        format!("HeapScheduler {{ len: {} }}", self.heap.len())
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn insert(&mut self, event: Event) {
        self.heap.push(event);
        self.sift_up(self.heap.len() - 1);
    }

    fn peek_next(&self) -> &Event {
        match self.heap.first() {
            Some(event) => event,
            None => empty_queue(),
        }
    }

    fn remove_next(&mut self) -> Event {
        if self.heap.is_empty() {
            empty_queue()
        }
        self.remove_at(0)
    }

    fn remove(&mut self, key: &EventKey) -> Event {
        match self.heap.iter().position(|event| event.key() == key) {
            Some(idx) => self.remove_at(idx),
            None => missing_event(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NO_CONTEXT;
    use crate::time::SimTime;

    fn key(ts: u64, uid: u64) -> EventKey {
        EventKey::new(SimTime::from_ticks(ts), uid, NO_CONTEXT)
    }

    #[test]
    fn arbitrary_removal_keeps_heap_order() {
        let mut heap = HeapScheduler::new();
        for (ts, uid) in [(9, 1), (2, 2), (7, 3), (4, 4), (8, 5), (1, 6), (6, 7)] {
            heap.insert(Event::new(key(ts, uid), |_| {}));
        }

        assert_eq!(heap.remove(&key(4, 4)).key().uid, 4);
        assert_eq!(heap.remove(&key(9, 1)).key().uid, 1);

        let order = (0..heap.len())
            .map(|_| heap.remove_next().ts().ticks())
            .collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2, 6, 7, 8]);
    }

    #[test]
    #[should_panic = "empty scheduler"]
    fn peek_on_empty_is_fatal() {
        HeapScheduler::new().peek_next();
    }
}
