use std::collections::VecDeque;

use super::{empty_queue, missing_event, Scheduler};
use crate::runtime::{Event, EventKey};

const MIN_BUCKETS: usize = 2;
const MAX_BUCKETS: usize = 32 * 1024 * 1024;
const MAX_SAMPLES: usize = 25;

// Keeps `bucket_top + n * width` below `u64::MAX` for every valid timestamp.
const MAX_WIDTH: u64 = 1 << 32;

///
/// A calendar queue.
///
/// Events are hashed into `n` buckets of `width` ticks each, so that a
/// bucket covers the timestamps `[k * width, (k + 1) * width)` for every
/// `k` congruent to its index modulo `n`. Dequeueing scans the buckets
/// like the days of a year, starting at the current day. The bucket count
/// doubles and halves with the number of events and the width adapts to
/// the spacing of the earliest events, keeping about one event per bucket.
///
pub struct CalendarScheduler {
    buckets: Vec<VecDeque<Event>>,
    width: u64,
    len: usize,

    last_bucket: usize,
    bucket_top: u64,
    last_prio: u64,
}

impl CalendarScheduler {
    ///
    /// Creates an empty calendar with two buckets of width one.
    ///
    pub fn new() -> CalendarScheduler {
        let mut calendar = CalendarScheduler {
            buckets: Vec::new(),
            width: 1,
            len: 0,
            last_bucket: 0,
            bucket_top: 0,
            last_prio: 0,
        };
        calendar.init(MIN_BUCKETS, 1, 0);
        calendar
    }

    ///
    /// The number of buckets currently in use.
    ///
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    ///
    /// The time span covered by a single bucket, in ticks.
    ///
    pub fn bucket_width(&self) -> u64 {
        self.width
    }

    fn init(&mut self, num_buckets: usize, width: u64, start_prio: u64) {
        self.buckets = (0..num_buckets).map(|_| VecDeque::new()).collect();
        self.width = width;
        self.last_prio = start_prio;
        self.last_bucket = self.hash(start_prio);
        self.bucket_top = top_of(start_prio, width);
    }

    fn hash(&self, ts: u64) -> usize {
        ((ts / self.width) % self.buckets.len() as u64) as usize
    }

    fn do_insert(&mut self, event: Event) {
        let ts = event.ts().ticks();

        // An event before the current day moves the scan position back,
        // so the next scan starts at the new minimum.
        if ts < self.bucket_top.saturating_sub(self.width) {
            self.last_prio = ts;
            self.last_bucket = self.hash(ts);
            self.bucket_top = top_of(ts, self.width);
        }

        let bucket = self.hash(ts);
        self.buckets[bucket].push_back(event);
    }

    ///
    /// Locates the earliest event as `(bucket, index, bucket_top)`.
    ///
    fn find_next(&self) -> Option<(usize, usize, u64)> {
        let n = self.buckets.len();
        let mut bucket = self.last_bucket;
        let mut top = self.bucket_top;
        let mut best: Option<(usize, usize)> = None;

        loop {
            if let Some(idx) = min_index(&self.buckets[bucket]) {
                let key = self.buckets[bucket][idx].key();
                if key.ts.ticks() < top {
                    return Some((bucket, idx, top));
                }
                let better = match best {
                    Some((b, i)) => key < self.buckets[b][i].key(),
                    None => true,
                };
                if better {
                    best = Some((bucket, idx));
                }
            }

            bucket = (bucket + 1) % n;
            top = top.saturating_add(self.width);
            if bucket == self.last_bucket {
                break;
            }
        }

        // Nothing within one year, jump straight to the minimum.
        best.map(|(bucket, idx)| {
            let ts = self.buckets[bucket][idx].ts().ticks();
            (bucket, idx, top_of(ts, self.width))
        })
    }

    fn do_remove_next(&mut self) -> Event {
        let Some((bucket, idx, top)) = self.find_next() else {
            empty_queue()
        };
        let event = match self.buckets[bucket].remove(idx) {
            Some(event) => event,
            None => empty_queue(),
        };

        self.last_bucket = bucket;
        self.bucket_top = top;
        self.last_prio = event.ts().ticks();
        event
    }

    fn resize_up(&mut self) {
        let n = self.buckets.len();
        if self.len > n * 2 && n < MAX_BUCKETS {
            self.resize(n * 2);
        }
    }

    fn resize_down(&mut self) {
        let n = self.buckets.len();
        if self.len < n / 2 && n > MIN_BUCKETS {
            self.resize(n / 2);
        }
    }

    fn resize(&mut self, num_buckets: usize) {
        let width = self.calculate_new_width();
        log::debug!(
            "calendar resize: {} -> {} buckets, width {} -> {} ({} events)",
            self.buckets.len(),
            num_buckets,
            self.width,
            width,
            self.len
        );

        let old = std::mem::take(&mut self.buckets);
        self.init(num_buckets, width, self.last_prio);
        for event in old.into_iter().flatten() {
            self.do_insert(event);
        }
    }

    ///
    /// Estimates a bucket width from the spacing of the earliest events.
    ///
    /// The samples are dequeued and reinserted, restoring the scan
    /// position afterwards.
    ///
    fn calculate_new_width(&mut self) -> u64 {
        if self.len < 2 {
            return 1;
        }
        let num_samples = if self.len <= 5 {
            self.len
        } else {
            (5 + self.len / 10).min(MAX_SAMPLES)
        };

        let last_bucket = self.last_bucket;
        let bucket_top = self.bucket_top;
        let last_prio = self.last_prio;

        let samples = (0..num_samples)
            .map(|_| self.do_remove_next())
            .collect::<Vec<_>>();
        let stamps = samples
            .iter()
            .map(|event| event.ts().ticks())
            .collect::<Vec<_>>();
        for event in samples {
            self.do_insert(event);
        }

        self.last_bucket = last_bucket;
        self.bucket_top = bucket_top;
        self.last_prio = last_prio;

        let gaps = stamps.windows(2).map(|w| w[1] - w[0]);
        let twice_avg = gaps.clone().sum::<u64>() / (num_samples as u64 - 1) * 2;

        let (sum, count) = gaps
            .filter(|&gap| gap <= twice_avg)
            .fold((0u64, 0u64), |(sum, count), gap| (sum + gap, count + 1));
        if count == 0 {
            return 1;
        }
        (sum / count).saturating_mul(3).clamp(1, MAX_WIDTH)
    }
}

impl Default for CalendarScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for CalendarScheduler {
    fn descriptor(&self) -> String {
        format!(
            "CalendarScheduler {{ buckets: {}, width: {} }}",
            self.buckets.len(),
            self.width
        )
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, event: Event) {
        self.do_insert(event);
        self.len += 1;
        self.resize_up();
    }

    fn peek_next(&self) -> &Event {
        match self.find_next() {
            Some((bucket, idx, _)) => &self.buckets[bucket][idx],
            None => empty_queue(),
        }
    }

    fn remove_next(&mut self) -> Event {
        let event = self.do_remove_next();
        self.len -= 1;
        self.resize_down();
        event
    }

    fn remove(&mut self, key: &EventKey) -> Event {
        let bucket = self.hash(key.ts.ticks());
        let Some(idx) = self.buckets[bucket]
            .iter()
            .position(|event| event.key().uid == key.uid)
        else {
            missing_event(key)
        };
        let Some(event) = self.buckets[bucket].remove(idx) else {
            missing_event(key)
        };

        self.len -= 1;
        self.resize_down();
        event
    }
}

fn top_of(ts: u64, width: u64) -> u64 {
    (ts / width).saturating_add(1).saturating_mul(width)
}

fn min_index(bucket: &VecDeque<Event>) -> Option<usize> {
    bucket
        .iter()
        .enumerate()
        .min_by_key(|(_, event)| *event.key())
        .map(|(idx, _)| idx)
}
