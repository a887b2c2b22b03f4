use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::runtime::{EventId, NO_CONTEXT};
use crate::time::SimTime;

fn event(ts: u64, uid: u64) -> Event {
    Event::new(EventKey::new(SimTime::from_ticks(ts), uid, NO_CONTEXT), |_| {})
}

/// Replays a random operation mix on `scheduler` and on a sorted reference set.
fn check_against_reference(kind: SchedulerKind, seed: u64, ops: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scheduler = kind.create();
    let mut reference = BTreeSet::new();

    let mut now = 0u64;
    let mut uid = EventId::FIRST_UID;

    for _ in 0..ops {
        match rng.gen_range(0..10) {
            0..=4 => {
                let ts = now + rng.gen_range(0..1_000);
                scheduler.insert(event(ts, uid));
                reference.insert((ts, uid));
                uid += 1;
            }
            5..=7 if !reference.is_empty() => {
                let (ts, uid) = reference.pop_first().unwrap();
                let next = scheduler.remove_next();
                assert_eq!((next.ts().ticks(), next.key().uid), (ts, uid), "{kind}");
                now = ts;
            }
            8 if !reference.is_empty() => {
                let skip = rng.gen_range(0..reference.len());
                let &(ts, uid) = reference.iter().nth(skip).unwrap();
                reference.remove(&(ts, uid));
                let removed =
                    scheduler.remove(&EventKey::new(SimTime::from_ticks(ts), uid, NO_CONTEXT));
                assert_eq!(removed.key().uid, uid, "{kind}");
            }
            _ => {
                if let Some(&(ts, uid)) = reference.first() {
                    let next = scheduler.peek_next();
                    assert_eq!((next.ts().ticks(), next.key().uid), (ts, uid), "{kind}");
                }
            }
        }
        assert_eq!(scheduler.len(), reference.len(), "{kind}");
    }

    while let Some((ts, uid)) = reference.pop_first() {
        let next = scheduler.remove_next();
        assert_eq!((next.ts().ticks(), next.key().uid), (ts, uid), "{kind}");
    }
    assert!(scheduler.is_empty());
}

#[test]
fn all_backends_match_reference() {
    for kind in SchedulerKind::ALL {
        for seed in 0..4 {
            check_against_reference(kind, seed, 5_000);
        }
    }
}

#[test]
fn calendar_survives_resize_up_and_down() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut calendar = CalendarScheduler::new();
    let mut reference = BTreeSet::new();

    // Dense phase, enough to force several up-resizes.
    for uid in 0..4_096u64 {
        let ts = rng.gen_range(0..100_000);
        calendar.insert(event(ts, uid));
        reference.insert((ts, uid));
    }
    let grown = calendar.num_buckets();
    assert!(grown >= 1_024);

    // Drain most of it, forcing down-resizes.
    for _ in 0..4_000 {
        let (ts, uid) = reference.pop_first().unwrap();
        let next = calendar.remove_next();
        assert_eq!((next.ts().ticks(), next.key().uid), (ts, uid));
    }
    assert!(calendar.num_buckets() < grown);

    // Sparse phase with a very different spacing.
    for uid in 10_000..10_500u64 {
        let ts = 100_000 + rng.gen_range(0..50_000_000);
        calendar.insert(event(ts, uid));
        reference.insert((ts, uid));
    }
    while let Some((ts, uid)) = reference.pop_first() {
        let next = calendar.remove_next();
        assert_eq!((next.ts().ticks(), next.key().uid), (ts, uid));
    }
    assert!(calendar.is_empty());
    assert_eq!(calendar.num_buckets(), 2);
}

#[test]
fn kind_parsing() {
    assert_eq!("Calendar".parse::<SchedulerKind>(), Ok(SchedulerKind::Calendar));
    assert_eq!("heap".parse::<SchedulerKind>(), Ok(SchedulerKind::Heap));
    assert_eq!(" map ".parse::<SchedulerKind>(), Ok(SchedulerKind::Map));
    assert_eq!("LIST".parse::<SchedulerKind>(), Ok(SchedulerKind::List));
    assert!("splay".parse::<SchedulerKind>().is_err());

    for kind in SchedulerKind::ALL {
        assert_eq!(kind.to_string().parse::<SchedulerKind>(), Ok(kind));
    }
}

#[test]
fn descriptors_name_the_backend() {
    assert!(SchedulerKind::Calendar
        .create()
        .descriptor()
        .starts_with("CalendarScheduler"));
    assert!(SchedulerKind::Heap.create().descriptor().starts_with("HeapScheduler"));
    assert!(SchedulerKind::Map.create().descriptor().starts_with("MapScheduler"));
    assert!(SchedulerKind::List.create().descriptor().starts_with("ListScheduler"));
}
