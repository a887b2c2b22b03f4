use des_kernel::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn ticks(t: u64) -> SimTime {
    SimTime::from_ticks(t)
}

#[test]
fn events_run_in_timestamp_order() {
    for kind in SchedulerKind::ALL {
        let mut rt = Builder::new().quiet().scheduler(kind).build();
        let log = Rc::new(RefCell::new(Vec::new()));

        for delay in [5, 3, 8] {
            let log = log.clone();
            rt.schedule(ticks(delay), move |k: &mut dyn Kernel| {
                log.borrow_mut().push(k.now().ticks())
            });
        }

        assert_eq!(rt.run(), RunOutcome::Drained);
        assert_eq!(*log.borrow(), vec![3, 5, 8], "{kind}");
        assert_eq!(rt.now(), ticks(8));
    }
}

#[test]
fn equal_timestamps_run_in_insertion_order() {
    for kind in SchedulerKind::ALL {
        let mut rt = Builder::new().quiet().scheduler(kind).build();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..50 {
            let log = log.clone();
            rt.schedule(ticks(7), move |_| log.borrow_mut().push(i));
        }
        rt.run();

        assert_eq!(*log.borrow(), (0..50).collect::<Vec<_>>(), "{kind}");
    }
}

#[test]
fn virtual_time_never_goes_backwards() {
    for kind in SchedulerKind::ALL {
        let mut rt = Builder::new().quiet().scheduler(kind).build();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let seen: Rc<RefCell<Vec<(u64, u64)>>> = Rc::default();

        for _ in 0..500 {
            let delay = rng.gen_range(0..10_000u64);
            let seen = seen.clone();
            let slot: Rc<Cell<u64>> = Rc::default();
            let s = slot.clone();
            let id = rt.schedule(ticks(delay), move |k| {
                assert_eq!(k.now().ticks(), delay);
                seen.borrow_mut().push((k.now().ticks(), s.get()));
            });
            slot.set(id.uid());
        }
        rt.run();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 500);
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{kind}");
    }
}

#[test]
fn events_can_reschedule_themselves() {
    fn tick(count: Rc<Cell<u32>>) -> impl FnOnce(&mut dyn Kernel) + 'static {
        move |k| {
            count.set(count.get() + 1);
            if count.get() < 100 {
                k.schedule(SimTime::from_ticks(10), tick(count));
            }
        }
    }

    let mut rt = Builder::new().quiet().build();
    let count = Rc::new(Cell::new(0));
    rt.schedule(SimTime::ZERO, tick(count.clone()));

    assert_eq!(rt.run(), RunOutcome::Drained);
    assert_eq!(count.get(), 100);
    assert_eq!(rt.now(), ticks(990));
    assert_eq!(rt.num_events_dispatched(), 100);
}

#[test]
fn cancelling_a_periodic_event_ends_the_run() {
    fn periodic(handle: Rc<RefCell<EventId>>) -> impl FnOnce(&mut dyn Kernel) + 'static {
        move |k| {
            let next = k.schedule(SimTime::from_ticks(1), periodic(handle.clone()));
            *handle.borrow_mut() = next;
        }
    }

    let mut rt = Builder::new().quiet().build();
    let handle: Rc<RefCell<EventId>> = Rc::default();
    let first = rt.schedule(SimTime::ZERO, periodic(handle.clone()));
    *handle.borrow_mut() = first;

    let h = handle.clone();
    rt.schedule(ticks(50), move |k| {
        let current = h.borrow().clone();
        k.cancel(&current);
    });

    assert_eq!(rt.run(), RunOutcome::Drained);
    // the cancelled event is still dequeued at its timestamp
    assert_eq!(rt.now(), ticks(50));
}
