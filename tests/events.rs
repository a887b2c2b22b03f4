use des_kernel::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(&'static str, SimTime)>>>;

fn record(log: &Log, name: &'static str) -> impl FnOnce(&mut dyn Kernel) + 'static {
    let log = log.clone();
    move |k| log.borrow_mut().push((name, k.now()))
}

fn run_basic_events(kind: SchedulerKind) {
    let mut rt = Builder::new().quiet().scheduler(kind).build();
    let log: Log = Rc::default();
    let c_handle: Rc<RefCell<EventId>> = Rc::default();

    let a = rt.schedule(SimTime::from_micros(10), record(&log, "a"));
    let b = {
        let log = log.clone();
        let c_handle = c_handle.clone();
        rt.schedule(SimTime::from_micros(11), move |k| {
            log.borrow_mut().push(("b", k.now()));

            let c = c_handle.borrow().clone();
            assert!(!k.is_expired(&c));
            k.remove(&c);
            assert!(k.is_expired(&c));

            k.schedule(SimTime::from_micros(10), record(&log, "d"));
        })
    };
    let c = rt.schedule(SimTime::from_micros(12), record(&log, "c"));
    *c_handle.borrow_mut() = c.clone();

    assert!(!rt.is_expired(&a));
    rt.cancel(&a);
    assert!(rt.is_expired(&a));
    assert_eq!(rt.delay_left(&b), SimTime::from_micros(11));

    assert_eq!(rt.run(), RunOutcome::Drained);
    assert_eq!(
        *log.borrow(),
        vec![("b", SimTime::from_micros(11)), ("d", SimTime::from_micros(21))],
        "{kind}"
    );
    assert!(rt.is_expired(&b));
    assert!(rt.is_expired(&c));

    // scheduled and removed before it could run
    let now = rt.schedule_now(record(&log, "now"));
    rt.remove(&now);
    assert!(rt.is_expired(&now));
    rt.run();
    assert_eq!(log.borrow().len(), 2);

    let cancelled = rt.schedule_destroy(record(&log, "cancelled"));
    let removed = rt.schedule_destroy(record(&log, "removed"));
    rt.schedule_destroy(record(&log, "destroyed"));
    rt.cancel(&cancelled);
    rt.remove(&removed);
    assert!(rt.is_expired(&cancelled));
    assert!(rt.is_expired(&removed));

    rt.destroy();
    let log = log.borrow();
    assert_eq!(log.len(), 3);
    assert_eq!(log[2], ("destroyed", SimTime::from_micros(21)));
}

#[test]
fn basic_events_calendar() {
    run_basic_events(SchedulerKind::Calendar);
}

#[test]
fn basic_events_heap() {
    run_basic_events(SchedulerKind::Heap);
}

#[test]
fn basic_events_map() {
    run_basic_events(SchedulerKind::Map);
}

#[test]
fn basic_events_list() {
    run_basic_events(SchedulerKind::List);
}

#[test]
fn handles_outlive_their_kernel() {
    let id = {
        let mut rt = Builder::new().quiet().build();
        rt.schedule(SimTime::from_ticks(5), |_| {})
    };
    assert_eq!(id.ts(), SimTime::from_ticks(5));
    assert_eq!(id.uid(), EventId::FIRST_UID);
    assert!(!id.is_destroy());
}

#[test]
fn handles_compare_by_identity() {
    let mut rt = Builder::new().quiet().build();
    let a = rt.schedule(SimTime::from_ticks(1), |_| {});
    let b = rt.schedule(SimTime::from_ticks(1), |_| {});

    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert!(a.key() < b.key());
    assert_ne!(a, EventId::default());
}
