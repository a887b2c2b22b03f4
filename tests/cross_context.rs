use des_kernel::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn submissions_from_many_threads() {
    let mut rt = Builder::new().quiet().build();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let workers: Vec<_> = (0..4u32)
        .map(|context| {
            let handle = rt.handle();
            let seen = seen.clone();
            thread::spawn(move || {
                for delay in 1..=100u64 {
                    let seen = seen.clone();
                    handle.schedule_with_context(context, SimTime::from_ticks(delay), move |k| {
                        seen.lock().unwrap().push((k.now().ticks(), k.context()));
                    });
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(rt.run(), RunOutcome::Drained);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 400);
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    for context in 0..4 {
        assert_eq!(seen.iter().filter(|(_, c)| *c == context).count(), 100);
    }
}

#[test]
fn submissions_while_running() {
    let mut rt = Builder::new().quiet().build();
    let handle = rt.handle();
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();
    rt.schedule(SimTime::from_ticks(10), move |_| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                let c = c.clone();
                thread::spawn(move || {
                    let c = c.clone();
                    handle.schedule_with_context(0, SimTime::ZERO, move |k| {
                        assert_eq!(k.now(), SimTime::from_ticks(10));
                        c.fetch_add(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    });

    rt.run();
    assert_eq!(count.load(Ordering::SeqCst), 8);
    assert_eq!(rt.num_events_dispatched(), 9);
}

#[test]
fn stop_before_the_run_is_honoured_once() {
    let mut rt = Builder::new().quiet().build();
    rt.schedule(SimTime::from_ticks(1), |_| {});
    rt.handle().stop();

    assert_eq!(rt.run(), RunOutcome::Stopped);
    assert_eq!(rt.num_events_dispatched(), 0);

    assert_eq!(rt.run(), RunOutcome::Drained);
    assert_eq!(rt.num_events_dispatched(), 1);
}

#[test]
fn handles_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SimulatorHandle>();
    assert_send_sync::<RealtimeHandle>();
}
