//! Round-robin scheduling scenarios driven through the public API

use std::cell::RefCell;
use std::rc::Rc;

use uthread::{Scheduler, SchedulerConfig, SchedulerPhase, UthreadState};

fn scheduler<T: 'static>() -> Scheduler<T> {
    Scheduler::with_config(SchedulerConfig::new().stack_size(64 * 1024)).unwrap()
}

type Trace = Rc<RefCell<Vec<String>>>;

fn spawn_yielder(s: &Scheduler, trace: &Trace, name: &str, yields: usize) {
    let trace = trace.clone();
    let name = name.to_string();
    s.create(move |s| {
        for _ in 0..yields {
            trace.borrow_mut().push(name.clone());
            s.yield_now();
        }
    })
    .unwrap();
}

#[test]
fn abc_interleave_then_drain() {
    let s: Scheduler = scheduler();
    let trace: Trace = Rc::default();
    for name in ["A", "B", "C"] {
        spawn_yielder(&s, &trace, name, 2);
    }

    s.yield_now();

    assert_eq!(trace.borrow().join(","), "A,B,C,A,B,C");
    assert_eq!(s.phase(), SchedulerPhase::Drained);
    assert_eq!(s.current(), None);

    // Nothing left to run: no further switches
    let switches = s.stats().switches;
    s.yield_now();
    assert_eq!(s.stats().switches, switches);
}

#[test]
fn rotation_repeats_k_times_for_n_threads() {
    const N: usize = 7;
    const K: usize = 5;

    let s: Scheduler = scheduler();
    let trace: Trace = Rc::default();
    for i in 0..N {
        spawn_yielder(&s, &trace, &i.to_string(), K);
    }

    s.run();

    let expected: Vec<String> = (0..K)
        .flat_map(|_| (0..N).map(|i| i.to_string()))
        .collect();
    assert_eq!(*trace.borrow(), expected);
    assert_eq!(s.stats().finished, N as u64);
}

#[test]
fn uneven_yield_counts_skip_finished() {
    let s: Scheduler = scheduler();
    let trace: Trace = Rc::default();
    spawn_yielder(&s, &trace, "x", 1);
    spawn_yielder(&s, &trace, "y", 3);
    spawn_yielder(&s, &trace, "z", 2);

    s.yield_now();

    assert_eq!(trace.borrow().join(""), "xyzyzy");
}

#[test]
fn non_yielding_uthread_starves_others() {
    let s: Scheduler = scheduler();
    let trace: Trace = Rc::default();

    let t = trace.clone();
    s.create(move |_| {
        // Never yields: runs to completion before anyone else
        for i in 0..4 {
            t.borrow_mut().push(format!("greedy{}", i));
        }
    })
    .unwrap();
    spawn_yielder(&s, &trace, "polite", 2);

    s.yield_now();

    assert_eq!(
        trace.borrow().join(","),
        "greedy0,greedy1,greedy2,greedy3,polite,polite"
    );
}

#[test]
fn zero_uthreads_yield_and_exit_are_noops() {
    let s: Scheduler<i32> = scheduler();
    s.yield_now();
    s.exit(5);
    s.run();
    assert_eq!(s.phase(), SchedulerPhase::NotStarted);
    assert!(s.is_empty());
}

#[test]
fn uthreads_share_state_without_locks() {
    let s: Scheduler = scheduler();
    let counter = Rc::new(RefCell::new(0u64));

    for _ in 0..10 {
        let c = counter.clone();
        s.create(move |s| {
            for _ in 0..100 {
                *c.borrow_mut() += 1;
                s.yield_now();
            }
        })
        .unwrap();
    }

    s.run();
    assert_eq!(*counter.borrow(), 1000);
}

#[test]
fn spawn_chain_from_inside_uthreads() {
    fn spawn_next(s: &Scheduler<u32>, depth: u32) {
        if depth == 0 {
            return;
        }
        s.create(move |s| {
            spawn_next(s, depth - 1);
            s.yield_now();
            depth
        })
        .unwrap();
    }

    let s: Scheduler<u32> = scheduler();
    spawn_next(&s, 5);
    s.yield_now();

    let values: Vec<Option<u32>> = s.reap_finished().into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec![Some(5), Some(4), Some(3), Some(2), Some(1)]);
}

#[test]
fn deep_recursion_fits_configured_stack() {
    fn depth(n: u64) -> u64 {
        let pad = [n; 32];
        if n == 0 {
            0
        } else {
            std::hint::black_box(pad)[0] - n + 1 + depth(n - 1)
        }
    }

    let s: Scheduler<u64> =
        Scheduler::with_config(SchedulerConfig::new().stack_size(1024 * 1024)).unwrap();
    let id = s.create(|s| {
        let d = depth(1000);
        s.yield_now();
        d
    })
    .unwrap();

    s.run();
    assert_eq!(s.state(id), Some(UthreadState::Finished));
    assert_eq!(s.return_value(id), Some(1000));
}
