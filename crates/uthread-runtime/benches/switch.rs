use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Instant;
use uthread_runtime::{Scheduler, SchedulerConfig};

fn scheduler() -> Scheduler {
    Scheduler::with_config(SchedulerConfig::new().stack_size(64 * 1024)).unwrap()
}

/*
    two uthreads handing the host thread back and forth;
    each iteration is one yield (one context switch)
*/
fn bench_yield_ping_pong(c: &mut Criterion) {
    c.bench_function("yield_ping_pong", |b| {
        b.iter_custom(|iters| {
            let s = scheduler();
            let half = iters / 2 + 1;
            for _ in 0..2 {
                s.create(move |s| {
                    for _ in 0..half {
                        s.yield_now();
                    }
                })
                .unwrap();
            }

            let start = Instant::now();
            s.run();
            start.elapsed()
        })
    });
}

/*
    full lifecycle of one uthread: mmap stack, run, finish, reap
*/
fn bench_create_run_reap(c: &mut Criterion) {
    let s: Scheduler<u64> = Scheduler::with_config(SchedulerConfig::new().stack_size(64 * 1024)).unwrap();
    c.bench_function("create_run_reap", |b| {
        b.iter(|| {
            let id = s.create(|_| black_box(42)).unwrap();
            s.run();
            black_box(s.reap(id).unwrap())
        })
    });
}

criterion_group!(benches, bench_yield_ping_pong, bench_create_run_reap);
criterion_main!(benches);
