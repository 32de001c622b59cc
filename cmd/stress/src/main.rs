//! Stress test - many short-lived uthreads
//!
//! Repeats create / drain / reap cycles and checks that every uthread
//! ran, that stacks are given back, and that the ring empties each round.
//!
//! Usage: `stress [uthreads_per_round] [rounds] [yields]`

use uthread::{kinfo, kwarn, Scheduler, SchedulerConfig};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

fn arg(n: usize, default: usize) -> usize {
    std::env::args()
        .nth(n)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn main() {
    println!("=== uthread Stress Test ===\n");
    uthread::init_logging();

    let per_round = arg(1, 10_000);
    let rounds = arg(2, 10);
    let yields = arg(3, 10);

    let config = SchedulerConfig::from_env()
        .stack_size(16 * 1024)
        .max_uthreads(per_round.max(1));

    let sched: Scheduler<usize> = match Scheduler::with_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bad configuration: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "{} rounds of {} uthreads, {} yields each\n",
        rounds, per_round, yields
    );

    let steps = Rc::new(Cell::new(0u64));
    let start = Instant::now();
    let mut failures = 0usize;

    for round in 0..rounds {
        let spawn_start = Instant::now();
        for i in 0..per_round {
            let steps = steps.clone();
            let created = sched.create(move |s| {
                for _ in 0..yields {
                    steps.set(steps.get() + 1);
                    s.yield_now();
                }
                i
            });
            if let Err(e) = created {
                kwarn!("round {}: create #{} failed: {}", round, i, e);
                failures += 1;
                break;
            }
        }
        let spawn_time = spawn_start.elapsed();

        let run_start = Instant::now();
        sched.run();
        let run_time = run_start.elapsed();

        let reaped = sched.reap_finished();
        let sum: usize = reaped.iter().filter_map(|(_, v)| *v).sum();
        let expected: usize = (0..per_round).sum();
        if reaped.len() != per_round || sum != expected || !sched.is_empty() {
            kwarn!(
                "round {}: reaped {} (sum {}, expected {})",
                round,
                reaped.len(),
                sum,
                expected
            );
            failures += 1;
        }

        kinfo!(
            "round {}: spawn {:?}, run {:?}",
            round,
            spawn_time,
            run_time
        );
        print!("\rRound {}/{}", round + 1, rounds);
    }

    let total = start.elapsed();
    let stats = sched.stats();

    println!("\n\n=== Results ===");
    println!("Created:         {}", stats.created);
    println!("Finished:        {}", stats.finished);
    println!("Reaped:          {}", stats.reaped);
    println!("Panicked:        {}", stats.panicked);
    println!("Switches:        {}", stats.switches);
    println!("Body steps:      {}", steps.get());
    println!("Total time:      {:?}", total);
    if stats.switches > 0 {
        println!(
            "Per switch:      {:.1} ns",
            total.as_nanos() as f64 / stats.switches as f64
        );
    }

    if failures > 0 {
        println!("\nFAILED: {} round(s) misbehaved", failures);
        std::process::exit(1);
    }
    println!("\n=== Stress Test Complete ===");
}
