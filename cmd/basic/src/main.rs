//! Basic uthread example
//!
//! Three uthreads A, B and C print their name and yield twice; the
//! output interleaves as A,B,C,A,B,C before control drains back here.
//!
//! # Environment Variables
//!
//! - `UTHREAD_FLUSH_EPRINT=1` - Flush debug output immediately (useful for crash debugging)
//! - `UTHREAD_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `UTHREAD_DEBUG=1` - Log every create and drain

use uthread::{kdebug, kinfo, Scheduler, SchedulerConfig};
// UTHREAD_LOG_LEVEL=debug UTHREAD_DEBUG=1 cargo run -p uthread-basic
fn main() {
    println!("=== uthread Basic Example ===\n");

    // Initialize logging (reads UTHREAD_FLUSH_EPRINT and UTHREAD_LOG_LEVEL env vars)
    // Or set programmatically:
    // uthread::set_log_level(uthread::LogLevel::Debug);
    uthread::init_logging();

    let config = SchedulerConfig::from_env().stack_size(64 * 1024);
    if config.debug_logging {
        config.print();
    }

    let sched: Scheduler<&'static str> = match Scheduler::with_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bad configuration: {}", e);
            std::process::exit(1);
        }
    };

    kinfo!("Creating uthreads...");
    for name in ["A", "B", "C"] {
        let id = sched
            .create(move |s| {
                for round in 0..2 {
                    println!("{}", name);
                    kdebug!("[{}] round {}", name, round);
                    s.yield_now();
                }
                s.exit(name);
                name
            })
            .unwrap_or_else(|e| panic!("create {}: {}", name, e));
        println!("Created uthread {} (ID={})", name, id);
    }

    println!();
    sched.yield_now();
    println!("\nDrained back to main ({})", sched.phase());

    // A second yield finds nothing runnable
    sched.yield_now();

    for (id, value) in sched.reap_finished() {
        println!("uthread {} exited with {:?}", id, value);
    }

    let stats = sched.stats();
    kinfo!(
        "{} created, {} finished, {} switches",
        stats.created,
        stats.finished,
        stats.switches
    );

    println!("\n=== Example Complete ===");
}
