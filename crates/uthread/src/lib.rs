//! # uthread - Cooperative user-level threads
//!
//! Many logical threads of control multiplexed onto one host thread.
//! A uthread runs until it calls `yield_now` or `exit`; nothing preempts
//! it. Scheduling is strict round-robin in creation order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use uthread::Scheduler;
//!
//! fn main() {
//!     let sched: Scheduler = Scheduler::new();
//!
//!     for name in ["A", "B", "C"] {
//!         sched.create(move |s| {
//!             for _ in 0..2 {
//!                 println!("{}", name);
//!                 s.yield_now();
//!             }
//!         }).unwrap();
//!     }
//!
//!     // Runs A,B,C,A,B,C then comes back here
//!     sched.yield_now();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │            create(), yield_now(), exit(), reap()            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Scheduler                              │
//! │     NotStarted → Running → Drained, caller context saved    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │   Ready   │      │  Context  │      │   Stack   │
//!    │   Ring    │      │  Switch   │      │   mmap    │
//!    └───────────┘      └───────────┘      └───────────┘
//! ```
//!
//! ## Lifecycle
//!
//! A uthread's stack is released as soon as it finishes. Its return value
//! stays in the ring until `reap` consumes it, or until the scheduler is
//! dropped.

// Re-export core types
pub use uthread_core::{
    UthreadId,
    UthreadState,
    SchedulerPhase,
    CreateError,
    CreateResult,
    MemoryError,
    ContextError,
    ReapError,
};

// Re-export kprint macros for debug logging
pub use uthread_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use uthread_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use uthread_core::{env_get, env_get_bool, env_get_opt, env_get_size, env_get_str, env_is_set};

// Re-export runtime types
pub use uthread_runtime::{
    ConfigError,
    SchedulerConfig,
    Scheduler,
    SchedulerStats,
};

/// Run a batch of uthreads on a fresh scheduler and collect their results.
///
/// `setup` creates the initial uthreads (they may create more). Every
/// uthread runs to completion, then all results are reaped in ring order.
///
/// # Example
///
/// ```ignore
/// let results = uthread::block_on(|s| {
///     s.create(|_| 1).unwrap();
///     s.create(|_| 2).unwrap();
/// });
/// assert_eq!(results, vec![Some(1), Some(2)]);
/// ```
pub fn block_on<T, F>(setup: F) -> Vec<Option<T>>
where
    T: 'static,
    F: FnOnce(&Scheduler<T>),
{
    let sched = Scheduler::new();
    setup(&sched);
    sched.run();
    sched
        .reap_finished()
        .into_iter()
        .map(|(_, value)| value)
        .collect()
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Scheduler, SchedulerConfig, UthreadId, UthreadState};
    pub use crate::{block_on, CreateError};
}
