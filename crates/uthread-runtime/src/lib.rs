//! # uthread-runtime
//!
//! Platform-specific runtime for the uthread cooperative scheduler.
//!
//! This crate provides:
//! - Stack management (mmap with guard pages)
//! - Context switching (architecture-specific assembly)
//! - The circular ready ring uthreads are scheduled from
//! - The single-threaded cooperative `Scheduler`

pub mod config;
pub mod memory;
pub mod arch;
pub mod ring;
pub mod tcb;
pub mod scheduler;

// Re-exports
pub use config::{ConfigError, SchedulerConfig};
pub use memory::{page_size, Stack};
pub use ring::{ReadyRing, RingMember};
pub use scheduler::{Scheduler, SchedulerStats};
pub use tcb::Routine;

// Architecture detection
cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use arch::x86_64 as current_arch;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use arch::aarch64 as current_arch;
    } else {
        compile_error!("Unsupported architecture");
    }
}
