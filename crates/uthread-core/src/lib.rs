//! # uthread-core
//!
//! Core types for the uthread cooperative scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Stacks, context switching and the scheduler itself live in
//! `uthread-runtime`.
//!
//! ## Modules
//!
//! - `id` - Uthread identifier type
//! - `state` - Uthread lifecycle state and scheduler phase
//! - `context` - Saved-register layouts (repr(C), read by assembly)
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod context;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::UthreadId;
pub use state::{UthreadState, SchedulerPhase};
pub use context::ExecutionContext;
pub use error::{CreateError, CreateResult, MemoryError, ContextError, ReapError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_size, env_get_str, env_is_set};

/// Constants for stack layout
pub mod constants {
    /// Smallest stack a uthread may be given (16 KB)
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Largest stack a uthread may be given (1 GB of address space)
    pub const MAX_STACK_SIZE: usize = 1024 * 1024 * 1024;

    /// Fallback page size when the OS cannot be asked
    pub const DEFAULT_PAGE_SIZE: usize = 4096;

    /// Required alignment of the initial stack pointer
    pub const STACK_ALIGN: usize = 16;

    /// No uthread sentinel value (slot index)
    pub const UTHREAD_NONE: u32 = u32::MAX;
}
