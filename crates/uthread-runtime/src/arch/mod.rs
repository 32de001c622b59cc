//! Architecture-specific context switching
//!
//! Provides assembly implementations for saving and restoring the
//! callee-saved registers during a uthread switch, and the trampoline a
//! fresh context first resumes into.

use uthread_core::constants::STACK_ALIGN;
use uthread_core::error::ContextError;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
    }
}

/// Rust function a fresh context calls through the trampoline.
///
/// Receives the argument given to `init_context` and must never return.
pub type EntryFn = extern "C" fn(usize) -> !;

/// Bytes the trampoline needs below the initial stack pointer
pub const MIN_INITIAL_FRAME: usize = 256;

/// Check that `stack_top` can carry an initial frame
#[inline]
pub fn check_stack(stack_top: *mut u8, stack_size: usize) -> Result<(), ContextError> {
    if stack_top.is_null() {
        return Err(ContextError::NullStack);
    }
    if stack_top as usize % STACK_ALIGN != 0 {
        return Err(ContextError::MisalignedStack);
    }
    if stack_size < MIN_INITIAL_FRAME {
        return Err(ContextError::StackTooSmall);
    }
    Ok(())
}
