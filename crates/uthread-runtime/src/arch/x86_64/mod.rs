//! x86_64 context switching implementation
//!
//! Naked functions (`#[unsafe(naked)]` + `naked_asm!`), stable since Rust 1.88.

use super::{check_stack, EntryFn};
use std::arch::naked_asm;
use uthread_core::context::ExecutionContext;
use uthread_core::error::ContextError;

/// Initialize a fresh uthread context
///
/// Sets up the registers so that the first switch into `ctx` lands in the
/// trampoline, which calls `entry(arg)` on the given stack.
pub fn init_context(
    ctx: &mut ExecutionContext,
    stack_top: *mut u8,
    stack_size: usize,
    entry: EntryFn,
    arg: usize,
) -> Result<(), ContextError> {
    check_stack(stack_top, stack_size)?;

    // The trampoline is entered by `jmp`, not `call`, so rsp stays 16-byte
    // aligned and its own `call` produces the ABI entry alignment.
    *ctx = ExecutionContext::new();
    ctx.rsp = stack_top as u64;
    ctx.rip = uthread_entry_trampoline as usize as u64;
    ctx.rbp = 0;
    ctx.r12 = entry as usize as u64;
    ctx.r13 = arg as u64;

    Ok(())
}

/// Trampoline that calls the entry function with its argument
#[unsafe(naked)]
pub unsafe extern "C" fn uthread_entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        // entry is `-> !`
        "ud2",
    );
}

/// Perform a voluntary context switch
///
/// Saves callee-saved registers to `old` and loads from `new`. Returns when
/// some later switch loads `old` again.
///
/// # Safety
///
/// `old` must be writable, `new` must hold a context produced by
/// `init_context` or saved by this function, and the stack it refers to
/// must still be mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(
    _old: *mut ExecutionContext,
    _new: *const ExecutionContext,
) {
    naked_asm!(
        // Save callee-saved registers to old (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        // Load callee-saved registers from new (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        // Jump to new RIP
        "jmp rax",
        // Resume point for a saved context: rsp points at our return address
        "2:",
        "ret",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never(_: usize) -> ! {
        loop {
            std::hint::spin_loop();
        }
    }

    #[test]
    fn test_init_context_registers() {
        let mut ctx = ExecutionContext::new();
        let top = 0x7000_0000_1000usize as *mut u8;
        init_context(&mut ctx, top, 64 * 1024, never, 0xfeed).unwrap();

        assert_eq!(ctx.rsp, top as u64);
        assert_eq!(ctx.rip, uthread_entry_trampoline as usize as u64);
        assert_eq!(ctx.r12, never as usize as u64);
        assert_eq!(ctx.r13, 0xfeed);
        assert!(ctx.is_primed());
    }

    #[test]
    fn test_init_context_rejects_misaligned() {
        let mut ctx = ExecutionContext::new();
        let top = 0x7000_0000_1004usize as *mut u8;
        assert_eq!(
            init_context(&mut ctx, top, 64 * 1024, never, 0),
            Err(ContextError::MisalignedStack)
        );
        assert!(!ctx.is_primed());
    }
}
