//! aarch64 context switching implementation
//!
//! Saves the AAPCS64 callee-saved set: x19-x28, fp, lr, sp and the low
//! halves of v8-v15.

use super::{check_stack, EntryFn};
use std::arch::naked_asm;
use uthread_core::context::ExecutionContext;
use uthread_core::error::ContextError;

/// Initialize a fresh uthread context
///
/// The first switch into `ctx` "returns" through lr into the trampoline,
/// which calls `entry(arg)` on the given stack.
pub fn init_context(
    ctx: &mut ExecutionContext,
    stack_top: *mut u8,
    stack_size: usize,
    entry: EntryFn,
    arg: usize,
) -> Result<(), ContextError> {
    check_stack(stack_top, stack_size)?;

    *ctx = ExecutionContext::new();
    ctx.sp = stack_top as u64;
    ctx.lr = uthread_entry_trampoline as usize as u64;
    ctx.x19 = entry as usize as u64;
    ctx.x20 = arg as u64;
    ctx.fp = 0;

    Ok(())
}

/// Trampoline that calls the entry function with its argument
#[unsafe(naked)]
pub unsafe extern "C" fn uthread_entry_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "blr x19",
        // entry is `-> !`
        "brk #0x1",
    );
}

/// Perform a voluntary context switch
///
/// Saves callee-saved registers to `old` and loads from `new`.
///
/// # Safety
///
/// Same contract as the x86_64 version: `old` writable, `new` primed, its
/// stack still mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(
    _old: *mut ExecutionContext,
    _new: *const ExecutionContext,
) {
    naked_asm!(
        // Save to old (x0)
        "mov x9, sp",
        "str x9, [x0, #0x00]",
        "str x30, [x0, #0x08]",
        "stp x19, x20, [x0, #0x10]",
        "stp x21, x22, [x0, #0x20]",
        "stp x23, x24, [x0, #0x30]",
        "stp x25, x26, [x0, #0x40]",
        "stp x27, x28, [x0, #0x50]",
        "str x29, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        // Load from new (x1)
        "ldr x9, [x1, #0x00]",
        "mov sp, x9",
        "ldr x30, [x1, #0x08]",
        "ldp x19, x20, [x1, #0x10]",
        "ldp x21, x22, [x1, #0x20]",
        "ldp x23, x24, [x1, #0x30]",
        "ldp x25, x26, [x1, #0x40]",
        "ldp x27, x28, [x1, #0x50]",
        "ldr x29, [x1, #0x60]",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        // Resume at the saved lr
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

        assert_eq!(ctx.sp, top as u64);
        assert_eq!(ctx.lr, uthread_entry_trampoline as usize as u64);
        assert_eq!(ctx.x19, never as usize as u64);
        assert_eq!(ctx.x20, 0xfeed);
    }
}
