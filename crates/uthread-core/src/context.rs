//! Saved execution context layouts
//!
//! These structures have fixed layouts (repr(C)) because the context switch
//! routines in `uthread-runtime::arch` address their fields by offset. Only
//! callee-saved state is kept: a switch is always a function call, so the
//! caller-saved registers are already dead at the switch point.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        /// Saved registers for a voluntary switch (System V AMD64 callee-saved set)
        ///
        /// Layout (offsets are stable for ASM access):
        /// ```text
        /// 0x00: rsp
        /// 0x08: rip   - resume address
        /// 0x10: rbx
        /// 0x18: rbp
        /// 0x20: r12   - entry function on first resume
        /// 0x28: r13   - entry argument on first resume
        /// 0x30: r14
        /// 0x38: r15
        /// ```
        #[repr(C)]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct ExecutionContext {
            pub rsp: u64,
            pub rip: u64,
            pub rbx: u64,
            pub rbp: u64,
            pub r12: u64,
            pub r13: u64,
            pub r14: u64,
            pub r15: u64,
        }

        /// Size of the saved context
        pub const CONTEXT_SIZE: usize = 64;

        impl ExecutionContext {
            /// Create an empty context
            pub const fn new() -> Self {
                Self {
                    rsp: 0, rip: 0, rbx: 0, rbp: 0,
                    r12: 0, r13: 0, r14: 0, r15: 0,
                }
            }

            /// Saved stack pointer
            #[inline]
            pub fn stack_pointer(&self) -> usize {
                self.rsp as usize
            }

            /// Saved resume address
            #[inline]
            pub fn resume_address(&self) -> usize {
                self.rip as usize
            }
        }
    } else if #[cfg(target_arch = "aarch64")] {
        /// Saved registers for a voluntary switch (AAPCS64 callee-saved set)
        ///
        /// Layout (offsets are stable for ASM access):
        /// ```text
        /// 0x00: sp
        /// 0x08: lr    - resume address (x30)
        /// 0x10: x19   - entry function on first resume
        /// 0x18: x20   - entry argument on first resume
        /// 0x20: x21 .. 0x58: x28
        /// 0x60: fp    (x29)
        /// 0x68: d8  .. 0xA0: d15
        /// ```
        #[repr(C)]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct ExecutionContext {
            pub sp: u64,
            pub lr: u64,
            pub x19: u64,
            pub x20: u64,
            pub x21: u64,
            pub x22: u64,
            pub x23: u64,
            pub x24: u64,
            pub x25: u64,
            pub x26: u64,
            pub x27: u64,
            pub x28: u64,
            pub fp: u64,
            pub d: [u64; 8],
        }

        /// Size of the saved context
        pub const CONTEXT_SIZE: usize = 168;

        impl ExecutionContext {
            /// Create an empty context
            pub const fn new() -> Self {
                Self {
                    sp: 0, lr: 0,
                    x19: 0, x20: 0, x21: 0, x22: 0, x23: 0,
                    x24: 0, x25: 0, x26: 0, x27: 0, x28: 0,
                    fp: 0,
                    d: [0; 8],
                }
            }

            /// Saved stack pointer
            #[inline]
            pub fn stack_pointer(&self) -> usize {
                self.sp as usize
            }

            /// Saved resume address
            #[inline]
            pub fn resume_address(&self) -> usize {
                self.lr as usize
            }
        }
    } else {
        compile_error!("Unsupported architecture");
    }
}

impl ExecutionContext {
    /// True once the context has been initialized or saved into
    #[inline]
    pub fn is_primed(&self) -> bool {
        self.stack_pointer() != 0 && self.resume_address() != 0
    }
}

// Verify sizes at compile time
const _: () = {
    assert!(core::mem::size_of::<ExecutionContext>() == CONTEXT_SIZE);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_not_primed() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.is_primed());
        assert_eq!(ctx.stack_pointer(), 0);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_context_offsets() {
        let ctx = ExecutionContext::new();
        let base = &ctx as *const _ as usize;

        // Offsets used by context_switch
        assert_eq!(&ctx.rsp as *const _ as usize - base, 0x00);
        assert_eq!(&ctx.rip as *const _ as usize - base, 0x08);
        assert_eq!(&ctx.r12 as *const _ as usize - base, 0x20);
        assert_eq!(&ctx.r15 as *const _ as usize - base, 0x38);
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_context_offsets() {
        let ctx = ExecutionContext::new();
        let base = &ctx as *const _ as usize;

        assert_eq!(&ctx.sp as *const _ as usize - base, 0x00);
        assert_eq!(&ctx.lr as *const _ as usize - base, 0x08);
        assert_eq!(&ctx.x19 as *const _ as usize - base, 0x10);
        assert_eq!(&ctx.fp as *const _ as usize - base, 0x60);
        assert_eq!(&ctx.d as *const _ as usize - base, 0x68);
    }
}
