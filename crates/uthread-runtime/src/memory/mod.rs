//! Stack regions for uthreads
//!
//! Each uthread owns exactly one `Stack` for as long as it can run. The
//! platform module maps and unmaps the memory; this module holds the
//! layout arithmetic.
//!
//! ```text
//! base                guard_end                                  top
//!  │   guard page(s)   │            usable stack (grows down) ◀──│
//!  └─── PROT_NONE ─────┴──────────── PROT_READ|WRITE ───────────┘
//! ```

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::page_size;
    } else {
        compile_error!("Unsupported platform");
    }
}

use core::ptr::NonNull;
use uthread_core::error::MemoryError;

/// A fixed-size stack owned by a single uthread
///
/// Dropping the stack releases the mapping.
pub struct Stack {
    /// Start of the mapping (guard pages first)
    base: NonNull<u8>,
    /// Whole mapping, guard included
    mapped_len: usize,
    /// Bytes reserved for the guard at the low end
    guard_len: usize,
}

impl Stack {
    /// Reserve a stack with at least `size` usable bytes.
    ///
    /// `size` is rounded up to whole pages; `guard_pages` inaccessible pages
    /// are placed below it. On failure nothing stays mapped.
    pub fn allocate(size: usize, guard_pages: usize) -> Result<Self, MemoryError> {
        let page = page_size();
        let usable = round_to_pages(size, page).ok_or(MemoryError::InvalidSize)?;
        let guard_len = guard_pages
            .checked_mul(page)
            .ok_or(MemoryError::InvalidSize)?;
        let mapped_len = usable
            .checked_add(guard_len)
            .ok_or(MemoryError::InvalidSize)?;

        let base = unix::map_stack(mapped_len, guard_len)?;

        #[cfg(test)]
        LIVE_STACKS.with(|n| n.set(n.get() + 1));
        Ok(Self { base, mapped_len, guard_len })
    }

    /// Highest address of the stack (initial stack pointer, exclusive)
    #[inline]
    pub fn top(&self) -> *mut u8 {
        // Within the mapping: mapped_len bytes from base
        unsafe { self.base.as_ptr().add(self.mapped_len) }
    }

    /// Lowest usable address (just above the guard)
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.guard_len) }
    }

    /// Usable bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.mapped_len - self.guard_len
    }

    /// Guard bytes below the usable region
    #[inline]
    pub fn guard_size(&self) -> usize {
        self.guard_len
    }

    /// Check whether an address falls in the usable region
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.bottom() as usize && addr < self.top() as usize
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unix::unmap_stack(self.base, self.mapped_len);
        #[cfg(test)]
        LIVE_STACKS.with(|n| n.set(n.get() - 1));
    }
}

#[cfg(test)]
thread_local! {
    static LIVE_STACKS: core::cell::Cell<usize> = const { core::cell::Cell::new(0) };
}

/// Stacks mapped and not yet released by this host thread
#[cfg(test)]
pub(crate) fn live_stacks() -> usize {
    LIVE_STACKS.with(|n| n.get())
}

impl core::fmt::Debug for Stack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("guard", &self.guard_len)
            .finish()
    }
}

/// Round `size` up to a multiple of `page`; zero is rejected
#[inline]
pub fn round_to_pages(size: usize, page: usize) -> Option<usize> {
    if size == 0 || page == 0 {
        return None;
    }
    size.checked_add(page - 1).map(|s| s / page * page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_pages() {
        assert_eq!(round_to_pages(1, 4096), Some(4096));
        assert_eq!(round_to_pages(4096, 4096), Some(4096));
        assert_eq!(round_to_pages(4097, 4096), Some(8192));
        assert_eq!(round_to_pages(0, 4096), None);
        assert_eq!(round_to_pages(usize::MAX, 4096), None);
    }

    #[test]
    fn test_allocate_layout() {
        let page = page_size();
        let stack = Stack::allocate(64 * 1024, 1).expect("stack");

        assert_eq!(stack.size(), round_to_pages(64 * 1024, page).unwrap());
        assert_eq!(stack.guard_size(), page);
        assert_eq!(stack.top() as usize % page, 0);
        assert!(stack.contains(stack.top() as usize - 1));
        assert!(!stack.contains(stack.top() as usize));
        assert!(!stack.contains(stack.bottom() as usize - 1));
    }

    #[test]
    fn test_stack_is_writable() {
        let stack = Stack::allocate(16 * 1024, 1).expect("stack");
        unsafe {
            let last = stack.top().sub(1);
            last.write(0xAB);
            assert_eq!(last.read(), 0xAB);
            stack.bottom().write(0xCD);
            assert_eq!(stack.bottom().read(), 0xCD);
        }
    }

    #[test]
    fn test_allocate_rejects_zero() {
        assert_eq!(Stack::allocate(0, 1).err(), Some(MemoryError::InvalidSize));
    }

    #[test]
    fn test_drop_releases_mapping() {
        let before = live_stacks();
        let stack = Stack::allocate(16 * 1024, 1).expect("stack");
        assert_eq!(live_stacks(), before + 1);
        drop(stack);
        assert_eq!(live_stacks(), before);
    }

    #[test]
    fn test_without_guard() {
        let stack = Stack::allocate(16 * 1024, 0).expect("stack");
        assert_eq!(stack.guard_size(), 0);
        assert_eq!(stack.bottom(), stack.top().wrapping_sub(stack.size()));
    }
}
