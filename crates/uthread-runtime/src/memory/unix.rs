//! Unix stack mapping using mmap

use core::ptr::NonNull;
use nix::errno::Errno;
use uthread_core::constants::DEFAULT_PAGE_SIZE;
use uthread_core::error::MemoryError;
use uthread_core::kwarn;

/// System page size
pub fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        sz as usize
    }
}

/// Map `len` bytes read/write and turn the lowest `guard_len` bytes into a
/// guard. Physical pages are committed lazily on first touch.
pub(super) fn map_stack(len: usize, guard_len: usize) -> Result<NonNull<u8>, MemoryError> {
    let base = unsafe {
        libc::mmap(
            core::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(MemoryError::MapFailed(Errno::last_raw()));
    }

    if guard_len > 0 {
        // Overflow runs into this page and faults
        let ret = unsafe { libc::mprotect(base, guard_len, libc::PROT_NONE) };
        if ret != 0 {
            let errno = Errno::last_raw();
            unsafe {
                libc::munmap(base, len);
            }
            return Err(MemoryError::GuardFailed(errno));
        }
    }

    NonNull::new(base as *mut u8).ok_or(MemoryError::MapFailed(0))
}

/// Release a mapping created by `map_stack`
pub(super) fn unmap_stack(base: NonNull<u8>, len: usize) {
    let ret = unsafe { libc::munmap(base.as_ptr() as *mut libc::c_void, len) };
    if ret != 0 {
        kwarn!("munmap of stack {:p} failed: {}", base, Errno::last());
    }
}
