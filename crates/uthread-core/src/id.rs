//! Uthread identifier type

use core::fmt;
use crate::constants::UTHREAD_NONE;

/// Opaque handle for a uthread
///
/// Indexes a slot in the scheduler's ready ring. The generation is bumped
/// every time a slot is recycled, so a handle kept after its uthread was
/// reaped never resolves to a newer uthread occupying the same slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UthreadId {
    index: u32,
    generation: u32,
}

impl UthreadId {
    /// Sentinel value indicating no uthread
    pub const NONE: UthreadId = UthreadId { index: UTHREAD_NONE, generation: 0 };

    /// Create a new UthreadId from its raw parts
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        UthreadId { index, generation }
    }

    /// Slot index
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Get slot index as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.index as usize
    }

    /// Slot generation
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.index == UTHREAD_NONE
    }

    /// Check if this is a valid uthread ID
    #[inline]
    pub const fn is_some(self) -> bool {
        self.index != UTHREAD_NONE
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<UthreadId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for UthreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "UthreadId(NONE)")
        } else {
            write!(f, "UthreadId({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for UthreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl Default for UthreadId {
    fn default() -> Self {
        UthreadId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uthread_id_basics() {
        let id = UthreadId::new(42, 3);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_usize(), 42);
        assert_eq!(id.generation(), 3);
        assert!(!id.is_none());
        assert!(id.is_some());
    }

    #[test]
    fn test_uthread_id_none() {
        let none = UthreadId::NONE;
        assert!(none.is_none());
        assert!(!none.is_some());
        assert_eq!(none.to_option(), None);
        assert_eq!(UthreadId::default(), none);
    }

    #[test]
    fn test_generation_distinguishes() {
        let old = UthreadId::new(7, 0);
        let new = UthreadId::new(7, 1);
        assert_ne!(old, new);
        assert_eq!(format!("{}", old), "7");
        assert_eq!(format!("{:?}", new), "UthreadId(7v1)");
    }
}
