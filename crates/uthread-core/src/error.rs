//! Error types for the uthread scheduler

use core::fmt;

/// Result type for `create`
pub type CreateResult<T> = Result<T, CreateError>;

/// Errors surfaced by `Scheduler::create`
///
/// `yield_now` and `exit` have no error channel; only creation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    /// Stack or control-block memory could not be obtained
    AllocationFailure(MemoryError),

    /// The initial execution context could not be prepared
    ContextInitializationFailure(ContextError),
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::AllocationFailure(e) => write!(f, "allocation failure: {}", e),
            CreateError::ContextInitializationFailure(e) => {
                write!(f, "context initialization failure: {}", e)
            }
        }
    }
}

impl std::error::Error for CreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CreateError::AllocationFailure(e) => Some(e),
            CreateError::ContextInitializationFailure(e) => Some(e),
        }
    }
}

/// Memory-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Requested size is zero or overflows when rounded to pages
    InvalidSize,

    /// mmap failed (errno)
    MapFailed(i32),

    /// mprotect on the guard page failed (errno)
    GuardFailed(i32),

    /// The ring has no free control-block slot left
    TooManyUthreads,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::InvalidSize => write!(f, "invalid stack size"),
            MemoryError::MapFailed(errno) => write!(f, "stack mapping failed (errno {})", errno),
            MemoryError::GuardFailed(errno) => {
                write!(f, "guard page protection failed (errno {})", errno)
            }
            MemoryError::TooManyUthreads => write!(f, "too many uthreads"),
        }
    }
}

impl std::error::Error for MemoryError {}

impl From<MemoryError> for CreateError {
    fn from(e: MemoryError) -> Self {
        CreateError::AllocationFailure(e)
    }
}

/// Context initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// Stack top pointer is null
    NullStack,

    /// Stack top is not aligned to the ABI requirement
    MisalignedStack,

    /// Stack cannot hold the initial frame
    StackTooSmall,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::NullStack => write!(f, "null stack pointer"),
            ContextError::MisalignedStack => write!(f, "misaligned stack pointer"),
            ContextError::StackTooSmall => write!(f, "stack too small for initial frame"),
        }
    }
}

impl std::error::Error for ContextError {}

impl From<ContextError> for CreateError {
    fn from(e: ContextError) -> Self {
        CreateError::ContextInitializationFailure(e)
    }
}

/// Errors from reaping a uthread's return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapError {
    /// Unknown id, or the uthread was already reaped
    NotFound,

    /// The uthread has not finished yet
    NotFinished,

    /// Called from inside a uthread; entries only leave the ring between
    /// scheduling passes
    SchedulerRunning,
}

impl fmt::Display for ReapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReapError::NotFound => write!(f, "uthread not found"),
            ReapError::NotFinished => write!(f, "uthread not finished"),
            ReapError::SchedulerRunning => write!(f, "cannot reap while the scheduler is running"),
        }
    }
}

impl std::error::Error for ReapError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let e = CreateError::AllocationFailure(MemoryError::MapFailed(12));
        assert_eq!(format!("{}", e), "allocation failure: stack mapping failed (errno 12)");

        let e = CreateError::ContextInitializationFailure(ContextError::MisalignedStack);
        assert_eq!(
            format!("{}", e),
            "context initialization failure: misaligned stack pointer"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: CreateError = MemoryError::TooManyUthreads.into();
        assert!(matches!(err, CreateError::AllocationFailure(MemoryError::TooManyUthreads)));

        let err: CreateError = ContextError::NullStack.into();
        assert!(matches!(
            err,
            CreateError::ContextInitializationFailure(ContextError::NullStack)
        ));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_reap_error_display() {
        assert_eq!(ReapError::NotFinished.to_string(), "uthread not finished");
        assert_eq!(
            ReapError::SchedulerRunning.to_string(),
            "cannot reap while the scheduler is running"
        );
    }
}
