//! Uthread lifecycle state and scheduler phase

use core::fmt;

/// State of a uthread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UthreadState {
    /// Created or suspended at a yield, eligible to run
    Runnable = 0,

    /// Routine returned or called exit; return value is stored
    Finished = 1,
}

impl UthreadState {
    /// Check if this state allows the uthread to be scheduled
    #[inline]
    pub const fn is_runnable(&self) -> bool {
        matches!(self, UthreadState::Runnable)
    }

    /// Check if this uthread has terminated
    #[inline]
    pub const fn is_finished(&self) -> bool {
        matches!(self, UthreadState::Finished)
    }
}

impl fmt::Display for UthreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UthreadState::Runnable => write!(f, "RUNNABLE"),
            UthreadState::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Phase of a scheduler instance
///
/// ```text
/// NotStarted ──yield──▶ Running ──all finished──▶ Drained
///                          ▲                         │
///                          └──create + caller yield──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerPhase {
    /// Caller has never entered the scheduler
    NotStarted = 0,

    /// A uthread is current; the caller is suspended
    Running = 1,

    /// Every uthread finished and control went back to the caller
    Drained = 2,
}

impl SchedulerPhase {
    /// True while control is inside some uthread
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self, SchedulerPhase::Running)
    }
}

impl Default for SchedulerPhase {
    fn default() -> Self {
        SchedulerPhase::NotStarted
    }
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerPhase::NotStarted => write!(f, "NOT_STARTED"),
            SchedulerPhase::Running => write!(f, "RUNNING"),
            SchedulerPhase::Drained => write!(f, "DRAINED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(UthreadState::Runnable.is_runnable());
        assert!(!UthreadState::Runnable.is_finished());
        assert!(UthreadState::Finished.is_finished());
        assert!(!UthreadState::Finished.is_runnable());
    }

    #[test]
    fn test_phase_default_and_display() {
        assert_eq!(SchedulerPhase::default(), SchedulerPhase::NotStarted);
        assert!(SchedulerPhase::Running.is_running());
        assert!(!SchedulerPhase::Drained.is_running());
        assert_eq!(format!("{}", SchedulerPhase::Drained), "DRAINED");
        assert_eq!(format!("{}", UthreadState::Runnable), "RUNNABLE");
    }
}
