//! Thread control block
//!
//! One per uthread, owned by its ring entry. Holds the saved context, the
//! stack the context runs on, the routine until it is started, and the
//! return-value slot once it has finished.

use crate::arch::EntryFn;
use crate::config::SchedulerConfig;
use crate::current_arch;
use crate::memory::Stack;
use crate::ring::RingMember;
use crate::scheduler::Scheduler;

use uthread_core::context::ExecutionContext;
use uthread_core::error::CreateResult;
use uthread_core::state::UthreadState;

/// User routine: receives the scheduler it runs on, returns the exit value
pub type Routine<T> = Box<dyn FnOnce(&Scheduler<T>) -> T + 'static>;

pub struct Tcb<T: 'static> {
    /// Saved registers; the only live copy
    pub(crate) context: ExecutionContext,
    /// None once finished (the stack is retired then released)
    pub(crate) stack: Option<Stack>,
    /// Taken by the entry function on first resume
    pub(crate) routine: Option<Routine<T>>,
    pub(crate) retval: Option<T>,
    pub(crate) state: UthreadState,
    pub(crate) panicked: bool,
}

impl<T: 'static> Tcb<T> {
    /// Allocate a stack and prime a context that will enter `entry(arg)`.
    ///
    /// All-or-nothing: if the context cannot be prepared the stack is
    /// released before the error is returned.
    pub(crate) fn new(
        config: &SchedulerConfig,
        entry: EntryFn,
        arg: usize,
        routine: Routine<T>,
    ) -> CreateResult<Self> {
        let stack = Stack::allocate(config.stack_size, config.guard_pages)?;
        let top = stack.top();
        Self::on_stack(stack, top, entry, arg, routine)
    }

    /// Prime a context whose initial stack pointer is `top` within `stack`.
    ///
    /// Takes ownership of `stack` so a failed prime releases it.
    fn on_stack(
        stack: Stack,
        top: *mut u8,
        entry: EntryFn,
        arg: usize,
        routine: Routine<T>,
    ) -> CreateResult<Self> {
        let mut context = ExecutionContext::new();
        current_arch::init_context(&mut context, top, stack.size(), entry, arg)?;

        Ok(Self {
            context,
            stack: Some(stack),
            routine: Some(routine),
            retval: None,
            state: UthreadState::Runnable,
            panicked: false,
        })
    }

    #[inline]
    pub fn state(&self) -> UthreadState {
        self.state
    }

    /// Has the entry function taken the routine yet
    #[inline]
    pub fn is_started(&self) -> bool {
        self.routine.is_none()
    }

    #[inline]
    pub fn panicked(&self) -> bool {
        self.panicked
    }

    /// Mark finished, store the return value and hand back the stack.
    ///
    /// The caller is still executing on the returned stack; it must not be
    /// dropped until control has switched away from it.
    pub(crate) fn finish(&mut self, retval: Option<T>, panicked: bool) -> Option<Stack> {
        self.state = UthreadState::Finished;
        self.retval = retval;
        self.panicked = panicked;
        self.stack.take()
    }
}

impl<T: 'static> RingMember for Tcb<T> {
    #[inline]
    fn is_runnable(&self) -> bool {
        self.state.is_runnable()
    }
}

impl<T: 'static> core::fmt::Debug for Tcb<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tcb")
            .field("state", &self.state)
            .field("started", &self.is_started())
            .field("has_stack", &self.stack.is_some())
            .field("has_retval", &self.retval.is_some())
            .field("panicked", &self.panicked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::live_stacks;
    use uthread_core::error::{ContextError, CreateError, MemoryError};

    extern "C" fn never(_: usize) -> ! {
        loop {
            std::hint::spin_loop();
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::new().stack_size(32 * 1024)
    }

    #[test]
    fn test_new_tcb_is_runnable_and_primed() {
        let tcb: Tcb<u32> = Tcb::new(&config(), never, 0, Box::new(|_| 7)).unwrap();
        assert_eq!(tcb.state(), UthreadState::Runnable);
        assert!(!tcb.is_started());
        assert!(tcb.context.is_primed());

        let stack = tcb.stack.as_ref().unwrap();
        assert_eq!(tcb.context.stack_pointer(), stack.top() as usize);
    }

    #[test]
    fn test_finish_hands_back_stack() {
        let mut tcb: Tcb<u32> = Tcb::new(&config(), never, 0, Box::new(|_| 7)).unwrap();
        let stack = tcb.finish(Some(42), false);
        assert!(stack.is_some());
        assert!(tcb.stack.is_none());
        assert_eq!(tcb.state(), UthreadState::Finished);
        assert!(!tcb.is_runnable());
        assert_eq!(tcb.retval, Some(42));
    }

    #[test]
    fn test_allocation_failure_surfaces() {
        let config = SchedulerConfig::new().stack_size(0);
        let err = Tcb::<()>::new(&config, never, 0, Box::new(|_| ())).unwrap_err();
        assert_eq!(err, CreateError::AllocationFailure(MemoryError::InvalidSize));
    }

    #[test]
    fn test_context_failure_releases_stack() {
        let before = live_stacks();
        let stack = Stack::allocate(32 * 1024, 1).unwrap();
        assert_eq!(live_stacks(), before + 1);

        let misaligned = stack.top().wrapping_sub(8);
        let err = Tcb::<()>::on_stack(stack, misaligned, never, 0, Box::new(|_| ())).unwrap_err();

        assert_eq!(
            err,
            CreateError::ContextInitializationFailure(ContextError::MisalignedStack)
        );
        assert_eq!(live_stacks(), before);
    }

    #[test]
    fn test_successful_new_keeps_one_stack() {
        let before = live_stacks();
        let tcb: Tcb<u8> = Tcb::new(&config(), never, 0, Box::new(|_| 1)).unwrap();
        assert_eq!(live_stacks(), before + 1);
        drop(tcb);
        assert_eq!(live_stacks(), before);
    }
}
