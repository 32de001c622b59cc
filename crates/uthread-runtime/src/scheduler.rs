//! Cooperative scheduler
//!
//! Multiplexes uthreads onto the host thread that owns the `Scheduler`.
//! Control changes hands only inside `yield_now` and `exit`:
//!
//! - From the caller (`NotStarted`, or `Drained` with new work) `yield_now`
//!   saves the caller context and switches to the first runnable entry.
//! - From a uthread it switches to the next runnable entry in ring order,
//!   or back to the caller once every entry has finished.
//!
//! A uthread that never yields keeps the host thread forever; nothing
//! preempts it.
//!
//! The scheduler is `!Send` and `!Sync`: it must stay on the host thread
//! whose stack the caller context was captured from.

use crate::arch::EntryFn;
use crate::config::{ConfigError, SchedulerConfig};
use crate::current_arch;
use crate::memory::Stack;
use crate::ring::ReadyRing;
use crate::tcb::Tcb;

use uthread_core::context::ExecutionContext;
use uthread_core::error::{CreateResult, ReapError};
use uthread_core::id::UthreadId;
use uthread_core::kprint;
use uthread_core::state::{SchedulerPhase, UthreadState};
use uthread_core::{kdebug, kerror, ktrace, kwarn};

use std::cell::{Cell, RefCell, UnsafeCell};
use std::mem::ManuallyDrop;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Counters kept per scheduler
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Uthreads successfully created
    pub created: u64,
    /// Uthreads that reached FINISHED (including panicked ones)
    pub finished: u64,
    /// Routines that panicked
    pub panicked: u64,
    /// Context switches performed (caller entries and drains included)
    pub switches: u64,
    /// Return values consumed by reap
    pub reaped: u64,
}

/// Handle to a cooperative scheduler
///
/// Cloning gives another handle to the same scheduler. Every uthread
/// routine receives a handle so it can `yield_now`, `exit` or `create`.
pub struct Scheduler<T: 'static = ()> {
    inner: Rc<Inner<T>>,
}

struct Inner<T: 'static> {
    config: SchedulerConfig,
    ring: RefCell<ReadyRing<Tcb<T>>>,
    current: Cell<Option<UthreadId>>,
    /// Context of whoever entered the scheduler
    caller: UnsafeCell<ExecutionContext>,
    phase: Cell<SchedulerPhase>,
    /// Stack of a uthread that just finished; released after the switch
    /// away from it completes
    retired: Cell<Option<Stack>>,
    stats: Cell<SchedulerStats>,
}

impl<T: 'static> Scheduler<T> {
    /// Create a scheduler from compile-time defaults and env overrides.
    ///
    /// An invalid environment falls back to the compile-time defaults.
    pub fn new() -> Self {
        let config = SchedulerConfig::from_env();
        match Self::with_config(config) {
            Ok(sched) => sched,
            Err(e) => {
                kwarn!("{}; using built-in defaults", e);
                Self::build(SchedulerConfig::new())
            }
        }
    }

    /// Create a scheduler with an explicit configuration
    pub fn with_config(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SchedulerConfig) -> Self {
        let ring = ReadyRing::new(config.max_uthreads);
        Self {
            inner: Rc::new(Inner {
                config,
                ring: RefCell::new(ring),
                current: Cell::new(None),
                caller: UnsafeCell::new(ExecutionContext::new()),
                phase: Cell::new(SchedulerPhase::NotStarted),
                retired: Cell::new(None),
                stats: Cell::new(SchedulerStats::default()),
            }),
        }
    }

    /// Create a uthread running `routine` and append it to the ring.
    ///
    /// Does not switch: the uthread first runs when a `yield_now` reaches
    /// it. The routine's return value becomes the uthread's exit value.
    pub fn create<F>(&self, routine: F) -> CreateResult<UthreadId>
    where
        F: FnOnce(&Scheduler<T>) -> T + 'static,
    {
        let entry: EntryFn = uthread_entry::<T>;
        let arg = Rc::as_ptr(&self.inner) as usize;

        let tcb = Tcb::new(&self.inner.config, entry, arg, Box::new(routine))?;
        // On failure the TCB (and its stack) is dropped here
        let id = self.inner.ring.borrow_mut().insert(tcb)?;

        self.bump(|s| s.created += 1);
        if self.inner.config.debug_logging {
            kdebug!("created uthread {} ({:?})", id, self.inner.phase.get());
        }
        Ok(id)
    }

    /// Give up the host thread.
    ///
    /// From the caller this runs uthreads until all have finished and then
    /// returns. From a uthread it resumes the next runnable uthread and
    /// returns when this one is scheduled again. With nothing runnable it
    /// returns immediately.
    pub fn yield_now(&self) {
        if self.inner.phase.get().is_running() {
            self.yield_from_uthread();
        } else {
            self.enter_from_caller();
        }
    }

    /// Finish the current uthread with `retval`.
    ///
    /// Inside a uthread this call does not return: control moves to the
    /// next runnable uthread (or drains to the caller) and the rest of the
    /// routine never runs. The signature cannot say so because the same
    /// call from the caller, outside any uthread, has nothing to finish:
    /// there the value is dropped and the call returns.
    ///
    /// A routine that ends in `exit` still needs a value of type `T` after
    /// it to type-check; `unreachable!()` is the usual filler.
    ///
    /// ```ignore
    /// sched.create(|s| {
    ///     if done_early() {
    ///         s.exit(0);
    ///     }
    ///     slow_path()
    /// });
    /// ```
    pub fn exit(&self, retval: T) {
        if !self.inner.phase.get().is_running() || self.inner.current.get().is_none() {
            kdebug!("exit outside a uthread ignored");
            return;
        }
        self.finish_current(Some(retval), false)
    }

    /// Run every uthread to completion from the caller.
    ///
    /// Same as a caller-side `yield_now`; inside a uthread it is refused
    /// since the current uthread would be waiting on itself.
    pub fn run(&self) {
        if self.inner.phase.get().is_running() {
            kwarn!("run() called from inside a uthread; ignored");
            return;
        }
        self.enter_from_caller();
    }

    /// Consume a finished uthread's return value and drop its entry.
    ///
    /// `Ok(None)` means the uthread finished without a value (its routine
    /// panicked). Only the caller may reap, between scheduling passes:
    /// from inside a uthread this is `Err(SchedulerRunning)`.
    pub fn reap(&self, id: UthreadId) -> Result<Option<T>, ReapError> {
        if self.inner.phase.get().is_running() {
            return Err(ReapError::SchedulerRunning);
        }
        let mut tcb = {
            let mut ring = self.inner.ring.borrow_mut();
            match ring.get(id) {
                None => return Err(ReapError::NotFound),
                Some(tcb) if tcb.state().is_runnable() => return Err(ReapError::NotFinished),
                Some(_) => {}
            }
            ring.remove(id).ok_or(ReapError::NotFound)?
        };

        self.bump(|s| s.reaped += 1);
        if self.inner.config.debug_logging {
            kdebug!("reaped uthread {}", id);
        }
        Ok(tcb.retval.take())
    }

    /// Reap every finished uthread, in ring order
    ///
    /// Empty when called from inside a uthread.
    pub fn reap_finished(&self) -> Vec<(UthreadId, Option<T>)> {
        if self.inner.phase.get().is_running() {
            return Vec::new();
        }
        let finished: Vec<UthreadId> = self
            .inner
            .ring
            .borrow()
            .iter()
            .filter(|(_, tcb)| tcb.state().is_finished())
            .map(|(id, _)| id)
            .collect();

        finished
            .into_iter()
            .filter_map(|id| self.reap(id).ok().map(|v| (id, v)))
            .collect()
    }

    /// Copy of a finished uthread's return value, leaving it in place
    pub fn return_value(&self, id: UthreadId) -> Option<T>
    where
        T: Clone,
    {
        self.inner.ring.borrow().get(id).and_then(|tcb| tcb.retval.clone())
    }

    /// Run `f` on a finished uthread's return value without consuming it.
    ///
    /// The value is lent out of the ring while `f` runs, so `f` may use the
    /// scheduler freely (yield, create). During `f` the entry reports no
    /// value: `return_value(id)` is None and `reap(id)` gives `Ok(None)`,
    /// after which the lent value is dropped instead of put back.
    pub fn with_return_value<R>(&self, id: UthreadId, f: impl FnOnce(&T) -> R) -> Option<R> {
        let value = self.inner.ring.borrow_mut().get_mut(id)?.retval.take()?;
        let out = f(&value);
        if let Some(tcb) = self.inner.ring.borrow_mut().get_mut(id) {
            tcb.retval.get_or_insert(value);
        }
        Some(out)
    }

    /// Lifecycle state, or None for unknown / reaped ids
    pub fn state(&self, id: UthreadId) -> Option<UthreadState> {
        self.inner.ring.borrow().get(id).map(|tcb| tcb.state())
    }

    /// Did the uthread's routine panic
    pub fn panicked(&self, id: UthreadId) -> bool {
        self.inner.ring.borrow().get(id).map_or(false, |tcb| tcb.panicked())
    }

    /// Uthread currently holding the host thread
    #[inline]
    pub fn current(&self) -> Option<UthreadId> {
        self.inner.current.get()
    }

    #[inline]
    pub fn phase(&self) -> SchedulerPhase {
        self.inner.phase.get()
    }

    /// Uthreads in the ring (finished but unreaped ones included)
    pub fn len(&self) -> usize {
        self.inner.ring.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn runnable_count(&self) -> usize {
        self.inner.ring.borrow().runnable_count()
    }

    /// Ids in ring order
    pub fn ids(&self) -> Vec<UthreadId> {
        self.inner.ring.borrow().iter().map(|(id, _)| id).collect()
    }

    /// Is a finished uthread still holding its stack
    pub fn holds_stack(&self, id: UthreadId) -> bool {
        self.inner.ring.borrow().get(id).map_or(false, |tcb| tcb.stack.is_some())
    }

    #[inline]
    pub fn stats(&self) -> SchedulerStats {
        self.inner.stats.get()
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Switch protocol
    // ------------------------------------------------------------------

    fn enter_from_caller(&self) {
        let target = match self.inner.ring.borrow().first_runnable() {
            Some(id) => id,
            None => {
                kdebug!("yield with nothing runnable; no-op");
                return;
            }
        };
        let Some(to) = self.context_ptr(target) else {
            return;
        };

        if self.inner.config.debug_logging {
            kdebug!("entering scheduler at uthread {}", target);
        }
        self.inner.phase.set(SchedulerPhase::Running);
        self.inner.current.set(Some(target));
        kprint::set_uthread_id(target.index());

        unsafe {
            self.switch(self.inner.caller.get(), to);
        }

        // Only a drain switches back here
        kprint::clear_uthread_id();
        if self.inner.config.debug_logging {
            kdebug!("drained; {} uthread(s) awaiting reap", self.len());
        }
    }

    fn yield_from_uthread(&self) {
        let Some(cur) = self.inner.current.get() else {
            return;
        };
        let next = self.inner.ring.borrow().next_runnable(cur);
        let Some(from) = self.context_ptr(cur) else {
            return;
        };

        match next {
            // Nobody else is runnable
            Some(next) if next == cur => {}
            Some(next) => {
                let Some(to) = self.context_ptr(next) else {
                    return;
                };
                ktrace!("switch {} -> {}", cur, next);
                self.inner.current.set(Some(next));
                kprint::set_uthread_id(next.index());
                unsafe {
                    self.switch(from, to);
                }
            }
            None => {
                // Every entry, this one included, has finished
                self.inner.phase.set(SchedulerPhase::Drained);
                self.inner.current.set(None);
                kprint::clear_uthread_id();
                unsafe {
                    self.switch(from, self.inner.caller.get());
                }
            }
        }
    }

    /// Mark the current uthread finished and leave it for good
    fn finish_current(&self, retval: Option<T>, panicked: bool) -> ! {
        if let Some(cur) = self.inner.current.get() {
            let stack = self
                .inner
                .ring
                .borrow_mut()
                .get_mut(cur)
                .and_then(|tcb| tcb.finish(retval, panicked));
            // Still running on `stack`: it is released after the switch
            drop(self.inner.retired.replace(stack));

            self.bump(|s| {
                s.finished += 1;
                if panicked {
                    s.panicked += 1;
                }
            });
            if self.inner.config.debug_logging {
                kdebug!("uthread {} finished", cur);
            }
        }

        self.yield_from_uthread();
        unreachable!("finished uthread was resumed");
    }

    /// Save into `from`, resume `to`; returns when `from` is resumed.
    ///
    /// # Safety
    ///
    /// Both contexts must outlive the switch and `to` must be primed.
    unsafe fn switch(&self, from: *mut ExecutionContext, to: *const ExecutionContext) {
        self.bump(|s| s.switches += 1);
        current_arch::context_switch(from, to);
        self.release_retired();
    }

    /// Pointer to the live context inside the ring; the borrow ends here
    fn context_ptr(&self, id: UthreadId) -> Option<*mut ExecutionContext> {
        self.inner
            .ring
            .borrow_mut()
            .get_mut(id)
            .map(|tcb| &mut tcb.context as *mut ExecutionContext)
    }

    fn take_routine(&self) -> Option<crate::tcb::Routine<T>> {
        let cur = self.inner.current.get()?;
        self.inner.ring.borrow_mut().get_mut(cur)?.routine.take()
    }

    #[inline]
    fn release_retired(&self) {
        drop(self.inner.retired.take());
    }

    #[inline]
    fn bump(&self, f: impl FnOnce(&mut SchedulerStats)) {
        let mut stats = self.inner.stats.get();
        f(&mut stats);
        self.inner.stats.set(stats);
    }
}

impl<T: 'static> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: 'static> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> core::fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("phase", &self.phase())
            .field("current", &self.current())
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        let ring = self.ring.get_mut();
        let abandoned = ring
            .iter()
            .filter(|(_, tcb)| tcb.state().is_runnable() && tcb.is_started())
            .count();
        if abandoned > 0 {
            kwarn!(
                "scheduler dropped with {} suspended uthread(s); their frames are not unwound",
                abandoned
            );
        }
    }
}

/// First Rust code a fresh uthread runs, called from the arch trampoline.
///
/// `arg` is the scheduler's `Inner`. The handle built from it is never
/// dropped: this frame ends in a switch, not a return.
extern "C" fn uthread_entry<T: 'static>(arg: usize) -> ! {
    let sched = ManuallyDrop::new(Scheduler::<T> {
        inner: unsafe { Rc::from_raw(arg as *const Inner<T>) },
    });

    // The uthread that finished before us may have left its stack behind
    sched.release_retired();

    let outcome = match sched.take_routine() {
        Some(routine) => catch_unwind(AssertUnwindSafe(|| routine(&sched))),
        None => {
            kerror!("uthread {:?} started without a routine", sched.current());
            sched.finish_current(None, true)
        }
    };

    match outcome {
        Ok(retval) => sched.finish_current(Some(retval), false),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            kerror!("uthread {:?} panicked: {}", sched.current(), msg);
            drop(payload);
            sched.finish_current(None, true)
        }
    }
}
