//! Process-wide scheduler
//!
//! One [`Runtime`] per process, created by [`init`] and never torn down.
//! It lives in a static cell that is only touched while a [`PreemptGuard`]
//! masks the preemption signal, which is the sole source of reentrancy on
//! the single OS thread that runs every green thread.
//!
//! Both the alarm handler and the blocking API calls end in [`dispatch`]:
//! the core state machine picks the next thread, then the continuation of
//! the outgoing thread is saved and the incoming one restored. The switch
//! happens with the signal still masked. The resumed side unmasks: either
//! its own guard drops on the way out of an API call, or the kernel restores
//! the pre-signal mask when a preempted thread returns from the handler.

use std::cell::UnsafeCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use uthread_core::error::{SchedError, SchedResult};
use uthread_core::kprint::{self, LogLevel};
use uthread_core::{
    BlockOutcome, Entry, Reason, SchedCore, TerminateOutcome, Thread, ThreadId, ThreadState,
};
use uthread_core::{kdebug, kerror, kinfo};

use crate::arch::{self, Context};
use crate::config::SchedulerConfig;
use crate::memory::Stack;
use crate::signal::{self, PreemptGuard};

/// Scheduler state plus the continuation store
struct Runtime {
    core: SchedCore<Stack>,

    /// Saved continuation per identity
    contexts: Box<[Context]>,

    /// Save slot for a thread that terminated itself and never resumes
    scratch: Context,

    /// Record of a self-terminated thread. Its stack was still executing at
    /// dispatch time, so it is released by the next thread to run.
    graveyard: Option<Thread<Stack>>,

    stack_size: usize,
}

impl Runtime {
    fn new(config: &SchedulerConfig) -> SchedResult<Self> {
        Ok(Self {
            core: SchedCore::new(config.max_threads)?,
            contexts: vec![Context::default(); config.max_threads].into_boxed_slice(),
            scratch: Context::default(),
            graveyard: None,
            stack_size: config.stack_size,
        })
    }

    /// Run the dispatch protocol and return the continuations to swap
    ///
    /// `None` when the running thread keeps the processor.
    fn prepare_switch(&mut self, reason: Reason) -> Option<(*mut Context, *const Context)> {
        let sw = self.core.tick(reason);

        if reason.is_voluntary() {
            if let Err(e) = signal::rearm() {
                kerror!("failed to re-arm preemption alarm: {}", e);
            }
        }
        if sw.is_noop() {
            return None;
        }

        let save = match sw.retired {
            Some(retired) => {
                self.graveyard = Some(retired);
                &mut self.scratch as *mut Context
            }
            None => &mut self.contexts[sw.from.as_usize()] as *mut Context,
        };
        let load = &self.contexts[sw.to.as_usize()] as *const Context;
        Some((save, load))
    }

    /// Release the stack of a thread that terminated itself
    fn reap(&mut self) {
        if let Some(dead) = self.graveyard.take() {
            kdebug!("reaped stack of thread {}", dead.id());
        }
    }
}

struct Global(UnsafeCell<Option<Runtime>>);

// SAFETY: only accessed on the owning OS thread with the preemption signal
// masked; see `with_runtime`.
unsafe impl Sync for Global {}

static RUNTIME: Global = Global(UnsafeCell::new(None));
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Run `f` on the runtime inside the caller's critical section
///
/// `f` must not dispatch: no reference into the runtime may live across a
/// context switch.
fn with_runtime<R>(
    _guard: &PreemptGuard,
    f: impl FnOnce(&mut Runtime) -> SchedResult<R>,
) -> SchedResult<R> {
    if !INITIALIZED.load(Ordering::Acquire) {
        return Err(SchedError::NotInitialized);
    }
    if !signal::on_owner_thread() {
        return Err(SchedError::IllegalOperation("called off the scheduler's OS thread"));
    }
    // SAFETY: the guard masks the handler, the only other code touching
    // RUNTIME, and `f` cannot reenter because it never dispatches.
    let slot = unsafe { &mut *RUNTIME.0.get() };
    match slot.as_mut() {
        Some(rt) => f(rt),
        None => Err(SchedError::NotInitialized),
    }
}

/// Tick the scheduler and switch to whichever thread it picks
///
/// Returns once the calling thread is scheduled again, or never for
/// `Reason::Terminated`.
fn dispatch(guard: &PreemptGuard, reason: Reason) -> SchedResult<()> {
    let Some((save, load)) = with_runtime(guard, |rt| Ok(rt.prepare_switch(reason)))? else {
        return Ok(());
    };

    // SAFETY: both contexts live in the runtime, which is never dropped, and
    // `load` was saved by `switch` or built by `init_context`.
    unsafe { arch::switch(save, load) };

    with_runtime(guard, |rt| {
        rt.reap();
        Ok(())
    })
}

/// First code run on every spawned thread's stack
extern "C" fn thread_start() -> ! {
    // SAFETY: whoever switched here did so inside a critical section that
    // only this stack can close.
    let guard = unsafe { PreemptGuard::inherited() };
    let entry = with_runtime(&guard, |rt| {
        rt.reap();
        Ok(rt.core.take_current_entry())
    });
    drop(guard);

    match entry {
        Ok(Some(mut entry)) => {
            if catch_unwind(AssertUnwindSafe(&mut entry)).is_err() {
                kerror!("thread {} panicked", current_id());
            }
            without_preemption(move || drop(entry));
        }
        Ok(None) => kerror!("thread {} started without an entry", current_id()),
        Err(e) => kerror!("thread start failed: {}", e),
    }

    exit_current()
}

/// Terminate the running thread after its entry closure returned
fn exit_current() -> ! {
    match PreemptGuard::acquire() {
        Ok(guard) => {
            if let Err(e) = dispatch(&guard, Reason::Terminated) {
                kerror!("exit dispatch failed: {}", e);
            }
        }
        Err(e) => kerror!("cannot mask preemption on thread exit: {}", e),
    }
    std::process::abort()
}

/// Alarm handler: preempt the running thread
extern "C" fn preempt_handler(_sig: libc::c_int) {
    if !signal::on_owner_thread() {
        if let Err(e) = signal::forward_to_owner() {
            kerror!("failed to forward preemption signal: {}", e);
        }
        return;
    }

    let saved_errno = nix::errno::Errno::last_raw();
    // No dispatch without the critical section
    match PreemptGuard::acquire() {
        Ok(guard) => {
            if let Err(e) = dispatch(&guard, Reason::QuantumExpired) {
                kerror!("preemption dispatch failed: {}", e);
            }
        }
        Err(e) => kerror!("cannot mask preemption in handler: {}", e),
    }
    nix::errno::Errno::set_raw(saved_errno);
}

/// Initialize the scheduler on the calling OS thread, which becomes thread 0
///
/// Fails with `AlreadyInitialized` after a successful call, and with
/// `InvalidArgument` if the configuration does not validate. A failed call
/// leaves no handler, runtime or alarm behind, so init may be retried.
pub fn init(config: SchedulerConfig) -> SchedResult<()> {
    if INITIALIZED.load(Ordering::Acquire) {
        return Err(SchedError::AlreadyInitialized);
    }
    config.validate()?;

    kprint::init();
    if config.debug_logging {
        kprint::raise_log_level(LogLevel::Debug);
        config.print();
    }

    let runtime = Runtime::new(&config)?;
    signal::install(config.clock, preempt_handler)?;
    if let Err(e) = start(runtime, config.quantum_usecs) {
        signal::uninstall();
        return Err(e);
    }

    kinfo!(
        "scheduler up: quantum {}us, {} threads, {} clock",
        config.quantum_usecs,
        config.max_threads,
        config.clock
    );
    Ok(())
}

/// Publish the runtime and start the alarm
///
/// `INITIALIZED` is set only once the alarm runs. On failure the runtime is
/// taken back out of the cell.
fn start(runtime: Runtime, quantum_usecs: i64) -> SchedResult<()> {
    let guard = PreemptGuard::acquire()?;
    // SAFETY: the signal is masked and INITIALIZED is still false, so neither
    // the handler nor any API call can observe the cell.
    let slot = unsafe { &mut *RUNTIME.0.get() };
    *slot = Some(runtime);
    if let Err(e) = signal::arm(quantum_usecs) {
        *slot = None;
        kerror!("failed to arm preemption alarm: {}", e);
        return Err(e);
    }
    INITIALIZED.store(true, Ordering::Release);
    drop(guard);
    Ok(())
}

/// Whether `init` has succeeded
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Create a thread that runs `f` and then terminates
pub fn spawn<F>(f: F) -> SchedResult<ThreadId>
where
    F: FnOnce() + 'static,
{
    let guard = PreemptGuard::acquire()?;
    with_runtime(&guard, |rt| {
        let mut f = Some(f);
        let entry: Entry = Box::new(move || {
            if let Some(f) = f.take() {
                f()
            }
        });
        let stack_size = rt.stack_size;
        let id = rt.core.spawn(entry, |_| Stack::new(stack_size))?;
        let top = rt
            .core
            .thread(id)
            .and_then(Thread::stack)
            .map(Stack::top)
            .ok_or(SchedError::UnknownThread(id))?;
        // SAFETY: the stack is owned by the thread record, which outlives
        // every switch into this context.
        unsafe {
            arch::init_context(&mut rt.contexts[id.as_usize()], top, thread_start);
        }
        Ok(id)
    })
}

/// Terminate a thread
///
/// Terminating the caller does not return. Terminating thread 0 disarms the
/// alarm, releases every other thread and exits the process with status 0.
pub fn terminate(id: ThreadId) -> SchedResult<()> {
    let guard = PreemptGuard::acquire()?;
    match with_runtime(&guard, |rt| rt.core.terminate(id))? {
        TerminateOutcome::Removed(thread) => {
            drop(thread);
            Ok(())
        }
        TerminateOutcome::Dispatch => {
            dispatch(&guard, Reason::Terminated)?;
            kerror!("terminated thread {} was resumed", id);
            std::process::abort()
        }
        TerminateOutcome::ExitProcess => exit_process(&guard),
    }
}

fn exit_process(guard: &PreemptGuard) -> ! {
    if let Err(e) = signal::disarm() {
        kerror!("failed to disarm preemption alarm: {}", e);
    }
    let released = with_runtime(guard, |rt| {
        rt.reap();
        Ok(rt.core.drain_for_exit())
    })
    .unwrap_or_default();
    kdebug!("exiting: released {} threads", released.len());
    drop(released);
    std::process::exit(0)
}

/// Block a thread until it is resumed
pub fn block(id: ThreadId) -> SchedResult<()> {
    let guard = PreemptGuard::acquire()?;
    match with_runtime(&guard, |rt| rt.core.block(id))? {
        BlockOutcome::Done => Ok(()),
        BlockOutcome::Dispatch => dispatch(&guard, Reason::Blocked),
    }
}

/// Make a blocked thread runnable again
pub fn resume(id: ThreadId) -> SchedResult<()> {
    let guard = PreemptGuard::acquire()?;
    with_runtime(&guard, |rt| rt.core.resume(id))
}

/// Put the calling thread to sleep for `num_quantums` quanta
pub fn sleep(num_quantums: i32) -> SchedResult<()> {
    let guard = PreemptGuard::acquire()?;
    with_runtime(&guard, |rt| rt.core.begin_sleep(num_quantums))?;
    dispatch(&guard, Reason::Sleeping)
}

/// Identity of the running thread; 0 before init
pub fn current_id() -> ThreadId {
    let Ok(guard) = PreemptGuard::acquire() else {
        return ThreadId::MAIN;
    };
    with_runtime(&guard, |rt| Ok(rt.core.current())).unwrap_or(ThreadId::MAIN)
}

/// Quanta started since init; 0 before init
pub fn total_quantums() -> u64 {
    let Ok(guard) = PreemptGuard::acquire() else {
        return 0;
    };
    with_runtime(&guard, |rt| Ok(rt.core.total_quantums())).unwrap_or(0)
}

/// Quanta a thread has spent running
pub fn quantums_of(id: ThreadId) -> SchedResult<u64> {
    let guard = PreemptGuard::acquire()?;
    with_runtime(&guard, |rt| rt.core.quantums_of(id))
}

/// Current state of a thread
pub fn state(id: ThreadId) -> SchedResult<ThreadState> {
    let guard = PreemptGuard::acquire()?;
    with_runtime(&guard, |rt| rt.core.state_of(id))
}

/// Run `f` with preemption masked
///
/// Green threads share one OS thread, so anything that takes a lock
/// (printing, allocating) can deadlock if the holder is preempted. Wrapping
/// such code here keeps it atomic with respect to other green threads.
pub fn without_preemption<R>(f: impl FnOnce() -> R) -> R {
    let _guard = match PreemptGuard::acquire() {
        Ok(guard) => guard,
        Err(e) => {
            kerror!("cannot mask preemption: {}", e);
            std::process::abort()
        }
    };
    f()
}
