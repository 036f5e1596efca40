//! # uthread - green threads on one OS thread
//!
//! Many logical threads multiplexed onto the calling OS thread, switched
//! every quantum by an interval-timer signal or whenever a thread blocks,
//! sleeps or terminates.
//!
//! ## Quick Start
//!
//! ```ignore
//! use uthread::{init, spawn, sleep, terminate, ThreadId};
//!
//! fn main() {
//!     init(10_000).unwrap();
//!
//!     let id = spawn(|| {
//!         sleep(3).unwrap();
//!         uthread::kprintln!("awake");
//!     })
//!     .unwrap();
//!
//!     while uthread::state(id).is_ok() {}
//!     terminate(ThreadId::MAIN).unwrap();
//! }
//! ```
//!
//! ## Model
//!
//! ```text
//!   alarm (every quantum)      block / sleep / terminate
//!            │                          │
//!            └────────────┬─────────────┘
//!                         ▼
//!                   dispatch(reason)
//!        advance sleepers, retire outgoing thread,
//!        pop ready queue (or thread 0), count quantum
//!                         │
//!                         ▼
//!                  context switch
//! ```
//!
//! Thread 0 is the thread that called [`init`]. It cannot block or sleep,
//! runs whenever nothing else is ready, and terminating it ends the process.
//!
//! Green threads share one OS thread, so code that takes a process-wide lock
//! (printing through std, allocating) should run inside
//! [`without_preemption`] or use the [`kprintln!`] family, which is
//! lock-free.

// Re-export core types
pub use uthread_core::{ErrorKind, MemoryError, SchedError, SchedResult, ThreadId, ThreadState};

// Re-export kprint macros for debug logging
pub use uthread_core::{kdebug, kerror, kinfo, kprint, kprintln, ktrace, kwarn};
pub use uthread_core::kprint::{set_log_level, LogLevel};

// Re-export runtime types
pub use uthread_runtime::{AlarmClock, ConfigError, SchedulerConfig};

use uthread_runtime::scheduler;

/// Initialize the scheduler with a quantum of `quantum_usecs` microseconds
///
/// The calling thread becomes thread 0 and total quantum count starts at 1.
/// Other settings come from [`SchedulerConfig::from_env`].
///
/// Fails with `InvalidArgument` if `quantum_usecs <= 0` and with
/// `AlreadyInitialized` on a second successful call.
pub fn init(quantum_usecs: i64) -> SchedResult<()> {
    init_with_config(SchedulerConfig::from_env().quantum_usecs(quantum_usecs))
}

/// Initialize the scheduler with an explicit configuration
pub fn init_with_config(config: SchedulerConfig) -> SchedResult<()> {
    scheduler::init(config)
}

/// Spawn a thread running `f`
///
/// The new thread gets the lowest free identity and joins the tail of the
/// ready queue. Returning from `f` terminates it.
pub fn spawn<F>(f: F) -> SchedResult<ThreadId>
where
    F: FnOnce() + 'static,
{
    scheduler::spawn(f)
}

/// Spawn a thread from a plain entry point
///
/// `None` is rejected with `InvalidArgument`.
pub fn spawn_fn(entry: Option<fn()>) -> SchedResult<ThreadId> {
    let entry = entry.ok_or(SchedError::InvalidArgument("missing entry point"))?;
    scheduler::spawn(entry)
}

/// Terminate a thread
///
/// Terminating the calling thread never returns. Terminating thread 0 ends
/// the process with status 0, whatever state other threads are in.
pub fn terminate(id: ThreadId) -> SchedResult<()> {
    scheduler::terminate(id)
}

/// Block a thread until [`resume`]d
///
/// Blocking the calling thread returns once it has been resumed and
/// rescheduled. Thread 0 cannot be blocked.
pub fn block(id: ThreadId) -> SchedResult<()> {
    scheduler::block(id)
}

/// Resume a blocked thread
///
/// A sleeping thread that was also blocked keeps sleeping. No-op for
/// threads that are not blocked.
pub fn resume(id: ThreadId) -> SchedResult<()> {
    scheduler::resume(id)
}

/// Sleep for `num_quantums` quanta
///
/// The quantum in which the call is made does not count. Thread 0 cannot
/// sleep.
pub fn sleep(num_quantums: i32) -> SchedResult<()> {
    scheduler::sleep(num_quantums)
}

/// Identity of the calling thread
#[inline]
pub fn current_id() -> ThreadId {
    scheduler::current_id()
}

/// Quanta started since [`init`], the current one included
#[inline]
pub fn total_quantums() -> u64 {
    scheduler::total_quantums()
}

/// Quanta the thread has been running for, the current one included
pub fn quantums_of(id: ThreadId) -> SchedResult<u64> {
    scheduler::quantums_of(id)
}

/// State of a live thread
pub fn state(id: ThreadId) -> SchedResult<ThreadState> {
    scheduler::state(id)
}

/// Run `f` without being preempted
///
/// `f` may still block, sleep or terminate; preemption is held off only
/// while the calling thread is running.
pub fn without_preemption<R>(f: impl FnOnce() -> R) -> R {
    scheduler::without_preemption(f)
}

/// Whether [`init`] has succeeded in this process
pub fn is_initialized() -> bool {
    scheduler::is_initialized()
}
