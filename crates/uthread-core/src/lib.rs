//! # uthread-core
//!
//! Core types and the scheduler state machine for uthread, a single-stream
//! green-thread scheduler with quantum-based preemption.
//!
//! This crate is platform-agnostic: it never switches stacks or touches
//! signals. Everything here is driven by `uthread-runtime`, which holds the
//! preemption critical section around every call.
//!
//! ## Modules
//!
//! - `id` - Thread identifier type
//! - `state` - Thread state and dispatch reason
//! - `error` - Error types
//! - `id_alloc` - Lowest-free identity allocator
//! - `ready_queue` - FIFO ready queue
//! - `sleep_set` - Set of sleeping threads
//! - `thread` - Thread record
//! - `table` - Identity-indexed thread table
//! - `sched` - Dispatch protocol and state transitions
//! - `kprint` - Signal-safe kernel-style logging macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod error;
pub mod id_alloc;
pub mod ready_queue;
pub mod sleep_set;
pub mod thread;
pub mod table;
pub mod sched;
pub mod kprint;
pub mod env;

pub use id::ThreadId;
pub use state::{Reason, ThreadState};
pub use error::{ErrorKind, MemoryError, SchedError, SchedResult};
pub use id_alloc::IdAllocator;
pub use ready_queue::ReadyQueue;
pub use sleep_set::SleepSet;
pub use thread::{Entry, Thread};
pub use table::ThreadTable;
pub use sched::{BlockOutcome, SchedCore, Switch, TerminateOutcome};
pub use env::{env_get, env_get_bool, env_get_lower, env_get_opt};

/// Scheduler-wide constants
pub mod constants {
    /// Default size of the identity space, main thread included
    pub const DEFAULT_MAX_THREADS: usize = 100;

    /// Page size assumed for stack guard pages
    pub const PAGE_SIZE: usize = 4096;

    /// Smallest stack a spawned thread may be given
    pub const MIN_STACK_SIZE: usize = 16 * 1024;
}
