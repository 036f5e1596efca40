//! # uthread-runtime
//!
//! Platform runtime for the uthread scheduler.
//!
//! This crate provides:
//! - Configuration (build-time defaults, environment overrides)
//! - Thread stacks (mmap with a guard page)
//! - Context switching (architecture-specific assembly)
//! - Preemption (interval timer signal, signal-mask critical section)
//! - The process-wide scheduler driving `uthread_core::SchedCore`

pub mod config;
pub mod memory;
pub mod arch;
pub mod signal;
pub mod scheduler;

pub use config::{AlarmClock, ConfigError, SchedulerConfig};
pub use memory::Stack;
pub use signal::PreemptGuard;
