//! Preemption signal layer
//!
//! A periodic interval timer delivers the preemption signal (`SIGALRM` for
//! the default wall clock, `SIGVTALRM` for the virtual one). Masking that signal is
//! the scheduler's critical section, held through [`PreemptGuard`].

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else {
        compile_error!("uthread preemption needs POSIX signals");
    }
}
