//! Thread state and dispatch reason types

use core::fmt;

/// State of a logical thread
///
/// `Terminated` is never stored in a thread record; a terminated thread's
/// record is removed from the table in the same critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Waiting in the ready queue
    Ready = 0,

    /// The one thread currently executing
    Running = 1,

    /// Explicitly blocked, waiting for `resume`
    Blocked = 2,

    /// Counting down a sleep timer
    Sleeping = 3,

    /// Counting down a sleep timer and explicitly blocked
    SleepingAndBlocked = 4,

    /// Being torn down
    Terminated = 5,
}

impl ThreadState {
    /// Check if this state places the thread in the ready queue
    #[inline]
    pub const fn is_runnable(&self) -> bool {
        matches!(self, ThreadState::Ready)
    }

    /// Check if this state places the thread in the sleep set
    #[inline]
    pub const fn is_sleeping(&self) -> bool {
        matches!(self, ThreadState::Sleeping | ThreadState::SleepingAndBlocked)
    }

    /// Check if the thread is explicitly blocked (alone or while asleep)
    #[inline]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, ThreadState::Blocked | ThreadState::SleepingAndBlocked)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Ready => write!(f, "READY"),
            ThreadState::Running => write!(f, "RUNNING"),
            ThreadState::Blocked => write!(f, "BLOCKED"),
            ThreadState::Sleeping => write!(f, "SLEEPING"),
            ThreadState::SleepingAndBlocked => write!(f, "SLEEPING+BLOCKED"),
            ThreadState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Why the running thread is leaving the `Running` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The alarm fired: the quantum ran out
    QuantumExpired,

    /// The running thread blocked itself
    Blocked,

    /// The running thread went to sleep (already entered in the sleep set)
    Sleeping,

    /// The running thread terminated itself
    Terminated,
}

impl Reason {
    /// Voluntary reasons come from an API call rather than the alarm
    #[inline]
    pub const fn is_voluntary(&self) -> bool {
        !matches!(self, Reason::QuantumExpired)
    }
}
