//! Error types for the uthread scheduler

use core::fmt;
use crate::id::ThreadId;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors reported by scheduler operations
///
/// Every error is detected before any scheduler state is touched, so a
/// failed call leaves the scheduler exactly as it found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Non-positive quantum, negative sleep, missing entry point, bad config
    InvalidArgument(&'static str),

    /// Identity out of range or not currently live
    UnknownThread(ThreadId),

    /// Identity space is full
    CapacityExceeded,

    /// Operation not permitted on this thread (e.g. blocking the main thread)
    IllegalOperation(&'static str),

    /// Scheduler not initialized
    NotInitialized,

    /// Scheduler already initialized
    AlreadyInitialized,

    /// Stack allocation/protection failed
    MemoryError(MemoryError),

    /// Signal mask, handler or timer call failed (errno)
    PlatformError(i32),
}

/// Coarse classification of a [`SchedError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UnknownThread,
    CapacityExceeded,
    IllegalOperation,
    Lifecycle,
    Platform,
}

impl SchedError {
    /// Map to the coarse error classification
    pub const fn kind(&self) -> ErrorKind {
        match self {
            SchedError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SchedError::UnknownThread(_) => ErrorKind::UnknownThread,
            SchedError::CapacityExceeded => ErrorKind::CapacityExceeded,
            SchedError::IllegalOperation(_) => ErrorKind::IllegalOperation,
            SchedError::NotInitialized | SchedError::AlreadyInitialized => ErrorKind::Lifecycle,
            SchedError::MemoryError(_) | SchedError::PlatformError(_) => ErrorKind::Platform,
        }
    }
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            SchedError::UnknownThread(id) => write!(f, "no thread with id {}", id),
            SchedError::CapacityExceeded => write!(f, "thread capacity exceeded"),
            SchedError::IllegalOperation(msg) => write!(f, "illegal operation: {}", msg),
            SchedError::NotInitialized => write!(f, "scheduler not initialized"),
            SchedError::AlreadyInitialized => write!(f, "scheduler already initialized"),
            SchedError::MemoryError(e) => write!(f, "memory error: {}", e),
            SchedError::PlatformError(code) => write!(f, "platform error: errno {}", code),
        }
    }
}

impl std::error::Error for SchedError {}

/// Stack memory errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed,

    /// mprotect on the guard page failed
    ProtectionFailed,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "stack allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "guard page protection failed"),
        }
    }
}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::MemoryError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SchedError::UnknownThread(ThreadId::new(12));
        assert_eq!(format!("{}", e), "no thread with id 12");

        let e = SchedError::MemoryError(MemoryError::AllocationFailed);
        assert_eq!(format!("{}", e), "memory error: stack allocation failed");
    }

    #[test]
    fn test_error_conversion() {
        let sched_err: SchedError = MemoryError::ProtectionFailed.into();
        assert!(matches!(sched_err, SchedError::MemoryError(MemoryError::ProtectionFailed)));
        assert_eq!(sched_err.kind(), ErrorKind::Platform);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(SchedError::CapacityExceeded.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(
            SchedError::IllegalOperation("main thread").kind(),
            ErrorKind::IllegalOperation
        );
        assert_eq!(SchedError::NotInitialized.kind(), ErrorKind::Lifecycle);
    }
}
