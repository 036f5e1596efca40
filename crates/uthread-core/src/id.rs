//! Thread identifier type

use core::fmt;

/// Identifier of a logical thread
///
/// Identities are drawn from the fixed space `0..max_threads`. Identity 0
/// belongs to the main thread for the whole life of the process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    /// The main thread (runs on the process's original stack)
    pub const MAIN: ThreadId = ThreadId(0);

    /// Create a new ThreadId from a raw value
    #[inline]
    pub const fn new(id: u32) -> Self {
        ThreadId(id)
    }

    /// Get the raw u32 value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the main thread
    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ThreadId {
    #[inline]
    fn from(id: u32) -> Self {
        ThreadId(id)
    }
}

impl From<ThreadId> for u32 {
    #[inline]
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            write!(f, "ThreadId(main)")
        } else {
            write!(f, "ThreadId({})", self.0)
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
