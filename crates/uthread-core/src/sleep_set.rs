//! Sleep set
//!
//! Unordered set of sleeping threads. Membership is independent of the
//! blocked flag: a `SleepingAndBlocked` thread stays here until its timer
//! runs out. The per-thread countdown itself lives in the thread record.

use crate::id::ThreadId;

/// Threads currently counting down a sleep timer
pub struct SleepSet {
    members: Vec<ThreadId>,
}

impl SleepSet {
    /// Create a set able to hold `capacity` threads without reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
        }
    }

    /// Add a thread; inserting a member twice is a no-op
    pub fn insert(&mut self, id: ThreadId) {
        if !self.contains(id) {
            self.members.push(id);
        }
    }

    /// Remove a thread, returning whether it was a member
    pub fn remove(&mut self, id: ThreadId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(pos) => {
                self.members.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.members.contains(&id)
    }

    /// Visit every member; members for which `f` returns `false` are dropped
    ///
    /// Visit order is unspecified.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&ThreadId) -> bool,
    {
        self.members.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.members.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
