//! Thread table: identity -> thread record
//!
//! A fixed array of slots indexed by identity. The table owns every record;
//! removing a record hands ownership (and with it the stack) to the caller.

use crate::id::ThreadId;
use crate::thread::Thread;

/// Owner of all live thread records
pub struct ThreadTable<S> {
    slots: Box<[Option<Thread<S>>]>,
    live: usize,
}

impl<S> ThreadTable<S> {
    /// Create a table with one slot per identity
    pub fn new(max_threads: usize) -> Self {
        Self {
            slots: (0..max_threads).map(|_| None).collect(),
            live: 0,
        }
    }

    /// Store a record in its identity's slot
    pub fn insert(&mut self, thread: Thread<S>) {
        let idx = thread.id().as_usize();
        debug_assert!(self.slots[idx].is_none(), "slot {} already occupied", idx);
        if self.slots[idx].replace(thread).is_none() {
            self.live += 1;
        }
    }

    /// Remove and return a record
    pub fn remove(&mut self, id: ThreadId) -> Option<Thread<S>> {
        let removed = self.slots.get_mut(id.as_usize())?.take();
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> Option<&Thread<S>> {
        self.slots.get(id.as_usize())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Thread<S>> {
        self.slots.get_mut(id.as_usize())?.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live records
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate live records in identity order
    pub fn iter(&self) -> impl Iterator<Item = &Thread<S>> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Remove every record except `keep`, returning them
    pub fn drain_except(&mut self, keep: ThreadId) -> Vec<Thread<S>> {
        let mut drained = Vec::with_capacity(self.live);
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx != keep.as_usize() {
                if let Some(thread) = slot.take() {
                    drained.push(thread);
                }
            }
        }
        self.live -= drained.len();
        drained
    }
}
