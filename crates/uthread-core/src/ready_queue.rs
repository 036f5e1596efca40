//! FIFO ready queue
//!
//! Capacity is reserved up front for every possible identity so that pushes
//! made from the preemption handler never allocate.

use std::collections::VecDeque;
use crate::id::ThreadId;

/// First-in first-out queue of threads waiting for a quantum
pub struct ReadyQueue {
    queue: VecDeque<ThreadId>,
}

impl ReadyQueue {
    /// Create a queue able to hold `capacity` threads without reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a thread at the tail
    #[inline]
    pub fn push_back(&mut self, id: ThreadId) {
        debug_assert!(!self.contains(id), "thread {} queued twice", id);
        self.queue.push_back(id);
    }

    /// Take the thread at the head
    #[inline]
    pub fn pop_front(&mut self) -> Option<ThreadId> {
        self.queue.pop_front()
    }

    /// Remove a thread from anywhere in the queue
    ///
    /// Returns `true` if the thread was queued.
    pub fn remove(&mut self, id: ThreadId) -> bool {
        match self.queue.iter().position(|&queued| queued == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Check if a thread is queued
    pub fn contains(&self, id: ThreadId) -> bool {
        self.queue.contains(&id)
    }

    /// Iterate head to tail
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.queue.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(q: &ReadyQueue) -> Vec<u32> {
        q.iter().map(|id| id.as_u32()).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut q = ReadyQueue::with_capacity(8);
        q.push_back(ThreadId::new(3));
        q.push_back(ThreadId::new(1));
        q.push_back(ThreadId::new(2));

        assert_eq!(q.pop_front(), Some(ThreadId::new(3)));
        assert_eq!(q.pop_front(), Some(ThreadId::new(1)));
        assert_eq!(q.pop_front(), Some(ThreadId::new(2)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn test_remove_middle() {
        let mut q = ReadyQueue::with_capacity(8);
        for i in 1..=4 {
            q.push_back(ThreadId::new(i));
        }

        assert!(q.remove(ThreadId::new(2)));
        assert!(!q.remove(ThreadId::new(2)));
        assert_eq!(ids(&q), vec![1, 3, 4]);
    }

    #[test]
    fn test_capacity_reserved() {
        let mut q = ReadyQueue::with_capacity(100);
        let before = q.queue.capacity();
        for i in 0..100 {
            q.push_back(ThreadId::new(i));
        }
        assert_eq!(q.queue.capacity(), before);
        assert_eq!(q.len(), 100);
    }
}
