//! Thread record
//!
//! Per-thread bookkeeping. The record is generic over the stack handle so
//! the core stays free of any memory mapping code: the runtime plugs in its
//! mmap-backed stack, tests plug in `()`.

use core::fmt;
use crate::id::ThreadId;
use crate::state::ThreadState;

/// Boxed entry closure of a spawned thread
///
/// Called once. It is `FnMut` rather than `FnOnce` so the caller keeps the
/// box after the call and decides where it is freed.
pub type Entry = Box<dyn FnMut() + 'static>;

/// One logical thread
pub struct Thread<S> {
    id: ThreadId,
    state: ThreadState,

    /// Owned stack; `None` for the main thread
    stack: Option<S>,

    /// Entry closure, taken on first run
    entry: Option<Entry>,

    /// Quanta in which this thread was the running thread
    quantums: u64,

    /// Quantum starts left before the sleep timer runs out
    sleep_remaining: u32,
}

impl<S> Thread<S> {
    /// The main thread record: already running, no stack of its own
    pub fn main() -> Self {
        Self {
            id: ThreadId::MAIN,
            state: ThreadState::Running,
            stack: None,
            entry: None,
            quantums: 1,
            sleep_remaining: 0,
        }
    }

    /// A freshly spawned thread, ready but never run
    pub fn spawned(id: ThreadId, stack: S, entry: Entry) -> Self {
        Self {
            id,
            state: ThreadState::Ready,
            stack: Some(stack),
            entry: Some(entry),
            quantums: 0,
            sleep_remaining: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    #[inline]
    pub fn quantums(&self) -> u64 {
        self.quantums
    }

    /// Transition into `Running`, counting the new quantum
    #[inline]
    pub fn start_quantum(&mut self) {
        self.state = ThreadState::Running;
        self.quantums += 1;
    }

    #[inline]
    pub fn sleep_remaining(&self) -> u32 {
        self.sleep_remaining
    }

    #[inline]
    pub fn set_sleep_remaining(&mut self, quanta: u32) {
        self.sleep_remaining = quanta;
    }

    /// Count one quantum start off the sleep timer; `true` once it has run out
    #[inline]
    pub fn tick_sleep(&mut self) -> bool {
        self.sleep_remaining = self.sleep_remaining.saturating_sub(1);
        self.sleep_remaining == 0
    }

    pub fn stack(&self) -> Option<&S> {
        self.stack.as_ref()
    }

    /// Take the entry closure; `None` after the first call
    pub fn take_entry(&mut self) -> Option<Entry> {
        self.entry.take()
    }
}

impl<S> fmt::Debug for Thread<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("quantums", &self.quantums)
            .field("sleep_remaining", &self.sleep_remaining)
            .field("has_stack", &self.stack.is_some())
            .finish()
    }
}
