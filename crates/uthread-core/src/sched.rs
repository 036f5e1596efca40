//! Scheduler state machine
//!
//! `SchedCore` owns the thread table, identity allocator, ready queue, sleep
//! set and quantum counters, and applies every state transition. It never
//! switches stacks itself: [`SchedCore::tick`] returns a [`Switch`] telling
//! the runtime which continuation to save and which to restore.
//!
//! Callers must hold the preemption critical section for the whole of any
//! call into this type.

use crate::error::{SchedError, SchedResult};
use crate::id::ThreadId;
use crate::id_alloc::IdAllocator;
use crate::ready_queue::ReadyQueue;
use crate::sleep_set::SleepSet;
use crate::state::{Reason, ThreadState};
use crate::table::ThreadTable;
use crate::thread::{Entry, Thread};
use crate::{kdebug, ktrace};

/// Outcome of one dispatch tick
#[derive(Debug)]
pub struct Switch<S> {
    /// Thread that was running when the tick started
    pub from: ThreadId,

    /// Thread that runs next
    pub to: ThreadId,

    /// Record of `from` if it terminated itself. Its stack is still the
    /// active stack; the runtime must keep it alive until the switch is done.
    pub retired: Option<Thread<S>>,
}

impl<S> Switch<S> {
    /// The same thread keeps running; no continuation needs to change
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.retired.is_none() && self.from == self.to
    }
}

/// What the caller must do after [`SchedCore::block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Transition applied, caller keeps running
    Done,
    /// Caller blocked itself: dispatch with [`Reason::Blocked`]
    Dispatch,
}

/// What the caller must do after [`SchedCore::terminate`]
#[derive(Debug)]
pub enum TerminateOutcome<S> {
    /// Another thread was removed; dropping the record releases its stack
    Removed(Thread<S>),
    /// Caller terminated itself: dispatch with [`Reason::Terminated`]
    Dispatch,
    /// The main thread was named: the process must end
    ExitProcess,
}

/// The scheduler state machine
pub struct SchedCore<S> {
    table: ThreadTable<S>,
    ids: IdAllocator,
    ready: ReadyQueue,
    sleepers: SleepSet,

    /// The one `Running` thread
    current: ThreadId,

    /// Quanta started since init, including the current one
    total_quantums: u64,
}

impl<S> SchedCore<S> {
    /// Create the scheduler with the main thread already running
    ///
    /// Total quantum count starts at 1 (the main thread's first quantum).
    pub fn new(max_threads: usize) -> SchedResult<Self> {
        if max_threads == 0 {
            return Err(SchedError::InvalidArgument("max_threads must be at least 1"));
        }

        let mut ids = IdAllocator::new(max_threads);
        let main = ids.allocate()?;
        debug_assert!(main.is_main());

        let mut table = ThreadTable::new(max_threads);
        table.insert(Thread::main());

        Ok(Self {
            table,
            ids,
            ready: ReadyQueue::with_capacity(max_threads),
            sleepers: SleepSet::with_capacity(max_threads),
            current: ThreadId::MAIN,
            total_quantums: 1,
        })
    }

    /// Look up a live thread, or fail with `UnknownThread`
    fn live(&self, id: ThreadId) -> SchedResult<&Thread<S>> {
        if !self.ids.in_range(id) {
            return Err(SchedError::UnknownThread(id));
        }
        self.table.get(id).ok_or(SchedError::UnknownThread(id))
    }

    #[inline]
    pub fn current(&self) -> ThreadId {
        self.current
    }

    #[inline]
    pub fn total_quantums(&self) -> u64 {
        self.total_quantums
    }

    /// Quanta the thread has spent running
    pub fn quantums_of(&self, id: ThreadId) -> SchedResult<u64> {
        self.live(id).map(|t| t.quantums())
    }

    pub fn state_of(&self, id: ThreadId) -> SchedResult<ThreadState> {
        self.live(id).map(|t| t.state())
    }

    /// Borrow a live thread record
    pub fn thread(&self, id: ThreadId) -> Option<&Thread<S>> {
        self.table.get(id)
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn sleep_set(&self) -> &SleepSet {
        &self.sleepers
    }

    /// Number of live threads, main included
    pub fn live_threads(&self) -> usize {
        self.table.len()
    }

    pub fn capacity(&self) -> u32 {
        self.ids.capacity()
    }

    /// Create a thread in `Ready` at the tail of the ready queue
    ///
    /// The identity is claimed before `make_stack` runs and given back if the
    /// stack cannot be allocated.
    pub fn spawn<F>(&mut self, entry: Entry, make_stack: F) -> SchedResult<ThreadId>
    where
        F: FnOnce(ThreadId) -> SchedResult<S>,
    {
        let id = self.ids.allocate()?;
        let stack = match make_stack(id) {
            Ok(stack) => stack,
            Err(e) => {
                self.ids.release(id);
                return Err(e);
            }
        };

        self.table.insert(Thread::spawned(id, stack, entry));
        self.ready.push_back(id);
        kdebug!("spawned thread {} ({} live)", id, self.table.len());
        Ok(id)
    }

    /// Block a thread
    ///
    /// Blocking an already blocked thread is a no-op. Blocking the running
    /// thread only validates; the caller then dispatches.
    pub fn block(&mut self, id: ThreadId) -> SchedResult<BlockOutcome> {
        self.live(id)?;
        if id.is_main() {
            return Err(SchedError::IllegalOperation("the main thread cannot be blocked"));
        }
        if id == self.current {
            return Ok(BlockOutcome::Dispatch);
        }

        let Some(thread) = self.table.get_mut(id) else {
            return Err(SchedError::UnknownThread(id));
        };
        match thread.state() {
            ThreadState::Ready => {
                self.ready.remove(id);
                thread.set_state(ThreadState::Blocked);
            }
            ThreadState::Sleeping => thread.set_state(ThreadState::SleepingAndBlocked),
            _ => {}
        }
        kdebug!("blocked thread {} -> {}", id, thread.state());
        Ok(BlockOutcome::Done)
    }

    /// Resume a thread
    ///
    /// `Blocked` goes back to the tail of the ready queue,
    /// `SleepingAndBlocked` keeps sleeping. Anything else is a no-op.
    pub fn resume(&mut self, id: ThreadId) -> SchedResult<()> {
        self.live(id)?;
        let Some(thread) = self.table.get_mut(id) else {
            return Err(SchedError::UnknownThread(id));
        };
        match thread.state() {
            ThreadState::Blocked => {
                thread.set_state(ThreadState::Ready);
                self.ready.push_back(id);
            }
            ThreadState::SleepingAndBlocked => thread.set_state(ThreadState::Sleeping),
            _ => {}
        }
        kdebug!("resumed thread {} -> {}", id, thread.state());
        Ok(())
    }

    /// Put the running thread in the sleep set for `num_quantums` quantum starts
    ///
    /// The caller then dispatches with [`Reason::Sleeping`]. The quantum in
    /// which the call is made is not counted.
    pub fn begin_sleep(&mut self, num_quantums: i32) -> SchedResult<()> {
        if self.current.is_main() {
            return Err(SchedError::IllegalOperation("the main thread cannot sleep"));
        }
        if num_quantums < 0 {
            return Err(SchedError::InvalidArgument("sleep duration must not be negative"));
        }

        let id = self.current;
        let Some(thread) = self.table.get_mut(id) else {
            return Err(SchedError::UnknownThread(id));
        };
        thread.set_sleep_remaining(num_quantums as u32);
        self.sleepers.insert(id);
        kdebug!("thread {} sleeping for {} quanta", id, num_quantums);
        Ok(())
    }

    /// Terminate a thread
    pub fn terminate(&mut self, id: ThreadId) -> SchedResult<TerminateOutcome<S>> {
        self.live(id)?;
        if id.is_main() {
            return Ok(TerminateOutcome::ExitProcess);
        }
        if id == self.current {
            return Ok(TerminateOutcome::Dispatch);
        }

        self.ready.remove(id);
        self.sleepers.remove(id);
        let removed = self.table.remove(id).ok_or(SchedError::UnknownThread(id))?;
        self.ids.release(id);
        kdebug!("terminated thread {} ({} live)", id, self.table.len());
        Ok(TerminateOutcome::Removed(removed))
    }

    /// Run one dispatch tick
    ///
    /// 1. count this quantum start off every sleeper except the running thread
    /// 2. move the running thread out of `Running` according to `reason`
    /// 3. pick the ready-queue head (the main thread if the queue is empty)
    /// 4. start its quantum and bump the global counter
    pub fn tick(&mut self, reason: Reason) -> Switch<S> {
        let outgoing = self.current;

        self.advance_sleepers(outgoing);

        let mut retired = None;
        match reason {
            Reason::QuantumExpired => {
                if let Some(thread) = self.table.get_mut(outgoing) {
                    thread.set_state(ThreadState::Ready);
                }
                self.ready.push_back(outgoing);
            }
            Reason::Blocked => {
                if let Some(thread) = self.table.get_mut(outgoing) {
                    thread.set_state(ThreadState::Blocked);
                }
            }
            Reason::Sleeping => {
                debug_assert!(self.sleepers.contains(outgoing));
                if let Some(thread) = self.table.get_mut(outgoing) {
                    thread.set_state(ThreadState::Sleeping);
                }
            }
            Reason::Terminated => {
                debug_assert!(!outgoing.is_main(), "main thread retired through dispatch");
                self.ready.remove(outgoing);
                self.sleepers.remove(outgoing);
                retired = self.table.remove(outgoing);
                if let Some(thread) = retired.as_mut() {
                    thread.set_state(ThreadState::Terminated);
                }
                self.ids.release(outgoing);
            }
        }

        let next = self.ready.pop_front().unwrap_or(ThreadId::MAIN);
        if let Some(thread) = self.table.get_mut(next) {
            thread.start_quantum();
        }
        self.current = next;
        self.total_quantums += 1;

        ktrace!(
            "tick {}: {} -> {} ({:?}, {} ready, {} asleep)",
            self.total_quantums,
            outgoing,
            next,
            reason,
            self.ready.len(),
            self.sleepers.len()
        );

        Switch { from: outgoing, to: next, retired }
    }

    /// Count one quantum start off every sleeper except `running`
    fn advance_sleepers(&mut self, running: ThreadId) {
        let table = &mut self.table;
        let ready = &mut self.ready;

        self.sleepers.retain(|&id| {
            if id == running {
                return true;
            }
            let Some(thread) = table.get_mut(id) else {
                return false;
            };
            if !thread.tick_sleep() {
                return true;
            }
            match thread.state() {
                ThreadState::Sleeping => {
                    thread.set_state(ThreadState::Ready);
                    ready.push_back(id);
                }
                ThreadState::SleepingAndBlocked => thread.set_state(ThreadState::Blocked),
                _ => {}
            }
            false
        });
    }

    /// Take the running thread's entry closure (first run only)
    pub fn take_current_entry(&mut self) -> Option<Entry> {
        let id = self.current;
        self.table.get_mut(id).and_then(|t| t.take_entry())
    }

    /// Remove every thread but the running one, for process exit
    pub fn drain_for_exit(&mut self) -> Vec<Thread<S>> {
        let keep = self.current;
        let drained = self.table.drain_except(keep);
        for thread in &drained {
            self.ids.release(thread.id());
        }
        while self.ready.pop_front().is_some() {}
        self.sleepers.retain(|&id| id == keep);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(max: usize) -> SchedCore<()> {
        SchedCore::new(max).unwrap()
    }

    fn spawn(core: &mut SchedCore<()>) -> ThreadId {
        core.spawn(Box::new(|| {}), |_| Ok(())).unwrap()
    }

    fn tid(id: u32) -> ThreadId {
        ThreadId::new(id)
    }

    fn queue(core: &SchedCore<()>) -> Vec<u32> {
        core.ready_queue().iter().map(|id| id.as_u32()).collect()
    }

    /// Every structural invariant of the scheduler
    fn assert_invariants(core: &SchedCore<()>) {
        let running: Vec<_> = core
            .table
            .iter()
            .filter(|t| t.state() == ThreadState::Running)
            .map(|t| t.id())
            .collect();
        assert_eq!(running, vec![core.current()], "exactly one running thread");

        for t in core.table.iter() {
            assert_eq!(
                core.ready.contains(t.id()),
                t.state() == ThreadState::Ready,
                "ready queue membership of {}",
                t.id()
            );
            if t.id() != core.current() {
                assert_eq!(
                    core.sleepers.contains(t.id()),
                    t.state().is_sleeping(),
                    "sleep set membership of {}",
                    t.id()
                );
            }
            assert!(core.ids.is_in_use(t.id()));
        }
        assert!(core.table.contains(ThreadId::MAIN));
        assert_eq!(core.ids.in_use() as usize, core.table.len());
    }

    #[test]
    fn test_new_core() {
        let core = core(100);
        assert_eq!(core.current(), ThreadId::MAIN);
        assert_eq!(core.total_quantums(), 1);
        assert_eq!(core.quantums_of(ThreadId::MAIN), Ok(1));
        assert_eq!(core.state_of(ThreadId::MAIN), Ok(ThreadState::Running));
        assert!(SchedCore::<()>::new(0).is_err());
        assert_invariants(&core);
    }

    #[test]
    fn test_spawn_lowest_free_and_capacity() {
        let mut core = core(100);
        for i in 1..100 {
            assert_eq!(spawn(&mut core), tid(i));
        }
        let full = core.spawn(Box::new(|| {}), |_| Ok(()));
        assert_eq!(full, Err(SchedError::CapacityExceeded));

        assert!(matches!(core.terminate(tid(42)), Ok(TerminateOutcome::Removed(_))));
        assert!(matches!(core.terminate(tid(7)), Ok(TerminateOutcome::Removed(_))));
        assert_eq!(spawn(&mut core), tid(7));
        assert_eq!(spawn(&mut core), tid(42));
        assert_invariants(&core);
    }

    #[test]
    fn test_spawn_stack_failure_releases_id() {
        let mut core = core(4);
        let err = core.spawn(Box::new(|| {}), |_| {
            Err(SchedError::MemoryError(crate::error::MemoryError::AllocationFailed))
        });
        assert!(matches!(err, Err(SchedError::MemoryError(_))));
        assert_eq!(core.live_threads(), 1);
        assert_eq!(spawn(&mut core), tid(1));
    }

    #[test]
    fn test_spawned_thread_has_no_quanta_until_run() {
        let mut core = core(8);
        let a = spawn(&mut core);
        assert_eq!(core.quantums_of(a), Ok(0));
        assert_eq!(core.state_of(a), Ok(ThreadState::Ready));

        let sw = core.tick(Reason::QuantumExpired);
        assert_eq!((sw.from, sw.to), (ThreadId::MAIN, a));
        assert_eq!(core.quantums_of(a), Ok(1));
        assert_eq!(core.quantums_of(ThreadId::MAIN), Ok(1));
        assert_eq!(core.total_quantums(), 2);
        assert_invariants(&core);
    }

    #[test]
    fn test_round_robin_rotation() {
        let mut core = core(8);
        let a = spawn(&mut core);
        let b = spawn(&mut core);

        let order: Vec<u32> = (0..6)
            .map(|_| core.tick(Reason::QuantumExpired).to.as_u32())
            .collect();
        assert_eq!(order, vec![1, 2, 0, 1, 2, 0]);
        assert_eq!(core.quantums_of(a), Ok(2));
        assert_eq!(core.quantums_of(b), Ok(2));
        assert_eq!(core.quantums_of(ThreadId::MAIN), Ok(3));
        assert_eq!(core.total_quantums(), 7);
        assert_invariants(&core);
    }

    #[test]
    fn test_lone_main_keeps_running() {
        let mut core = core(8);
        let sw = core.tick(Reason::QuantumExpired);
        assert!(sw.is_noop());
        assert_eq!(core.quantums_of(ThreadId::MAIN), Ok(2));
        assert_eq!(core.total_quantums(), 2);
    }

    #[test]
    fn test_main_cannot_block_or_sleep() {
        let mut core = core(8);
        assert!(matches!(
            core.block(ThreadId::MAIN),
            Err(SchedError::IllegalOperation(_))
        ));
        assert!(matches!(core.begin_sleep(3), Err(SchedError::IllegalOperation(_))));
        assert_invariants(&core);
    }

    #[test]
    fn test_unknown_thread_errors() {
        let mut core = core(8);
        for id in [tid(3), tid(8), tid(1000)] {
            assert_eq!(core.block(id), Err(SchedError::UnknownThread(id)));
            assert_eq!(core.resume(id), Err(SchedError::UnknownThread(id)));
            assert_eq!(core.quantums_of(id), Err(SchedError::UnknownThread(id)));
            assert!(matches!(core.terminate(id), Err(SchedError::UnknownThread(_))));
        }
    }

    #[test]
    fn test_block_resume_round_trip() {
        let mut core = core(8);
        let a = spawn(&mut core);
        let b = spawn(&mut core);
        let c = spawn(&mut core);

        assert_eq!(core.block(a), Ok(BlockOutcome::Done));
        assert_eq!(core.state_of(a), Ok(ThreadState::Blocked));
        assert_eq!(queue(&core), vec![b.as_u32(), c.as_u32()]);

        // Second block is a no-op
        assert_eq!(core.block(a), Ok(BlockOutcome::Done));
        assert_eq!(core.state_of(a), Ok(ThreadState::Blocked));

        core.resume(a).unwrap();
        assert_eq!(core.state_of(a), Ok(ThreadState::Ready));
        assert_eq!(queue(&core), vec![b.as_u32(), c.as_u32(), a.as_u32()]);
        assert_eq!(core.quantums_of(a), Ok(0));
        assert_invariants(&core);
    }

    #[test]
    fn test_resume_is_noop_for_ready_and_running() {
        let mut core = core(8);
        let a = spawn(&mut core);
        let b = spawn(&mut core);

        core.resume(a).unwrap();
        core.resume(ThreadId::MAIN).unwrap();
        assert_eq!(queue(&core), vec![a.as_u32(), b.as_u32()]);
        assert_eq!(core.state_of(ThreadId::MAIN), Ok(ThreadState::Running));
        assert_invariants(&core);
    }

    #[test]
    fn test_block_self_then_dispatch() {
        let mut core = core(8);
        let a = spawn(&mut core);
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.current(), a);

        assert_eq!(core.block(a), Ok(BlockOutcome::Dispatch));
        // Nothing changed until the dispatch runs
        assert_eq!(core.state_of(a), Ok(ThreadState::Running));

        let sw = core.tick(Reason::Blocked);
        assert_eq!((sw.from, sw.to), (a, ThreadId::MAIN));
        assert_eq!(core.state_of(a), Ok(ThreadState::Blocked));
        assert!(!core.ready_queue().contains(a));
        assert_invariants(&core);

        // Stays off the queue until resumed
        for _ in 0..5 {
            assert_eq!(core.tick(Reason::QuantumExpired).to, ThreadId::MAIN);
        }
        core.resume(a).unwrap();
        assert_eq!(core.tick(Reason::QuantumExpired).to, a);
        assert_eq!(core.quantums_of(a), Ok(2));
        assert_invariants(&core);
    }

    /// Dispatch until `target` is running
    fn run_until(core: &mut SchedCore<()>, target: ThreadId) {
        for _ in 0..core.capacity() * 2 {
            if core.current() == target {
                return;
            }
            core.tick(Reason::QuantumExpired);
        }
        panic!("thread {} never scheduled", target);
    }

    #[test]
    fn test_sleep_counts_exactly_n_later_quanta() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);
        let slept_at = core.total_quantums();

        core.begin_sleep(3).unwrap();
        let sw = core.tick(Reason::Sleeping);
        assert_eq!(sw.to, ThreadId::MAIN);
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));
        assert!(core.sleep_set().contains(a));
        assert_invariants(&core);

        // The quantum started by the sleep call itself is not counted, so
        // starts slept_at+2 and slept_at+3 leave it asleep
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));

        // The third counted quantum start wakes and runs it
        let sw = core.tick(Reason::QuantumExpired);
        assert_eq!(core.total_quantums(), slept_at + 4);
        assert_eq!(sw.to, a);
        assert!(!core.sleep_set().contains(a));
        assert_invariants(&core);
    }

    #[test]
    fn test_sleep_zero_wakes_next_tick() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);

        core.begin_sleep(0).unwrap();
        core.tick(Reason::Sleeping);
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));

        core.tick(Reason::QuantumExpired);
        assert_eq!(core.current(), a);
        assert_invariants(&core);
    }

    #[test]
    fn test_negative_sleep_rejected() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);

        assert!(matches!(core.begin_sleep(-1), Err(SchedError::InvalidArgument(_))));
        assert!(!core.sleep_set().contains(a));
        assert_invariants(&core);
    }

    #[test]
    fn test_block_while_sleeping_expires_to_blocked() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);

        core.begin_sleep(2).unwrap();
        core.tick(Reason::Sleeping);

        core.block(a).unwrap();
        assert_eq!(core.state_of(a), Ok(ThreadState::SleepingAndBlocked));
        assert!(core.sleep_set().contains(a));
        assert_invariants(&core);

        core.tick(Reason::QuantumExpired);
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.state_of(a), Ok(ThreadState::Blocked));
        assert!(!core.sleep_set().contains(a));
        assert!(!core.ready_queue().contains(a));
        assert_invariants(&core);

        for _ in 0..4 {
            assert_ne!(core.tick(Reason::QuantumExpired).to, a);
        }
        core.resume(a).unwrap();
        assert_eq!(core.state_of(a), Ok(ThreadState::Ready));
        assert_invariants(&core);
    }

    #[test]
    fn test_resume_while_sleeping_and_blocked_keeps_sleeping() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);

        core.begin_sleep(3).unwrap();
        core.tick(Reason::Sleeping);
        core.block(a).unwrap();

        core.resume(a).unwrap();
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));
        assert!(!core.ready_queue().contains(a));

        // Resume on a plain sleeper changes nothing
        core.resume(a).unwrap();
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));

        core.tick(Reason::QuantumExpired);
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.state_of(a), Ok(ThreadState::Sleeping));
        core.tick(Reason::QuantumExpired);
        assert_eq!(core.current(), a);
        assert_invariants(&core);
    }

    #[test]
    fn test_terminate_other_from_each_state() {
        let mut core = core(8);
        let ready = spawn(&mut core);
        let blocked = spawn(&mut core);
        let sleeper = spawn(&mut core);

        core.block(blocked).unwrap();
        run_until(&mut core, sleeper);
        core.begin_sleep(10).unwrap();
        core.tick(Reason::Sleeping);
        run_until(&mut core, ThreadId::MAIN);

        for id in [ready, blocked, sleeper] {
            match core.terminate(id) {
                Ok(TerminateOutcome::Removed(thread)) => assert_eq!(thread.id(), id),
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(core.state_of(id), Err(SchedError::UnknownThread(id)));
            assert_invariants(&core);
        }
        assert!(core.ready_queue().is_empty());
        assert!(core.sleep_set().is_empty());
        assert_eq!(core.live_threads(), 1);
    }

    #[test]
    fn test_terminate_self_retires_record() {
        let mut core = core(8);
        let a = spawn(&mut core);
        let b = spawn(&mut core);
        run_until(&mut core, a);

        assert!(matches!(core.terminate(a), Ok(TerminateOutcome::Dispatch)));
        let sw = core.tick(Reason::Terminated);
        assert_eq!(sw.from, a);
        assert_eq!(sw.to, b);
        assert!(!sw.is_noop());
        let retired = sw.retired.expect("retired record");
        assert_eq!(retired.state(), ThreadState::Terminated);

        assert_eq!(core.quantums_of(a), Err(SchedError::UnknownThread(a)));
        assert_eq!(spawn(&mut core), a);
        assert_invariants(&core);
    }

    #[test]
    fn test_terminate_main_requests_exit() {
        let mut core = core(8);
        spawn(&mut core);
        assert!(matches!(
            core.terminate(ThreadId::MAIN),
            Ok(TerminateOutcome::ExitProcess)
        ));
        assert_invariants(&core);
    }

    #[test]
    fn test_empty_queue_falls_back_to_main() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);

        // Main is the only other thread and it is queued; drain it to
        // exercise the fallback path.
        assert!(core.ready.remove(ThreadId::MAIN));
        let sw = core.tick(Reason::Blocked);
        assert_eq!(sw.to, ThreadId::MAIN);
    }

    #[test]
    fn test_simultaneous_wakeups_all_queued() {
        let mut core = core(8);
        let a = spawn(&mut core);
        let b = spawn(&mut core);

        run_until(&mut core, a);
        core.begin_sleep(2).unwrap();
        core.tick(Reason::Sleeping);
        run_until(&mut core, b);
        core.begin_sleep(1).unwrap();
        core.tick(Reason::Sleeping);

        // Both timers run out on the same quantum start; one of them runs
        // straight away, the other waits ahead of main
        core.tick(Reason::QuantumExpired);
        let mut woke = vec![core.current().as_u32()];
        woke.extend(queue(&core).into_iter().filter(|&id| id != 0));
        woke.sort();
        assert_eq!(woke, vec![a.as_u32(), b.as_u32()]);
        assert_eq!(queue(&core).last(), Some(&0));
        assert_invariants(&core);
    }

    #[test]
    fn test_take_entry_once() {
        let mut core = core(8);
        let a = spawn(&mut core);
        run_until(&mut core, a);
        assert!(core.take_current_entry().is_some());
        assert!(core.take_current_entry().is_none());
    }

    #[test]
    fn test_drain_for_exit() {
        let mut core = core(8);
        for _ in 0..4 {
            spawn(&mut core);
        }
        let drained = core.drain_for_exit();
        assert_eq!(drained.len(), 4);
        assert_eq!(core.live_threads(), 1);
        assert!(core.ready_queue().is_empty());
    }
}
