//! Unix preemption: interval timer, handler installation, signal mask guard

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicUsize, Ordering};

use nix::sys::pthread::{pthread_kill, pthread_self};
use nix::sys::signal::{
    pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};
use uthread_core::error::{SchedError, SchedResult};
use uthread_core::{kdebug, kerror};

use crate::config::AlarmClock;

/// Signal number currently used for preemption
static PREEMPT_SIGNAL: AtomicI32 = AtomicI32::new(libc::SIGALRM);

/// Timer the alarm is armed on (`ITIMER_VIRTUAL` or `ITIMER_REAL`)
static TIMER_WHICH: AtomicI32 = AtomicI32::new(libc::ITIMER_REAL);

static QUANTUM_USECS: AtomicI64 = AtomicI64::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// OS thread that called `install`; the scheduler only runs there
static OWNER: AtomicUsize = AtomicUsize::new(0);

#[inline]
fn errno(e: nix::errno::Errno) -> SchedError {
    SchedError::PlatformError(e as i32)
}

impl AlarmClock {
    /// Signal the kernel raises when this clock's timer expires
    pub fn signal(self) -> Signal {
        match self {
            AlarmClock::Virtual => Signal::SIGVTALRM,
            AlarmClock::Real => Signal::SIGALRM,
        }
    }

    fn which(self) -> libc::c_int {
        match self {
            AlarmClock::Virtual => libc::ITIMER_VIRTUAL,
            AlarmClock::Real => libc::ITIMER_REAL,
        }
    }
}

/// Signal used for preemption
#[inline]
pub fn preempt_signal() -> Signal {
    match PREEMPT_SIGNAL.load(Ordering::Relaxed) {
        libc::SIGVTALRM => Signal::SIGVTALRM,
        _ => Signal::SIGALRM,
    }
}

fn preempt_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(preempt_signal());
    set
}

/// Whether the preemption signal is masked on the calling OS thread
pub fn preemption_blocked() -> SchedResult<bool> {
    let mut current = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).map_err(errno)?;
    Ok(current.contains(preempt_signal()))
}

/// Critical section: the preemption signal stays masked while this lives
///
/// Guards nest. Only the outermost guard (the one that actually changed the
/// mask) unmasks on drop. A guard taken inside the signal handler finds the
/// signal already masked and leaves the mask alone, so the kernel's
/// `sigreturn` restores it instead.
///
/// Not `Send`: a signal mask belongs to one OS thread.
#[must_use = "preemption is re-enabled as soon as the guard is dropped"]
pub struct PreemptGuard {
    was_blocked: bool,
    _not_send: PhantomData<*const ()>,
}

impl PreemptGuard {
    /// Mask the preemption signal
    pub fn acquire() -> SchedResult<Self> {
        let mut old = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&preempt_set()), Some(&mut old))
            .map_err(errno)?;
        Ok(Self {
            was_blocked: old.contains(preempt_signal()),
            _not_send: PhantomData,
        })
    }

    /// Adopt a mask set up by someone else, unmasking on drop
    ///
    /// Used by a thread on its first run: the thread that switched to it held
    /// the signal masked and will never release that on this stack.
    ///
    /// # Safety
    ///
    /// The preemption signal must currently be masked by a critical section
    /// nobody else will close.
    pub unsafe fn inherited() -> Self {
        Self {
            was_blocked: false,
            _not_send: PhantomData,
        }
    }

    /// Whether the signal was already masked when this guard was taken
    #[inline]
    pub fn was_blocked(&self) -> bool {
        self.was_blocked
    }
}

impl Drop for PreemptGuard {
    fn drop(&mut self) {
        if self.was_blocked {
            return;
        }
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&preempt_set()), None) {
            kerror!("failed to unmask preemption signal: {}", e);
            std::process::abort();
        }
    }
}

/// Install `handler` for the clock's signal and record the owning OS thread
///
/// Must run before the alarm is armed. One installation per process.
pub fn install(clock: AlarmClock, handler: extern "C" fn(libc::c_int)) -> SchedResult<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(SchedError::AlreadyInitialized);
    }

    PREEMPT_SIGNAL.store(clock.signal() as libc::c_int, Ordering::SeqCst);
    TIMER_WHICH.store(clock.which(), Ordering::SeqCst);
    OWNER.store(pthread_self() as usize, Ordering::SeqCst);

    let action = SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only touches scheduler state under the signal mask
    if let Err(e) = unsafe { sigaction(clock.signal(), &action) } {
        INSTALLED.store(false, Ordering::SeqCst);
        kerror!("sigaction({:?}) failed: {}", clock.signal(), e);
        return Err(errno(e));
    }
    kdebug!("preemption handler installed on {:?}", clock.signal());
    Ok(())
}

/// Undo [`install`]: restore the default disposition and allow a new install
///
/// Only valid while the alarm is not armed.
pub fn uninstall() {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: restoring the default disposition installs no code
    if let Err(e) = unsafe { sigaction(preempt_signal(), &action) } {
        kerror!("failed to restore {:?} disposition: {}", preempt_signal(), e);
    }
    OWNER.store(0, Ordering::SeqCst);
    INSTALLED.store(false, Ordering::SeqCst);
}

/// Whether the caller runs on the OS thread that owns the scheduler
#[inline]
pub fn on_owner_thread() -> bool {
    OWNER.load(Ordering::Relaxed) == pthread_self() as usize
}

/// Re-raise the preemption signal on the owning OS thread
///
/// Process-directed timer signals may land on any thread that does not mask
/// them.
pub fn forward_to_owner() -> SchedResult<()> {
    let owner = OWNER.load(Ordering::Relaxed) as libc::pthread_t;
    signal_thread(owner, Some(preempt_signal()))
}

/// `pthread_kill`; `None` only checks that the thread exists
fn signal_thread(thread: libc::pthread_t, sig: Option<Signal>) -> SchedResult<()> {
    pthread_kill(thread, sig).map_err(errno)
}

/// Split microseconds into a `timeval`
pub fn usecs_to_timeval(usecs: i64) -> libc::timeval {
    libc::timeval {
        tv_sec: (usecs / 1_000_000) as libc::time_t,
        tv_usec: (usecs % 1_000_000) as libc::suseconds_t,
    }
}

fn set_timer(usecs: i64) -> SchedResult<()> {
    let tv = usecs_to_timeval(usecs);
    let spec = libc::itimerval {
        it_interval: tv,
        it_value: tv,
    };
    let which = TIMER_WHICH.load(Ordering::Relaxed);
    // SAFETY: `spec` is a valid itimerval; the old value is not requested
    let ret = unsafe { libc::setitimer(which as _, &spec, std::ptr::null_mut()) };
    if ret != 0 {
        return Err(SchedError::PlatformError(
            std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        ));
    }
    Ok(())
}

/// Start the periodic alarm at `quantum_usecs`
pub fn arm(quantum_usecs: i64) -> SchedResult<()> {
    if quantum_usecs <= 0 {
        return Err(SchedError::InvalidArgument("quantum_usecs must be positive"));
    }
    QUANTUM_USECS.store(quantum_usecs, Ordering::SeqCst);
    set_timer(quantum_usecs)
}

/// Restart the current period from zero so the next thread gets a full quantum
///
/// Async-signal-safe. A no-op before the alarm was armed.
pub fn rearm() -> SchedResult<()> {
    match QUANTUM_USECS.load(Ordering::Relaxed) {
        q if q > 0 => set_timer(q),
        _ => Ok(()),
    }
}

/// Stop the alarm
pub fn disarm() -> SchedResult<()> {
    QUANTUM_USECS.store(0, Ordering::SeqCst);
    set_timer(0)
}
