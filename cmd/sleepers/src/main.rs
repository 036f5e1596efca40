//! Sleep, block and resume walkthrough
//!
//! Spawns a few sleepers with different naps, blocks one of them mid-sleep
//! and shows it ending up `Blocked` rather than `Ready` once its timer runs
//! out, until main resumes it.
//!
//! # Environment Variables
//!
//! - `UTH_QUANTUM_USECS=<n>` - Quantum length (default 10000)
//! - `UTH_LOG_LEVEL=debug` - Log state transitions

use uthread::{
    block, current_id, init_with_config, kprintln, resume, sleep, spawn, state, terminate,
    total_quantums, SchedResult, SchedulerConfig, ThreadId, ThreadState,
};

fn sleeper(nap: i32) {
    let me = current_id();
    kprintln!("[{}] sleeping {} quanta at tick {}", me, nap, total_quantums());
    if let Err(e) = sleep(nap) {
        kprintln!("[{}] sleep failed: {}", me, e);
        return;
    }
    kprintln!("[{}] awake at tick {}", me, total_quantums());
}

fn wait_for(id: ThreadId, wanted: ThreadState) {
    while state(id).map_or(false, |s| s != wanted) {}
}

fn run() -> SchedResult<()> {
    init_with_config(SchedulerConfig::from_env())?;

    let naps = [2, 5, 8];
    let mut ids = Vec::new();
    for nap in naps {
        ids.push(spawn(move || sleeper(nap))?);
    }

    let target = ids[2];
    wait_for(target, ThreadState::Sleeping);
    block(target)?;
    kprintln!("[main] blocked {} while asleep: {}", target, state(target)?);

    wait_for(target, ThreadState::Blocked);
    kprintln!("[main] {}'s timer ran out: {}", target, state(target)?);

    resume(target)?;
    kprintln!("[main] resumed {}: {}", target, state(target)?);

    for id in ids {
        while state(id).is_ok() {}
    }
    kprintln!("[main] all sleepers done after {} quanta", total_quantums());
    Ok(())
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            kprintln!("sleepers: {}", e);
            1
        }
    };
    if code == 0 {
        let _ = terminate(ThreadId::MAIN);
    }
    std::process::exit(code);
}
