//! Two threads alternately increment a shared counter
//!
//! Each increment needs a context switch, so with a 1000us quantum the count
//! to 1000 takes about one second.
//!
//! # Usage
//!
//! ```text
//! count-together [QUANTUM_USECS] [TARGET]
//! ```
//!
//! # Environment Variables
//!
//! - `UTH_LOG_LEVEL=trace` - Log every dispatch
//! - `UTH_CLOCK=virtual` - Preempt on process CPU time instead of wall-clock time

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use uthread::{init, kprintln, quantums_of, spawn, state, terminate, total_quantums, ThreadId};

static COUNTER: AtomicU64 = AtomicU64::new(0);
static TARGET: AtomicU64 = AtomicU64::new(1_000);

fn take_turns(parity: u64) {
    let target = TARGET.load(Ordering::Relaxed);
    loop {
        let c = COUNTER.load(Ordering::SeqCst);
        if c >= target {
            return;
        }
        if c % 2 == parity {
            COUNTER.store(c + 1, Ordering::SeqCst);
            if (c + 1) % 100 == 0 {
                kprintln!("[{}] counter = {}", uthread::current_id(), c + 1);
            }
        }
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let quantum: i64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1_000);
    if let Some(target) = args.next().and_then(|a| a.parse().ok()) {
        TARGET.store(target, Ordering::Relaxed);
    }

    println!("=== uthread count-together ===");
    println!("quantum: {}us, target: {}", quantum, TARGET.load(Ordering::Relaxed));

    if let Err(e) = init(quantum) {
        eprintln!("init failed: {}", e);
        std::process::exit(1);
    }

    let started = Instant::now();
    let partner = match spawn(|| take_turns(1)) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("spawn failed: {}", e);
            std::process::exit(1);
        }
    };

    take_turns(0);
    while state(partner).is_ok() {}

    println!(
        "done in {:?}: {} total quanta, main ran {}",
        started.elapsed(),
        total_quantums(),
        quantums_of(ThreadId::MAIN).unwrap_or(0)
    );
    let _ = terminate(ThreadId::MAIN);
}
