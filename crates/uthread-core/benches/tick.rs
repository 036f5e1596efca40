//! Dispatch tick throughput of the scheduler state machine

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use uthread_core::{Reason, SchedCore, ThreadId};

fn populated(threads: u32) -> SchedCore<()> {
    let mut core = SchedCore::new(threads as usize + 1).unwrap();
    for _ in 0..threads {
        core.spawn(Box::new(|| {}), |_| Ok(())).unwrap();
    }
    core
}

fn bench_round_robin(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_round_robin");
    for threads in [1u32, 10, 99] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &n| {
            let mut core = populated(n);
            b.iter(|| black_box(core.tick(Reason::QuantumExpired).to));
        });
    }
    group.finish();
}

fn bench_with_sleepers(c: &mut Criterion) {
    c.bench_function("tick_half_asleep", |b| {
        let mut core = populated(99);
        // Park every other thread on a long sleep
        for _ in 0..200 {
            let id = core.current();
            if !id.is_main() && id.as_u32() % 2 == 0 {
                core.begin_sleep(i32::MAX).unwrap();
                core.tick(Reason::Sleeping);
            } else {
                core.tick(Reason::QuantumExpired);
            }
        }
        b.iter(|| black_box(core.tick(Reason::QuantumExpired).to));
    });
}

fn bench_block_resume(c: &mut Criterion) {
    c.bench_function("block_resume_ready", |b| {
        let mut core = populated(50);
        let target = ThreadId::new(25);
        b.iter(|| {
            core.block(black_box(target)).unwrap();
            core.resume(black_box(target)).unwrap();
        });
    });
}

criterion_group!(benches, bench_round_robin, bench_with_sleepers, bench_block_resume);
criterion_main!(benches);
