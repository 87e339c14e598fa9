// Interrupt handler cost per tick for each engine

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tonegen_core::hal::mock::{MockIo, MockTimer};
use tonegen_core::test_utils::simulator::SIM_OUTPUT;
use tonegen_core::{FixedCountEngine, InterruptHandler, PhaseAccumulatorEngine, ReloadToggleEngine, SharedState};

const TICKS: u64 = 10_000;

fn isr_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("isr_ticks");
    group.throughput(Throughput::Elements(TICKS));

    group.bench_function("fixed_count", |b| {
        let mut state = SharedState::new();
        let (isr, _fg) = state.split();
        let mut engine = FixedCountEngine::<11_059>::new(isr);
        b.iter(|| {
            for _ in 0..TICKS {
                black_box(engine.tick());
            }
        })
    });

    group.bench_function("phase_accumulator", |b| {
        let mut state = SharedState::new();
        let (isr, fg) = state.split();
        fg.set_increment(black_box(11));
        let mut engine = PhaseAccumulatorEngine::new(isr, MockIo::new(), SIM_OUTPUT);
        b.iter(|| {
            for _ in 0..TICKS {
                engine.on_interrupt();
            }
            black_box(engine.io().bit(SIM_OUTPUT))
        })
    });

    group.bench_function("reload_toggle", |b| {
        let timer = MockTimer::new();
        let mut engine = ReloadToggleEngine::new(MockIo::new(), timer.ack(), SIM_OUTPUT);
        b.iter(|| {
            for _ in 0..TICKS {
                engine.on_interrupt();
            }
            black_box(engine.io().bit(SIM_OUTPUT))
        })
    });

    group.finish();
}

criterion_group!(benches, isr_throughput);
criterion_main!(benches);
