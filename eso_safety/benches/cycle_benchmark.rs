//! Supervisory cycle benchmark.
//!
//! Measures one `cycle()` pass against the simulated board with every
//! channel enabled, in the healthy operating case and while a safety
//! input keeps the system stopped.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use eso_common::clock::ManualClock;
use eso_common::safety::{
    InputType, OutputType, SafetyInputConfig, SafetyOutputConfig, SafetySystemConfig,
};
use eso_hal::{SimHandle, SimulatedSafetyHal};
use eso_safety::SafetySupervisor;

type Sup = SafetySupervisor<SimulatedSafetyHal, ManualClock>;

fn fully_wired() -> (Sup, SimHandle, ManualClock) {
    let clock = ManualClock::new();
    let hal = SimulatedSafetyHal::new();
    let board = hal.handle();
    let mut sup = SafetySupervisor::new(hal, clock.clone());
    sup.init(SafetySystemConfig::default()).unwrap();
    for ch in 0..6u8 {
        sup.configure_input(
            ch,
            SafetyInputConfig::new(InputType::EmergencyStop, 2 * ch).dual(2 * ch + 1),
        )
        .unwrap();
    }
    for ch in 0..4u8 {
        sup.configure_output(
            ch,
            SafetyOutputConfig::new(OutputType::DoorLock, 20 + 2 * ch, 21 + 2 * ch),
        )
        .unwrap();
    }
    sup.cycle().unwrap();
    sup.exit_safety_mode().unwrap();
    for ch in 0..4u8 {
        sup.set_output(ch, true).unwrap();
    }
    (sup, board, clock)
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("supervisory_cycle");

    for (name, press) in [("operational", false), ("estop_held", true)] {
        let (mut sup, board, clock) = fully_wired();
        if press {
            // Hold the button through the debounce window.
            board.set_input(0, false);
            for _ in 0..2 {
                clock.advance(100);
                sup.cycle().unwrap();
            }
        }
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                clock.advance(1);
                black_box(sup.cycle().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_diagnostics(c: &mut Criterion) {
    let (mut sup, _board, _clock) = fully_wired();
    c.bench_function("run_diagnostics", |b| b.iter(|| black_box(sup.run_diagnostics())));
}

criterion_group!(benches, bench_cycle, bench_diagnostics);
criterion_main!(benches);
