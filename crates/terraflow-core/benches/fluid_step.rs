//! Fluid stepper throughput benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use terraflow_core::simulation::{Fluids, Materials};
use terraflow_core::{EngineConfig, FluidStepper, TerrainGenerator, TerrainGrid};

fn bench_fluid_step(c: &mut Criterion) {
    let config = EngineConfig::default();
    let materials = Materials::new();
    let fluids = Fluids::new();

    let mut grid = TerrainGrid::new(128, 512.0).unwrap();
    TerrainGenerator::new(42).generate(&mut grid);
    // Wet the landscape so the flow and sediment stages have work to do
    for i in 0..grid.cell_count() {
        if i % 7 == 0 {
            grid.mutate_cell(
                i % 128,
                i / 128,
                &terraflow_core::CellDelta {
                    water: 1.0,
                    ..Default::default()
                },
            );
        }
    }

    let mut stepper = FluidStepper::new();
    c.bench_function("fluid_step_128", |b| {
        b.iter(|| {
            stepper.step(
                black_box(&mut grid),
                &materials,
                &fluids,
                &config,
                1.0 / 60.0,
            );
        })
    });
}

criterion_group!(benches, bench_fluid_step);
criterion_main!(benches);
