//! Grid Update Benchmarks
//!
//! Benchmarks for the per-report hot path of the fusion core:
//! - Line rasterization
//! - IR ray updates on the occupancy grid
//! - Full report handling (pose re-projection + four rays)
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use samooh::core::rasterize_line;
use samooh::{FusionEngine, MapPoint, OccupancyGrid, RegistrationInit, SamoohConfig, SensorReport};

// ============================================================================
// Group 1: Rasterization
// ============================================================================

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");

    group.bench_function("short_diagonal", |b| {
        b.iter(|| rasterize_line(black_box(0), black_box(0), black_box(30), black_box(17)))
    });

    group.bench_function("long_steep", |b| {
        b.iter(|| rasterize_line(black_box(-5), black_box(-300), black_box(40), black_box(300)))
    });

    group.finish();
}

// ============================================================================
// Group 2: Ray Updates
// ============================================================================

fn bench_draw_ray(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_ray");

    // 360 rays around a robot, like a slow full turn of one IR sensor
    let targets: Vec<MapPoint> = (0..360)
        .map(|deg| {
            let rad = (deg as f64).to_radians();
            MapPoint::new((60.0 * rad.cos()) as i32, (60.0 * rad.sin()) as i32)
        })
        .collect();

    group.throughput(Throughput::Elements(targets.len() as u64));
    group.bench_function("fan_360_hits", |b| {
        let mut grid = OccupancyGrid::new(400, 200, 200);
        b.iter(|| {
            for target in &targets {
                black_box(grid.draw_ray(MapPoint::ORIGIN, *target, 80.0));
            }
            grid.drain_deltas()
        })
    });

    group.bench_function("fan_360_clipped", |b| {
        let mut grid = OccupancyGrid::new(400, 200, 200);
        b.iter(|| {
            for target in &targets {
                black_box(grid.draw_ray(MapPoint::ORIGIN, *target, 40.0));
            }
            grid.drain_deltas()
        })
    });

    group.finish();
}

// ============================================================================
// Group 3: Report Handling
// ============================================================================

fn bench_handle_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_report");

    let config = SamoohConfig::default();
    let mut engine = FusionEngine::new(&config);
    engine
        .handle_registration(&RegistrationInit {
            id: 1,
            x: 10,
            y: -20,
            theta: 30,
        })
        .expect("registration");

    let ir = [(400, 0), (-250, 0), (0, 300), (0, -1000)];
    let mut step = 0;

    group.bench_function("four_ir_rays", |b| {
        b.iter(|| {
            step = (step + 7) % 2000;
            let report = SensorReport::new(1, step, step / 3, step % 360, ir);
            black_box(engine.handle_report(black_box(&report)))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_rasterize, bench_draw_ray, bench_handle_report);
criterion_main!(benches);
