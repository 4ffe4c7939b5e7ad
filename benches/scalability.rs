//! Scalability benchmarks for the wrapfield collision core
//!
//! Measures a full world tick, candidate gathering and raw grid relocation
//! at increasing object counts.
//!
//! Run with: cargo bench --bench scalability

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wrapfield::game::constants::timing::NOMINAL_DELTA;
use wrapfield::game::spatial::SpatialGrid;
use wrapfield::{GameObject, ObjectId, ObjectKind, Vec2, Velocity, World, WorldConfig};

const COUNTS: [usize; 5] = [100, 250, 500, 1000, 2000];

fn config() -> WorldConfig {
    WorldConfig {
        playfield_width: 1600.0,
        playfield_height: 1200.0,
        cell_size: 60.0,
    }
}

/// World with `count` drifting objects, 90% asteroids and 10% bullets
fn create_world(count: usize) -> World {
    let config = config();
    let mut world = World::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(count as u64);

    for i in 0..count {
        let position = Vec2::new(
            rng.gen_range(0.0..config.playfield_width),
            rng.gen_range(0.0..config.playfield_height),
        );
        let velocity = Velocity::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-4.0..4.0),
        );
        let kind = if i % 10 == 0 {
            ObjectKind::Bullet
        } else {
            ObjectKind::Asteroid
        };
        // Endless bullets so the population stays constant
        world.spawn(
            GameObject::new(kind, position)
                .with_velocity(velocity)
                .with_lifetime(None),
        );
    }
    world
}

fn noop(_: &mut World, _: ObjectId, _: ObjectId) {}

/// Benchmark a full tick at various object counts
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(50);

    for count in COUNTS {
        let mut world = create_world(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("full", count), &count, |b, _| {
            b.iter(|| black_box(world.tick(black_box(NOMINAL_DELTA), &mut noop)))
        });
    }
    group.finish();
}

/// Benchmark candidate gathering for every object
fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");
    group.sample_size(50);

    for count in COUNTS {
        let world = create_world(count);
        let ids: Vec<ObjectId> = world.ids().collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("3x3", count), &count, |b, _| {
            b.iter(|| {
                let mut total = 0;
                for &id in &ids {
                    total += world.candidates(id).len();
                }
                black_box(total)
            })
        });
    }
    group.finish();
}

/// Benchmark raw grid relocation with random jumps
fn bench_relocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    group.sample_size(50);

    for count in COUNTS {
        let config = config();
        let mut grid =
            SpatialGrid::new(config.playfield_width, config.playfield_height, config.cell_size)
                .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for slot in 0..count {
            let cell = rng.gen_range(0..grid.cell_count());
            grid.enter(cell, slot);
        }
        let cells = grid.cell_count();
        let moves: Vec<(usize, usize, usize)> = (0..count)
            .map(|slot| (slot, rng.gen_range(0..cells), rng.gen_range(0..cells)))
            .collect();
        let mut flip = false;

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("relocate", count), &count, |b, _| {
            b.iter(|| {
                flip = !flip;
                for &(slot, first, second) in &moves {
                    let cell = if flip { first } else { second };
                    black_box(grid.relocate(slot, cell));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick, bench_candidates, bench_relocation);

criterion_main!(benches);
