use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use wrapfield::game::constants::timing;
use wrapfield::game::performance::FrameMonitor;
use wrapfield::game::spatial::SpatialGridStats;
use wrapfield::game::systems::motion;
use wrapfield::{
    EngineConfig, FrameStats, GameObject, ObjectId, ObjectKind, TagSet, Vec2, Velocity, World,
    WorldError,
};

/// Attempts at finding a clear spot before spawning anyway
const SPAWN_ATTEMPTS: usize = 32;
/// Frames between ship shots
const FIRE_INTERVAL: u64 = 12;
/// Frames between alien passes
const ALIEN_INTERVAL: u64 = 240;

#[derive(Debug, Default)]
struct Score {
    asteroids_destroyed: usize,
    ship_hits: usize,
    aliens_destroyed: usize,
    /// Objects already handled this frame
    handled: HashSet<ObjectId, FxBuildHasher>,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    frames: u64,
    playfield: Vec2,
    grid: SpatialGridStats,
    totals: FrameStats,
    asteroids_destroyed: usize,
    ship_hits: usize,
    aliens_destroyed: usize,
    live_objects: HashMap<ObjectKind, usize, FxBuildHasher>,
    objects_on_seams: usize,
    average_tick_micros: u128,
    p95_tick_micros: u128,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Wrapfield demo v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = EngineConfig::load_or_default();
    config.validate()?;
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(
        "Configuration loaded: {}x{} playfield, cell {}, {} frames, seed {}",
        config.playfield_width, config.playfield_height, config.cell_size, config.frames, seed
    );

    let mut world = World::new(&config.world())?;
    let mut rng = StdRng::seed_from_u64(seed);

    let playfield = world.playfield();
    let ship = world.spawn(GameObject::new(ObjectKind::Ship, playfield * 0.5));
    spawn_asteroids(&mut world, &mut rng, config.asteroid_count, config.cell_size);

    let mut monitor = FrameMonitor::new(config.tick_rate);
    let mut totals = FrameStats::default();
    let mut score = Score::default();

    for frame in 0..config.frames {
        if frame % FIRE_INTERVAL == 0 {
            steer_and_fire(&mut world, ship, &mut rng);
        }
        if frame % ALIEN_INTERVAL == ALIEN_INTERVAL / 2 {
            spawn_alien(&mut world, &mut rng);
        }
        if !world.is_visible(ship) && world.is_clear_for(ship) {
            world.set_visible(ship, true)?;
            info!("Ship back in play at frame {}", frame);
        }

        let shed_effects = monitor.load().should_shed_effects();
        let mut handler = |world: &mut World, this: ObjectId, other: ObjectId| {
            on_collision(world, &mut score, shed_effects, this, other);
        };

        monitor.tick_start();
        let stats = world.tick(timing::NOMINAL_DELTA, &mut handler);
        monitor.tick_end(world.visible_count());
        score.handled.clear();
        totals.accumulate(&stats);

        if cfg!(debug_assertions) {
            if let Err(e) = world.check_invariants() {
                warn!("Grid invariant broken at frame {}: {}", frame, e);
            }
        }

        if frame % u64::from(config.tick_rate) == 0 {
            let grid_stats = world.grid().stats();
            info!(
                "frame {}: {} objects, {} relocations, {} collisions, {} busy cells (max {}) | {}",
                world.frame(),
                world.visible_count(),
                stats.relocations,
                stats.collisions,
                grid_stats.non_empty_cells,
                grid_stats.max_per_cell,
                monitor.status_message()
            );
        }
    }

    let snapshot = world.snapshot();
    let summary = Summary {
        seed,
        frames: world.frame(),
        playfield,
        grid: world.grid().stats(),
        totals,
        asteroids_destroyed: score.asteroids_destroyed,
        ship_hits: score.ship_hits,
        aliens_destroyed: score.aliens_destroyed,
        live_objects: world.kind_counts(),
        objects_on_seams: snapshot.objects.iter().filter(|o| !o.ghosts.is_empty()).count(),
        average_tick_micros: monitor.average_tick_duration().as_micros(),
        p95_tick_micros: monitor.p95_tick_duration().as_micros(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn spawn_asteroids(world: &mut World, rng: &mut StdRng, count: usize, cell_size: f32) {
    let playfield = world.playfield();
    let keep_away = TagSet::of(&[ObjectKind::Ship, ObjectKind::Asteroid]);
    // Largest rock still fits a cell
    let max_scale = (cell_size / (2.0 * ObjectKind::Asteroid.default_shape().bounding_radius()))
        .clamp(0.5, 2.5);

    for _ in 0..count {
        let mut position = random_position(rng, playfield);
        for _ in 0..SPAWN_ATTEMPTS {
            if world.is_clear(position, keep_away) {
                break;
            }
            position = random_position(rng, playfield);
        }
        let velocity = Velocity::new(
            rng.gen_range(-1.5..1.5),
            rng.gen_range(-1.5..1.5),
            rng.gen_range(-3.0..3.0),
        );
        world.spawn(
            GameObject::new(ObjectKind::Asteroid, position)
                .with_velocity(velocity)
                .with_rotation(rng.gen_range(0.0..360.0))
                .with_scale(rng.gen_range(0.5..=max_scale)),
        );
    }
}

fn steer_and_fire(world: &mut World, ship: ObjectId, rng: &mut StdRng) {
    let Some(obj) = world.get_mut(ship) else {
        return;
    };
    if !obj.is_visible() {
        return;
    }
    obj.rotation = (obj.rotation + rng.gen_range(-40.0..40.0)).rem_euclid(360.0);

    // The hull points along local -y
    let heading = motion::heading(obj.rotation - 90.0);
    let muzzle = obj.position + heading * 12.0;
    let velocity = obj.velocity.linear() + heading * 8.0;
    world.spawn(
        GameObject::new(ObjectKind::Bullet, muzzle)
            .with_velocity(Velocity::new(velocity.x, velocity.y, 0.0)),
    );
}

fn spawn_alien(world: &mut World, rng: &mut StdRng) {
    let playfield = world.playfield();
    let from_left = rng.gen_bool(0.5);
    let (x, vx) = if from_left { (0.0, 2.0) } else { (playfield.x, -2.0) };
    let y = rng.gen_range(0.0..playfield.y);
    let alien = world.spawn(
        GameObject::new(ObjectKind::Alien, Vec2::new(x, y))
            .with_velocity(Velocity::new(vx, rng.gen_range(-0.5..0.5), 0.0)),
    );
    debug!("Alien {} entering at ({:.0}, {:.0})", alien, x, y);
}

fn on_collision(
    world: &mut World,
    score: &mut Score,
    shed_effects: bool,
    this: ObjectId,
    other: ObjectId,
) {
    let (Some(this_kind), Some(other_kind)) = (
        world.get(this).map(GameObject::kind),
        world.get(other).map(GameObject::kind),
    ) else {
        return;
    };
    if !score.handled.insert(this) {
        return;
    }

    let result = match this_kind {
        ObjectKind::Asteroid => {
            score.asteroids_destroyed += 1;
            explode(world, this, shed_effects)
        }
        ObjectKind::Bullet | ObjectKind::AlienBullet => world.despawn(this),
        ObjectKind::Alien => {
            score.aliens_destroyed += 1;
            explode(world, this, shed_effects)
        }
        ObjectKind::Ship => {
            score.ship_hits += 1;
            info!("Ship hit by {:?}", other_kind);
            world.set_visible(this, false)
        }
        ObjectKind::Pickup | ObjectKind::Effect => Ok(()),
    };
    if let Err(e) = result {
        warn!("Collision response for {} failed: {}", this, e);
    }
}

fn explode(world: &mut World, id: ObjectId, shed_effects: bool) -> Result<(), WorldError> {
    let position = match world.get(id) {
        Some(obj) => obj.position,
        None => return Err(WorldError::UnknownObject(id)),
    };
    world.despawn(id)?;
    if !shed_effects {
        world.spawn(GameObject::new(ObjectKind::Effect, position));
    }
    Ok(())
}

fn random_position(rng: &mut StdRng, playfield: Vec2) -> Vec2 {
    Vec2::new(rng.gen_range(0.0..playfield.x), rng.gen_range(0.0..playfield.y))
}
