//! Collision detection: candidate gathering, hit testing, edge bridging
//!
//! For each initiating object the 3x3 cell neighbourhood is the complete
//! candidate set. A candidate is hit when one of its transformed vertices
//! lies inside the initiator's outline (even-odd rule). Objects in a boundary
//! cell are tested again as ghosts shifted by the cell's wrap offset, so
//! objects straddling a seam meet their counterparts on the opposite edge.
//!
//! The test is asymmetric on purpose (points in polygon, not polygon
//! overlap). Thin or fast objects can tunnel; that is accepted.

use smallvec::SmallVec;
use tracing::trace;

use crate::game::object::{GameObject, ObjectId};
use crate::game::shape::{self, Outline};
use crate::game::spatial::WrapOffset;
use crate::game::world::{FrameStats, World};
use crate::util::vec2::Vec2;

/// Game-logic hook invoked on every confirmed overlap.
///
/// For a hit between A (initiator) and B the engine calls
/// `on_collision(world, B, A)` then `on_collision(world, A, B)`. The handler
/// may mutate or hide either object, or any other; the engine does not
/// retry the test within the frame.
pub trait CollisionHandler {
    fn on_collision(&mut self, world: &mut World, this: ObjectId, other: ObjectId);
}

impl<F> CollisionHandler for F
where
    F: FnMut(&mut World, ObjectId, ObjectId),
{
    fn on_collision(&mut self, world: &mut World, this: ObjectId, other: ObjectId) {
        self(world, this, other)
    }
}

/// Position offsets to test the object at: the real position first, then
/// each ghost its bridging flags and its cell's wrap offset allow
pub fn bridge_offsets(object: &GameObject, wrap: WrapOffset) -> SmallVec<[Vec2; 4]> {
    let mut offsets = SmallVec::new();
    offsets.push(Vec2::ZERO);

    let horizontal = wrap.horizontal.filter(|_| object.bridges_horizontal);
    let vertical = wrap.vertical.filter(|_| object.bridges_vertical);

    if let Some(dx) = horizontal {
        offsets.push(Vec2::new(dx, 0.0));
    }
    if let Some(dy) = vertical {
        offsets.push(Vec2::new(0.0, dy));
    }
    if let (Some(dx), Some(dy)) = (horizontal, vertical) {
        offsets.push(Vec2::new(dx, dy));
    }
    offsets
}

/// Run hit tests for one already-moved object and dispatch callbacks
pub fn check_object<H: CollisionHandler>(
    world: &mut World,
    id: ObjectId,
    handler: &mut H,
    stats: &mut FrameStats,
) {
    let Some(cell) = world.cell_of(id) else {
        return;
    };
    let wrap = world.grid().cell(cell).wrap;

    let offsets = match world.get(id) {
        Some(obj)
            if obj.is_visible()
                && !obj.collides_with.is_empty()
                && obj.shape().can_contain()
                && !obj.is_degenerate() =>
        {
            bridge_offsets(obj, wrap)
        }
        _ => return,
    };

    let candidates = world.candidates(id);
    if candidates.is_empty() {
        return;
    }
    stats.candidates_examined += candidates.len();

    // A pair fires once per frame even if several ghosts overlap it
    let mut fired: SmallVec<[ObjectId; 8]> = SmallVec::new();

    for (pass, offset) in offsets.into_iter().enumerate() {
        let outline: Outline = match world.get_mut(id) {
            Some(obj) if obj.is_visible() => {
                if pass == 0 {
                    Outline::from_slice(obj.transformed_points())
                } else {
                    obj.outline_at(offset)
                }
            }
            _ => return,
        };
        if pass > 0 {
            stats.bridged_passes += 1;
        }
        if shape::is_degenerate(&outline) {
            return;
        }

        for &other in &candidates {
            if fired.contains(&other) || !hits(world, id, other, &outline) {
                continue;
            }
            fired.push(other);
            stats.collisions += 1;
            trace!("Collision {} -> {} (pass {})", id, other, pass);

            handler.on_collision(world, other, id);
            handler.on_collision(world, id, other);

            if !world.is_visible(id) {
                return;
            }
        }
    }
}

/// Whether `other` has a vertex inside the initiator's `outline`
fn hits(world: &mut World, id: ObjectId, other: ObjectId, outline: &[Vec2]) -> bool {
    if other == id {
        return false;
    }
    let Some(collides_with) = world.get(id).map(|obj| obj.collides_with) else {
        return false;
    };
    let Some(target) = world.get_mut(other) else {
        return false;
    };
    if !target.is_visible() || !collides_with.contains(target.kind()) || target.is_degenerate() {
        return false;
    }
    shape::contains_any(outline, target.transformed_points())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::object::{ObjectKind, TagSet, Velocity};
    use crate::game::world::WorldConfig;

    fn world() -> World {
        World::new(&WorldConfig::default()).unwrap()
    }

    /// Records every callback as (this, other)
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(ObjectId, ObjectId)>,
    }

    impl CollisionHandler for Recorder {
        fn on_collision(&mut self, _world: &mut World, this: ObjectId, other: ObjectId) {
            self.calls.push((this, other));
        }
    }

    #[test]
    fn test_overlap_fires_both_directions_once() {
        let mut world = world();
        let ship = world.spawn(GameObject::new(ObjectKind::Ship, Vec2::new(300.0, 300.0)));
        let rock = world.spawn(
            GameObject::new(ObjectKind::Asteroid, Vec2::new(300.0, 295.0))
                .with_collides_with(TagSet::EMPTY),
        );

        let mut recorder = Recorder::default();
        let stats = world.tick(1.0, &mut recorder);

        assert_eq!(stats.collisions, 1);
        assert_eq!(recorder.calls, vec![(rock, ship), (ship, rock)]);
    }

    #[test]
    fn test_tag_filter() {
        let mut world = world();
        world.spawn(
            GameObject::new(ObjectKind::Ship, Vec2::new(300.0, 300.0))
                .with_collides_with(TagSet::of(&[ObjectKind::Alien])),
        );
        world.spawn(
            GameObject::new(ObjectKind::Asteroid, Vec2::new(300.0, 295.0))
                .with_collides_with(TagSet::EMPTY),
        );

        let mut recorder = Recorder::default();
        world.tick(1.0, &mut recorder);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_mutual_tags_fire_from_each_side() {
        let mut world = world();
        world.spawn(GameObject::new(ObjectKind::Ship, Vec2::new(300.0, 300.0)));
        world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(300.0, 298.0)));

        let mut recorder = Recorder::default();
        let stats = world.tick(1.0, &mut recorder);
        // Ship finds the rock's vertex inside it and the rock finds the ship's
        assert_eq!(stats.collisions, 2);
        assert_eq!(recorder.calls.len(), 4);
    }

    #[test]
    fn test_bullet_point_hits_asteroid() {
        let mut world = world();
        let rock = world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0)));
        let bullet = world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(201.0, 199.0)));

        let mut recorder = Recorder::default();
        world.tick(1.0, &mut recorder);
        assert_eq!(recorder.calls, vec![(bullet, rock), (rock, bullet)]);
    }

    #[test]
    fn test_point_shape_never_initiates() {
        let mut world = world();
        world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0)).with_collides_with(TagSet::EMPTY));
        world.spawn(
            GameObject::new(ObjectKind::Bullet, Vec2::new(200.0, 200.0))
                .with_collides_with(TagSet::of(&[ObjectKind::Asteroid])),
        );

        let mut recorder = Recorder::default();
        world.tick(1.0, &mut recorder);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_handler_hiding_third_object_skips_it() {
        let mut world = world();
        let rock = world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0)));
        // Spawned before `first`, so it sits behind it in the cell list
        let second = world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(199.0, 201.0)));
        let first = world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(201.0, 199.0)));

        let mut calls = Vec::new();
        let mut handler = |w: &mut World, this: ObjectId, other: ObjectId| {
            calls.push((this, other));
            // Whichever bullet hits first takes the other one out with it
            let bystander = if this == first { second } else { first };
            if this != rock {
                w.set_visible(bystander, false).unwrap();
            }
        };
        let stats = world.tick(1.0, &mut handler);

        assert_eq!(stats.collisions, 1);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_initiator_hidden_by_callback_stops() {
        let mut world = world();
        let rock = world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0)));
        world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(201.0, 199.0)));
        world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(199.0, 201.0)));

        let mut handler = |w: &mut World, this: ObjectId, _other: ObjectId| {
            if this == rock {
                w.set_visible(rock, false).unwrap();
            }
        };
        let stats = world.tick(1.0, &mut handler);
        assert_eq!(stats.collisions, 1);
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_scale_zero_neither_hits_nor_is_hit() {
        let mut world = world();
        world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0)).with_scale(0.0));
        world.spawn(GameObject::new(ObjectKind::Ship, Vec2::new(200.0, 200.0)));

        let mut recorder = Recorder::default();
        let stats = world.tick(1.0, &mut recorder);
        assert_eq!(stats.collisions, 0);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_non_finite_position_never_collides() {
        let mut world = world();
        world.spawn(
            GameObject::new(ObjectKind::Asteroid, Vec2::new(200.0, 200.0))
                .with_velocity(Velocity::new(f32::NAN, 0.0, 0.0)),
        );
        world.spawn(GameObject::new(ObjectKind::Ship, Vec2::new(200.0, 200.0)));

        let mut recorder = Recorder::default();
        world.tick(1.0, &mut recorder);
        assert!(recorder.calls.is_empty());
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_bridge_offsets() {
        let wrap = WrapOffset {
            horizontal: Some(800.0),
            vertical: Some(-600.0),
        };
        let rock = GameObject::new(ObjectKind::Asteroid, Vec2::ZERO);
        let offsets = bridge_offsets(&rock, wrap);
        assert_eq!(
            offsets.as_slice(),
            &[
                Vec2::ZERO,
                Vec2::new(800.0, 0.0),
                Vec2::new(0.0, -600.0),
                Vec2::new(800.0, -600.0)
            ]
        );

        let horizontal_only = rock.clone().with_bridging(true, false);
        assert_eq!(bridge_offsets(&horizontal_only, wrap).len(), 2);

        let bullet = GameObject::new(ObjectKind::Bullet, Vec2::ZERO);
        assert_eq!(bridge_offsets(&bullet, wrap).as_slice(), &[Vec2::ZERO]);

        assert_eq!(bridge_offsets(&rock, WrapOffset::default()).len(), 1);
    }

    #[test]
    fn test_pair_fires_once_across_ghost_passes() {
        // Tiny playfield: both objects sit in the single corner cell and the
        // ghosts overlap the target again
        let config = WorldConfig {
            playfield_width: 60.0,
            playfield_height: 60.0,
            cell_size: 60.0,
        };
        let mut world = World::new(&config).unwrap();
        world.spawn(GameObject::new(ObjectKind::Asteroid, Vec2::new(30.0, 30.0)).with_scale(4.0));
        world.spawn(GameObject::new(ObjectKind::Bullet, Vec2::new(31.0, 29.0)));

        let mut recorder = Recorder::default();
        let stats = world.tick(1.0, &mut recorder);
        assert_eq!(stats.collisions, 1);
        assert_eq!(stats.bridged_passes, 3);
        assert_eq!(recorder.calls.len(), 2);
    }
}
