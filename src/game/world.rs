//! World context: object arena, spatial grid and the per-frame step
//!
//! Lifecycle is `World::new(config)` → repeated `tick(delta, handler)` → drop.
//! Objects live in a slot arena; iteration follows insertion order, and
//! despawned slots are only recycled in a post-pass after the frame so
//! callbacks never see the collection shrink underneath them.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::game::constants::grid::CANDIDATE_INLINE;
use crate::game::constants::{grid, playfield};
use crate::game::object::{GameObject, ObjectId, ObjectKind, TagSet};
use crate::game::shape::HitShape;
use crate::game::spatial::{CellIndex, GridError, Slot, SpatialGrid};
use crate::game::systems::collision::{self, CollisionHandler};
use crate::game::systems::motion;
use crate::util::vec2::Vec2;

/// Candidate buffer returned by neighbourhood queries
pub type Candidates = SmallVec<[ObjectId; CANDIDATE_INLINE]>;

/// Geometry the world is built for; fixed for the world's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub playfield_width: f32,
    pub playfield_height: f32,
    pub cell_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            playfield_width: playfield::WIDTH,
            playfield_height: playfield::HEIGHT,
            cell_size: grid::CELL_SIZE,
        }
    }
}

/// Errors from world lifecycle operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Unknown or despawned object {0}")]
    UnknownObject(ObjectId),
}

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Visible objects that were integrated
    pub objects_updated: usize,
    /// Objects that changed cell
    pub relocations: usize,
    /// Objects that died from lifetime or leaving the playfield
    pub expired: usize,
    /// Candidates gathered across all initiating objects
    pub candidates_examined: usize,
    /// Ghost passes run across the seams
    pub bridged_passes: usize,
    /// Confirmed overlaps (each fires two callbacks)
    pub collisions: usize,
}

impl FrameStats {
    pub fn accumulate(&mut self, other: &FrameStats) {
        self.objects_updated += other.objects_updated;
        self.relocations += other.relocations;
        self.expired += other.expired;
        self.candidates_examined += other.candidates_examined;
        self.bridged_passes += other.bridged_passes;
        self.collisions += other.collisions;
    }
}

/// Render extract for one visible object
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: Vec2,
    pub rotation: f32,
    pub scale: f32,
    pub outline: Vec<Vec2>,
    /// Wrapped copies to draw across the seams
    pub ghosts: Vec<Vec<Vec2>>,
}

/// Render extract for a whole frame
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub frame: u64,
    pub playfield: Vec2,
    pub objects: Vec<ObjectSnapshot>,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    object: Option<GameObject>,
    pending_despawn: bool,
}

/// The simulation context
pub struct World {
    config: WorldConfig,
    grid: SpatialGrid,
    entries: Vec<Entry>,
    free_slots: Vec<u32>,
    /// Live ids in insertion order
    order: Vec<ObjectId>,
    pending_despawn: Vec<ObjectId>,
    frame: u64,
    in_tick: bool,
}

impl World {
    pub fn new(config: &WorldConfig) -> Result<Self, WorldError> {
        let grid = SpatialGrid::new(
            config.playfield_width,
            config.playfield_height,
            config.cell_size,
        )?;
        Ok(Self {
            config: *config,
            grid,
            entries: Vec::new(),
            free_slots: Vec::new(),
            order: Vec::new(),
            pending_despawn: Vec::new(),
            frame: 0,
            in_tick: false,
        })
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    #[inline]
    pub fn playfield(&self) -> Vec2 {
        self.grid.playfield()
    }

    /// Frames completed so far
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of live objects, visible or not
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.iter().filter(|(_, obj)| obj.is_visible()).count()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register an object. Visible objects join the grid immediately.
    pub fn spawn(&mut self, object: GameObject) -> ObjectId {
        let id = match self.free_slots.pop() {
            Some(slot) => {
                let entry = &mut self.entries[slot as usize];
                entry.object = Some(object);
                entry.pending_despawn = false;
                ObjectId {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                let slot = self.entries.len() as u32;
                self.entries.push(Entry {
                    generation: 0,
                    object: Some(object),
                    pending_despawn: false,
                });
                ObjectId { slot, generation: 0 }
            }
        };

        let slot = id.slot();
        if let Some(obj) = self.entries[slot].object.as_ref() {
            debug!("Spawned {:?} {} at ({:.1}, {:.1})", obj.kind(), id, obj.position.x, obj.position.y);
            if obj.is_visible() {
                let cell = self.grid.cell_for(obj.position);
                self.grid.enter(cell, slot);
            }
        }
        self.order.push(id);
        id
    }

    /// Build an object of `kind` with an explicit shape and tag set, then spawn it
    pub fn spawn_with(
        &mut self,
        kind: ObjectKind,
        position: Vec2,
        shape: HitShape,
        collides_with: TagSet,
    ) -> ObjectId {
        self.spawn(
            GameObject::new(kind, position)
                .with_shape(shape)
                .with_collides_with(collides_with),
        )
    }

    /// The only way in or out of the engine. Hiding unlinks the object from
    /// its cell; showing links it into the cell under its position. Repeating
    /// either call is a no-op.
    /// Objects queued for despawn stay hidden; showing one is an error.
    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Result<(), WorldError> {
        if visible && self.is_pending_despawn(id) {
            return Err(WorldError::UnknownObject(id));
        }
        let position = match self.get(id) {
            Some(obj) if obj.is_visible() == visible => return Ok(()),
            Some(obj) => obj.position,
            None => return Err(WorldError::UnknownObject(id)),
        };

        if visible {
            let cell = self.grid.cell_for(position);
            self.grid.enter(cell, id.slot());
        } else {
            self.grid.remove(id.slot());
        }
        if let Some(obj) = self.object_at_mut(id.slot()) {
            obj.set_visible_flag(visible);
        }
        Ok(())
    }

    /// Hide the object and free its slot once the current frame is over
    /// Despawning an object already queued is a no-op.
    pub fn despawn(&mut self, id: ObjectId) -> Result<(), WorldError> {
        if self.is_pending_despawn(id) {
            return Ok(());
        }
        self.set_visible(id, false)?;
        let entry = &mut self.entries[id.slot()];
        if !entry.pending_despawn {
            entry.pending_despawn = true;
            self.pending_despawn.push(id);
            debug!("Despawn queued for {}", id);
        }
        if !self.in_tick {
            self.flush_despawned();
        }
        Ok(())
    }

    fn flush_despawned(&mut self) {
        if self.pending_despawn.is_empty() {
            return;
        }
        for id in self.pending_despawn.drain(..) {
            self.grid.remove(id.slot());
            let entry = &mut self.entries[id.slot()];
            entry.object = None;
            entry.pending_despawn = false;
            entry.generation = entry.generation.wrapping_add(1);
            self.free_slots.push(id.slot);
        }
        let entries = &self.entries;
        self.order
            .retain(|id| entries[id.slot()].generation == id.generation && entries[id.slot()].object.is_some());
    }

    fn is_pending_despawn(&self, id: ObjectId) -> bool {
        self.entries
            .get(id.slot())
            .is_some_and(|entry| entry.generation == id.generation && entry.pending_despawn)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.entries
            .get(id.slot())
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.object.as_ref())
    }

    /// Mutable access for game logic. Position changes are picked up by the
    /// grid on the next tick; visibility must go through [`World::set_visible`].
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.entries
            .get_mut(id.slot())
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.object.as_mut())
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(GameObject::is_visible)
    }

    /// Live objects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|obj| (id, obj)))
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().copied()
    }

    /// Cell currently holding the object
    pub fn cell_of(&self, id: ObjectId) -> Option<CellIndex> {
        self.get(id)?;
        self.grid.membership(id.slot())
    }

    /// Live object counts per kind
    pub fn kind_counts(&self) -> HashMap<ObjectKind, usize, FxBuildHasher> {
        let mut counts = HashMap::with_hasher(FxBuildHasher);
        for (_, obj) in self.iter() {
            *counts.entry(obj.kind()).or_insert(0) += 1;
        }
        counts
    }

    fn object_at_mut(&mut self, slot: Slot) -> Option<&mut GameObject> {
        self.entries.get_mut(slot).and_then(|entry| entry.object.as_mut())
    }

    fn id_at(&self, slot: Slot) -> ObjectId {
        ObjectId {
            slot: slot as u32,
            generation: self.entries[slot].generation,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Everything linked in the object's cell and its 8 neighbours, minus
    /// the object itself. Empty when the object is not in the grid.
    pub fn candidates(&self, id: ObjectId) -> Candidates {
        let mut out = Candidates::new();
        let Some(cell) = self.cell_of(id) else {
            return out;
        };
        for neighbor in self.grid.unique_neighborhood(cell) {
            for slot in self.grid.slots_in(neighbor) {
                if slot != id.slot() {
                    out.push(self.id_at(slot));
                }
            }
        }
        out
    }

    /// True when no visible object tagged in `tags` sits in the 3x3
    /// neighbourhood of `position`. Spawn logic uses this to find safe spots.
    pub fn is_clear(&self, position: Vec2, tags: TagSet) -> bool {
        if tags.is_empty() {
            return true;
        }
        let entries = &self.entries;
        let blocks = |slot: Slot| {
            entries[slot]
                .object
                .as_ref()
                .is_some_and(|obj| obj.is_visible() && tags.contains(obj.kind()))
        };
        let cell = self.grid.cell_for(position);
        self.grid
            .unique_neighborhood(cell)
            .into_iter()
            .all(|neighbor| self.grid.is_empty_by(neighbor, blocks))
    }

    /// [`World::is_clear`] around an object's own position and tags
    pub fn is_clear_for(&self, id: ObjectId) -> bool {
        match self.get(id) {
            Some(obj) => self.is_clear(obj.position, obj.collides_with),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Frame step
    // ------------------------------------------------------------------

    /// Advance every visible object by `delta` frames, in insertion order:
    /// integrate, relocate in the grid, hit-test against neighbours (and
    /// their ghosts across the seams) and dispatch collision callbacks.
    ///
    /// Objects spawned by callbacks start moving next tick; objects despawned
    /// by callbacks are dropped after this tick.
    pub fn tick<H: CollisionHandler>(&mut self, delta: f32, handler: &mut H) -> FrameStats {
        let delta = if delta.is_finite() {
            delta
        } else {
            warn!("Non-finite frame delta {}, treating as 0", delta);
            0.0
        };

        let mut stats = FrameStats::default();
        self.in_tick = true;

        let count = self.order.len();
        for index in 0..count {
            let id = self.order[index];
            self.update_object(id, delta, handler, &mut stats);
        }

        self.in_tick = false;
        self.flush_despawned();
        self.frame += 1;
        stats
    }

    fn update_object<H: CollisionHandler>(
        &mut self,
        id: ObjectId,
        delta: f32,
        handler: &mut H,
        stats: &mut FrameStats,
    ) {
        let playfield = self.playfield();
        let (outcome, position) = match self.get_mut(id) {
            Some(obj) if obj.is_visible() => (motion::step(obj, delta, playfield), obj.position),
            _ => return,
        };
        stats.objects_updated += 1;

        if !outcome.is_alive() {
            trace!("{} died: {:?}", id, outcome);
            stats.expired += 1;
            // The id was live a moment ago, so this cannot fail
            let _ = self.set_visible(id, false);
            return;
        }

        let cell = self.grid.cell_for(position);
        if self.grid.relocate(id.slot(), cell) {
            stats.relocations += 1;
        }

        collision::check_object(self, id, handler, stats);
    }

    // ------------------------------------------------------------------
    // Extraction and auditing
    // ------------------------------------------------------------------

    /// Outlines of every visible object plus the wrapped ghosts a renderer
    /// needs to draw objects straddling a seam
    pub fn snapshot(&mut self) -> WorldSnapshot {
        let mut objects = Vec::with_capacity(self.order.len());
        for index in 0..self.order.len() {
            let id = self.order[index];
            let wrap = match self.cell_of(id) {
                Some(cell) => self.grid.cell(cell).wrap,
                None => continue,
            };
            let Some(obj) = self.get_mut(id) else {
                continue;
            };
            let outline = obj.transformed_points().to_vec();
            let ghosts = collision::bridge_offsets(obj, wrap)
                .into_iter()
                .skip(1)
                .map(|offset| obj.outline_at(offset).to_vec())
                .collect();
            objects.push(ObjectSnapshot {
                id,
                kind: obj.kind(),
                position: obj.position,
                rotation: obj.rotation,
                scale: obj.scale,
                outline,
                ghosts,
            });
        }
        WorldSnapshot {
            frame: self.frame,
            playfield: self.playfield(),
            objects,
        }
    }

    /// Check single membership and that visible objects, and only those,
    /// are linked in the grid
    pub fn check_invariants(&self) -> Result<(), String> {
        self.grid.check_links()?;
        for (slot, entry) in self.entries.iter().enumerate() {
            let linked = self.grid.membership(slot).is_some();
            match entry.object.as_ref() {
                Some(obj) if obj.is_visible() != linked => {
                    return Err(format!(
                        "{} visible={} but linked={}",
                        self.id_at(slot),
                        obj.is_visible(),
                        linked
                    ));
                }
                None if linked => {
                    return Err(format!("empty slot {} is still linked", slot));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
