//! Game object definitions
//!
//! Every object owns its kinematic state and a per-kind hit shape. Kinds
//! form a closed set; per-kind behaviour (shape, wrap policy, lifetime,
//! what it collides with) is resolved with a `match` on [`ObjectKind`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::constants::{kinematics, lifetime, shapes};
use crate::game::shape::{HitShape, Outline};
use crate::util::transform::Affine2;
use crate::util::vec2::Vec2;

/// Stable handle to an object in a [`World`](crate::game::world::World).
///
/// Slots are recycled after despawn; the generation makes stale handles
/// resolve to nothing instead of to the slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot, self.generation)
    }
}

/// Object kind; doubles as the collision type-tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Ship,
    Asteroid,
    Bullet,
    Alien,
    AlienBullet,
    Pickup,
    Effect,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Ship,
        ObjectKind::Asteroid,
        ObjectKind::Bullet,
        ObjectKind::Alien,
        ObjectKind::AlienBullet,
        ObjectKind::Pickup,
        ObjectKind::Effect,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Shape every instance of this kind starts with
    pub fn default_shape(self) -> HitShape {
        match self {
            ObjectKind::Ship => HitShape::polygon(&shapes::SHIP),
            ObjectKind::Asteroid => HitShape::polygon(&shapes::ASTEROID),
            ObjectKind::Alien => HitShape::polygon(&shapes::ALIEN),
            ObjectKind::Pickup => HitShape::polygon(&shapes::PICKUP),
            ObjectKind::Bullet | ObjectKind::AlienBullet | ObjectKind::Effect => HitShape::Point,
        }
    }

    /// Tags this kind initiates hit tests against by default
    pub fn default_collides_with(self) -> TagSet {
        match self {
            ObjectKind::Ship => {
                TagSet::of(&[ObjectKind::Asteroid, ObjectKind::Alien, ObjectKind::AlienBullet])
            }
            ObjectKind::Asteroid => TagSet::of(&[
                ObjectKind::Ship,
                ObjectKind::Bullet,
                ObjectKind::Alien,
                ObjectKind::AlienBullet,
            ]),
            ObjectKind::Alien => TagSet::of(&[ObjectKind::Asteroid]),
            ObjectKind::Bullet
            | ObjectKind::AlienBullet
            | ObjectKind::Pickup
            | ObjectKind::Effect => TagSet::EMPTY,
        }
    }

    /// Point-like kinds do not test ghosts across the seams
    pub fn default_bridges(self) -> bool {
        !matches!(
            self,
            ObjectKind::Bullet | ObjectKind::AlienBullet | ObjectKind::Effect
        )
    }

    pub fn wrap_policy(self) -> WrapPolicy {
        match self {
            ObjectKind::Alien => WrapPolicy::VerticalOnly,
            ObjectKind::Effect => WrapPolicy::None,
            _ => WrapPolicy::Torus,
        }
    }

    /// Frames until the object dies on its own, if it is transient
    pub fn default_lifetime(self) -> Option<f32> {
        match self {
            ObjectKind::Bullet | ObjectKind::AlienBullet => Some(lifetime::BULLET),
            ObjectKind::Effect => Some(lifetime::EFFECT),
            _ => None,
        }
    }
}

/// Set of object kinds, stored as a bitmask
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet(u16);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub fn of(kinds: &[ObjectKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |set, &kind| set.with(kind))
    }

    #[inline]
    pub fn with(self, kind: ObjectKind) -> Self {
        TagSet(self.0 | kind.bit())
    }

    #[inline]
    pub fn without(self, kind: ObjectKind) -> Self {
        TagSet(self.0 & !kind.bit())
    }

    #[inline]
    pub fn contains(&self, kind: ObjectKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectKind> {
        let set = *self;
        ObjectKind::ALL.into_iter().filter(move |k| set.contains(*k))
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<ObjectKind> for TagSet {
    fn from_iter<I: IntoIterator<Item = ObjectKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, kind| set.with(kind))
    }
}

/// What happens when an object leaves the playfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapPolicy {
    /// Reappear on the opposite edge on both axes
    Torus,
    /// Wrap top/bottom; die once fully past the left or right edge
    VerticalOnly,
    /// Leave it where it is
    None,
}

/// Linear velocity plus spin in degrees per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

impl Velocity {
    pub fn new(x: f32, y: f32, rot: f32) -> Self {
        Self { x, y, rot }
    }

    #[inline]
    pub fn linear(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Cached world outline, valid while position/rotation/scale are unchanged
#[derive(Debug, Clone, Default)]
struct OutlineCache {
    key: Option<(Vec2, f32, f32)>,
    points: Outline,
}

/// A movable entity tracked by the engine
#[derive(Debug, Clone)]
pub struct GameObject {
    // === HOT FIELDS (touched every frame) ===
    pub position: Vec2,
    pub velocity: Velocity,
    pub acceleration: Vec2,
    /// Degrees, kept in [0, 360) by integration
    pub rotation: f32,
    /// Uniform scale; <= 0 collapses the outline
    pub scale: f32,
    /// Remaining frames for transient kinds
    pub lifetime: Option<f32>,
    visible: bool,

    // === WARM FIELDS (touched during hit tests) ===
    shape: HitShape,
    pub collides_with: TagSet,
    pub bridges_horizontal: bool,
    pub bridges_vertical: bool,
    outline: OutlineCache,

    // === COLD FIELDS ===
    kind: ObjectKind,
    pub wrap_policy: WrapPolicy,
}

impl GameObject {
    /// New visible object with the kind's default shape, tags and policies
    pub fn new(kind: ObjectKind, position: Vec2) -> Self {
        let bridges = kind.default_bridges();
        Self {
            position,
            velocity: Velocity::default(),
            acceleration: Vec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
            lifetime: kind.default_lifetime(),
            visible: true,
            shape: kind.default_shape(),
            collides_with: kind.default_collides_with(),
            bridges_horizontal: bridges,
            bridges_vertical: bridges,
            outline: OutlineCache::default(),
            kind,
            wrap_policy: kind.wrap_policy(),
        }
    }

    pub fn with_shape(mut self, shape: HitShape) -> Self {
        self.shape = shape;
        self.outline = OutlineCache::default();
        self
    }

    pub fn with_collides_with(mut self, tags: TagSet) -> Self {
        self.collides_with = tags;
        self
    }

    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = normalize_degrees(degrees);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bridging(mut self, horizontal: bool, vertical: bool) -> Self {
        self.bridges_horizontal = horizontal;
        self.bridges_vertical = vertical;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Option<f32>) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_wrap_policy(mut self, policy: WrapPolicy) -> Self {
        self.wrap_policy = policy;
        self
    }

    /// Spawn hidden; the object joins the grid once made visible
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    #[inline]
    pub fn shape(&self) -> &HitShape {
        &self.shape
    }

    /// Only the world flips this, so grid membership stays in sync
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub(crate) fn set_visible_flag(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Collapsed or corrupted objects neither hit nor get hit
    pub fn is_degenerate(&self) -> bool {
        !(self.scale > kinematics::MIN_SCALE)
            || !self.scale.is_finite()
            || !self.position.is_finite()
            || !self.rotation.is_finite()
    }

    /// Scaled bounding radius of the shape
    pub fn bounding_radius(&self) -> f32 {
        self.shape.bounding_radius() * self.scale.max(0.0)
    }

    /// Current transform from local to world space
    pub fn transform(&self) -> Affine2 {
        Affine2::configure(self.rotation, self.scale, self.position)
    }

    /// World-space points at the current pose, cached until the pose changes.
    /// Single-point shapes yield just the position.
    pub fn transformed_points(&mut self) -> &[Vec2] {
        let key = (self.position, self.rotation, self.scale);
        if self.outline.key != Some(key) {
            let transform = self.transform();
            self.shape.transform_into(&transform, &mut self.outline.points);
            self.outline.key = Some(key);
        }
        &self.outline.points
    }

    /// Outline with the position shifted by `offset`; used for bridged ghosts
    /// and never cached
    pub fn outline_at(&self, offset: Vec2) -> Outline {
        let mut out = Outline::new();
        let transform = Affine2::configure(self.rotation, self.scale, self.position + offset);
        self.shape.transform_into(&transform, &mut out);
        out
    }
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(kinematics::FULL_TURN);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= kinematics::FULL_TURN {
        0.0
    } else {
        wrapped
    }
}
