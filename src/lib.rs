//! Wrapfield
//!
//! Toroidal spatial-hash collision engine for wrap-around 2D playfields.
//!
//! Objects live in a [`World`] whose playfield is divided into a grid of
//! cells whose edges wrap to the opposite side. Each tick moves every visible
//! object, relocates it in the grid, and hit-tests it against the objects in
//! its 3x3 cell neighbourhood, including the wrapped copies of objects that
//! straddle a seam.

pub mod config;
pub mod game;
pub mod util;

pub use config::{ConfigError, EngineConfig};
pub use game::object::{GameObject, ObjectId, ObjectKind, TagSet, Velocity, WrapPolicy};
pub use game::shape::HitShape;
pub use game::systems::collision::CollisionHandler;
pub use game::world::{FrameStats, World, WorldConfig, WorldError, WorldSnapshot};
pub use util::vec2::Vec2;
