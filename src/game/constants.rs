use crate::util::vec2::Vec2;

/// Playfield defaults (screen pixels)
pub mod playfield {
    /// Default playfield width
    pub const WIDTH: f32 = 800.0;
    /// Default playfield height
    pub const HEIGHT: f32 = 600.0;
}

/// Spatial grid constants
pub mod grid {
    /// Default cell edge length
    /// Must be >= the largest object's bounding diameter for the 3x3 candidate
    /// search to be complete
    pub const CELL_SIZE: f32 = 60.0;
    /// Initial capacity for per-object link storage
    pub const INITIAL_LINK_CAPACITY: usize = 256;
    /// Inline capacity for candidate buffers before spilling to the heap
    pub const CANDIDATE_INLINE: usize = 32;
    /// Upper bound on `columns * rows`
    pub const MAX_CELLS: usize = 1 << 20;
}

/// Frame timing
pub mod timing {
    /// Target frames per second for the frame budget
    pub const TICK_RATE: u32 = 60;
    /// Delta for one nominal frame. Motion constants are expressed per frame,
    /// so a frame that took exactly the budget advances by 1.0
    pub const NOMINAL_DELTA: f32 = 1.0;
}

/// Per-kind lifetimes, in frame units
pub mod lifetime {
    /// Player and alien bullets expire after this many frames
    pub const BULLET: f32 = 50.0;
    /// Explosion and debris effects
    pub const EFFECT: f32 = 30.0;
}

/// Local-space outlines. Per-kind constants shared by every instance.
pub mod shapes {
    use super::Vec2;

    /// Ship: narrow triangle pointing up (local -y)
    pub const SHIP: [Vec2; 3] = [
        Vec2::new(-5.0, 4.0),
        Vec2::new(0.0, -12.0),
        Vec2::new(5.0, 4.0),
    ];

    /// Asteroid: ten-vertex irregular rock, radius ~11 at scale 1
    pub const ASTEROID: [Vec2; 10] = [
        Vec2::new(-10.0, 0.0),
        Vec2::new(-5.0, 7.0),
        Vec2::new(-3.0, 4.0),
        Vec2::new(1.0, 10.0),
        Vec2::new(5.0, 4.0),
        Vec2::new(10.0, 0.0),
        Vec2::new(5.0, -6.0),
        Vec2::new(2.0, -10.0),
        Vec2::new(-4.0, -10.0),
        Vec2::new(-4.0, -5.0),
    ];

    /// Alien saucer hull
    pub const ALIEN: [Vec2; 6] = [
        Vec2::new(-20.0, 0.0),
        Vec2::new(-12.0, -4.0),
        Vec2::new(12.0, -4.0),
        Vec2::new(20.0, 0.0),
        Vec2::new(12.0, 4.0),
        Vec2::new(-12.0, 4.0),
    ];

    /// Pickup diamond
    pub const PICKUP: [Vec2; 4] = [
        Vec2::new(0.0, -8.0),
        Vec2::new(8.0, 0.0),
        Vec2::new(0.0, 8.0),
        Vec2::new(-8.0, 0.0),
    ];
}

/// Rotate/scale limits
pub mod kinematics {
    /// Degrees in a full turn; rotation is kept in [0, FULL_TURN)
    pub const FULL_TURN: f32 = 360.0;
    /// Scales at or below this are treated as collapsed outlines
    pub const MIN_SCALE: f32 = 0.0;
}
