//! Per-object motion integration
//!
//! Semi-implicit Euler in frame units: acceleration feeds velocity, velocity
//! feeds position and spin. The per-kind wrap policy runs right after
//! integration so the grid sees the wrapped position.

use crate::game::constants::kinematics::FULL_TURN;
use crate::game::object::{normalize_degrees, GameObject, WrapPolicy};
use crate::util::vec2::Vec2;

/// Result of moving one object for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Still active
    Alive,
    /// Lifetime ran out this frame
    Expired,
    /// Left the playfield on an axis its policy does not wrap
    LeftPlayfield,
}

impl MotionOutcome {
    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self, MotionOutcome::Alive)
    }
}

/// Integrate, wrap and age an object by `delta` frames
pub fn step(object: &mut GameObject, delta: f32, playfield: Vec2) -> MotionOutcome {
    integrate(object, delta);

    if !apply_wrap(object, playfield) {
        return MotionOutcome::LeftPlayfield;
    }

    if let Some(remaining) = object.lifetime.as_mut() {
        *remaining -= delta;
        if *remaining <= 0.0 {
            return MotionOutcome::Expired;
        }
    }

    MotionOutcome::Alive
}

/// `velocity += acceleration * delta; position += velocity * delta;
/// rotation = normalize(rotation + spin * delta)`
pub fn integrate(object: &mut GameObject, delta: f32) {
    object.velocity.x += object.acceleration.x * delta;
    object.velocity.y += object.acceleration.y * delta;
    object.position += object.velocity.linear() * delta;
    object.rotation = normalize_degrees(object.rotation + object.velocity.rot * delta);
}

/// Apply the object's wrap policy. Returns false when the object should die.
pub fn apply_wrap(object: &mut GameObject, playfield: Vec2) -> bool {
    match object.wrap_policy {
        WrapPolicy::Torus => {
            object.position.x = wrap_axis(object.position.x, playfield.x);
            object.position.y = wrap_axis(object.position.y, playfield.y);
            true
        }
        WrapPolicy::VerticalOnly => {
            object.position.y = wrap_axis(object.position.y, playfield.y);
            let margin = object.bounding_radius();
            let x = object.position.x;
            let gone_right = object.velocity.x > 0.0 && x > playfield.x + margin;
            let gone_left = object.velocity.x < 0.0 && x < -margin;
            !(gone_right || gone_left)
        }
        WrapPolicy::None => true,
    }
}

/// Wrap a coordinate into [0, extent). Non-finite values pass through.
#[inline]
pub fn wrap_axis(value: f32, extent: f32) -> f32 {
    if (0.0..extent).contains(&value) || !value.is_finite() {
        return value;
    }
    let wrapped = value.rem_euclid(extent);
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Heading vector for a rotation in degrees, for spawn logic that fires
/// along an object's facing
pub fn heading(rotation: f32) -> Vec2 {
    Vec2::from_degrees(rotation % FULL_TURN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::object::{ObjectKind, Velocity};

    const PLAYFIELD: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_position_integration() {
        let mut obj = GameObject::new(ObjectKind::Asteroid, Vec2::new(100.0, 100.0))
            .with_velocity(Velocity::new(2.0, -1.0, 0.0));
        integrate(&mut obj, 1.0);
        assert_eq!(obj.position, Vec2::new(102.0, 99.0));
        integrate(&mut obj, 0.5);
        assert_eq!(obj.position, Vec2::new(103.0, 98.5));
    }

    #[test]
    fn test_acceleration_feeds_velocity_first() {
        let mut obj = GameObject::new(ObjectKind::Ship, Vec2::ZERO)
            .with_acceleration(Vec2::new(1.0, 0.0));
        integrate(&mut obj, 2.0);
        assert_eq!(obj.velocity.x, 2.0);
        assert_eq!(obj.position.x, 4.0);
    }

    #[test]
    fn test_rotation_normalized() {
        let mut obj = GameObject::new(ObjectKind::Ship, Vec2::ZERO)
            .with_rotation(350.0)
            .with_velocity(Velocity::new(0.0, 0.0, 20.0));
        integrate(&mut obj, 1.0);
        assert!((obj.rotation - 10.0).abs() < 1e-3);

        obj.velocity.rot = -30.0;
        integrate(&mut obj, 1.0);
        assert!((obj.rotation - 340.0).abs() < 1e-3);
    }

    #[test]
    fn test_torus_wrap() {
        let mut obj = GameObject::new(ObjectKind::Asteroid, Vec2::new(2.0, 300.0))
            .with_velocity(Velocity::new(-3.0, 0.0, 0.0));
        assert!(step(&mut obj, 1.0, PLAYFIELD).is_alive());
        assert!((obj.position.x - 799.0).abs() < 1e-3);

        obj.position = Vec2::new(801.0, 605.0);
        obj.velocity = Velocity::default();
        step(&mut obj, 1.0, PLAYFIELD);
        assert!(obj.position.approx_eq(Vec2::new(1.0, 5.0), 1e-3));
    }

    #[test]
    fn test_wrap_axis_edges() {
        assert_eq!(wrap_axis(0.0, 800.0), 0.0);
        assert_eq!(wrap_axis(800.0, 800.0), 0.0);
        assert!((wrap_axis(-0.5, 800.0) - 799.5).abs() < 1e-3);
        assert!(wrap_axis(f32::NAN, 800.0).is_nan());
        assert!((0.0..800.0).contains(&wrap_axis(-1e-7, 800.0)));
    }

    #[test]
    fn test_alien_dies_off_side() {
        let mut alien = GameObject::new(ObjectKind::Alien, Vec2::new(815.0, 100.0))
            .with_velocity(Velocity::new(3.0, 0.0, 0.0));
        // Still within one half-width past the edge
        assert!(step(&mut alien, 1.0, PLAYFIELD).is_alive());
        assert_eq!(step(&mut alien, 2.0, PLAYFIELD), MotionOutcome::LeftPlayfield);
    }

    #[test]
    fn test_alien_wraps_vertically() {
        let mut alien = GameObject::new(ObjectKind::Alien, Vec2::new(400.0, 598.0))
            .with_velocity(Velocity::new(0.0, 4.0, 0.0));
        assert!(step(&mut alien, 1.0, PLAYFIELD).is_alive());
        assert!((alien.position.y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_lifetime_expiry() {
        let mut bullet = GameObject::new(ObjectKind::Bullet, Vec2::new(10.0, 10.0))
            .with_lifetime(Some(2.0));
        assert!(step(&mut bullet, 1.0, PLAYFIELD).is_alive());
        assert_eq!(step(&mut bullet, 1.0, PLAYFIELD), MotionOutcome::Expired);
    }

    #[test]
    fn test_motion_determinism() {
        let make = || {
            GameObject::new(ObjectKind::Asteroid, Vec2::new(400.0, 300.0))
                .with_velocity(Velocity::new(3.3, -1.7, 4.1))
        };
        let (mut a, mut b) = (make(), make());
        for _ in 0..1000 {
            step(&mut a, 0.75, PLAYFIELD);
            step(&mut b, 0.75, PLAYFIELD);
        }
        assert_eq!(a.position, b.position);
        assert_eq!(a.rotation, b.rotation);
    }

    #[test]
    fn test_heading() {
        assert!(heading(0.0).approx_eq(Vec2::RIGHT, 1e-5));
        assert!(heading(630.0).approx_eq(Vec2::UP, 1e-4));
    }
}
