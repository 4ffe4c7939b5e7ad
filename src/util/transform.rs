//! 2D affine transform (rotation + uniform scale + translation)
//!
//! Maps a shape's local-space vertices into world space. Rotation is in
//! degrees and follows the same sign as `velocity.rot` integration, so on a
//! y-down screen positive rotation turns clockwise.

use crate::util::vec2::Vec2;

/// Row-major 2x3 matrix: `[[a, b, tx], [c, d, ty]]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    a: f32,
    b: f32,
    tx: f32,
    c: f32,
    d: f32,
    ty: f32,
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        c: 0.0,
        d: 1.0,
        ty: 0.0,
    };

    /// Build the transform for `rotation` degrees, uniform `scale` and `translate`
    pub fn configure(rotation: f32, scale: f32, translate: Vec2) -> Self {
        let (sin, cos) = rotation.to_radians().sin_cos();
        Self {
            a: cos * scale,
            b: -sin * scale,
            tx: translate.x,
            c: sin * scale,
            d: cos * scale,
            ty: translate.y,
        }
    }

    /// Map a local-space point to world space
    #[inline]
    pub fn apply(&self, local: Vec2) -> Vec2 {
        Vec2 {
            x: self.a * local.x + self.b * local.y + self.tx,
            y: self.c * local.x + self.d * local.y + self.ty,
        }
    }

    /// Translation component
    #[inline]
    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.tx, self.ty)
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
