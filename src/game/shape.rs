//! Hit shapes and point-in-polygon testing
//!
//! A shape is a per-kind constant outline in local space. Each frame it is
//! pushed through the object's [`Affine2`] to get the world-space outline used
//! for hit tests. The test is deliberately asymmetric: the initiating object's
//! outline is checked for containment of the target's transformed vertices.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::util::transform::Affine2;
use crate::util::vec2::Vec2;

/// World-space points of a transformed shape
pub type Outline = SmallVec<[Vec2; 16]>;

/// Polygons with less area than this never contain anything
const DEGENERATE_AREA: f32 = 1e-6;

/// Local-space geometry used for hit testing
#[derive(Debug, Clone, PartialEq)]
pub enum HitShape {
    /// Closed polygon, vertices in drawing order
    Polygon(Arc<[Vec2]>),
    /// Single point at the object's position (bullets, sparks).
    /// Can be hit, can never contain another object's points.
    Point,
}

impl HitShape {
    pub fn polygon(vertices: &[Vec2]) -> Self {
        HitShape::Polygon(Arc::from(vertices))
    }

    /// Number of local vertices (a point counts as one)
    pub fn vertex_count(&self) -> usize {
        match self {
            HitShape::Polygon(vertices) => vertices.len(),
            HitShape::Point => 1,
        }
    }

    /// Whether this shape can act as the containing polygon in a hit test
    pub fn can_contain(&self) -> bool {
        matches!(self, HitShape::Polygon(vertices) if vertices.len() >= 3)
    }

    /// Largest distance of a local vertex from the origin, before scaling
    pub fn bounding_radius(&self) -> f32 {
        match self {
            HitShape::Polygon(vertices) => vertices
                .iter()
                .map(|v| v.length())
                .fold(0.0, f32::max),
            HitShape::Point => 0.0,
        }
    }

    /// Transform into world space, replacing the contents of `out`
    pub fn transform_into(&self, transform: &Affine2, out: &mut Outline) {
        out.clear();
        match self {
            HitShape::Polygon(vertices) => {
                out.extend(vertices.iter().map(|&v| transform.apply(v)));
            }
            HitShape::Point => out.push(transform.translation()),
        }
    }
}

/// Absolute area of a closed polygon (shoelace formula)
pub fn polygon_area(polygon: &[Vec2]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        twice_area += polygon[j].x * polygon[i].y - polygon[i].x * polygon[j].y;
        j = i;
    }
    (twice_area * 0.5).abs()
}

/// Whether `polygon` can contain anything at all
///
/// Fewer than three vertices, non-finite coordinates or a collapsed area
/// (e.g. scale 0 during a spawn-in animation) all count as degenerate.
pub fn is_degenerate(polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 || !polygon.iter().all(Vec2::is_finite) {
        return true;
    }
    let area = polygon_area(polygon);
    !area.is_finite() || area < DEGENERATE_AREA
}

/// Even-odd point-in-polygon test
///
/// Never panics; a degenerate polygon contains nothing.
pub fn contains_point(polygon: &[Vec2], point: Vec2) -> bool {
    if !point.is_finite() || is_degenerate(polygon) {
        return false;
    }
    contains_point_unchecked(polygon, point)
}

/// True when any of `points` lies inside `polygon`
pub fn contains_any(polygon: &[Vec2], points: &[Vec2]) -> bool {
    if is_degenerate(polygon) {
        return false;
    }
    points
        .iter()
        .any(|&p| p.is_finite() && contains_point_unchecked(polygon, p))
}

#[inline]
fn contains_point_unchecked(polygon: &[Vec2], point: Vec2) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
