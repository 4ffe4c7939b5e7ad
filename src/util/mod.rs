pub mod transform;
pub mod vec2;
