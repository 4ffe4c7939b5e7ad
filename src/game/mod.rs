pub mod constants;
pub mod object;
pub mod performance;
pub mod shape;
pub mod spatial;
pub mod systems;
pub mod world;
