mod aabb;
mod mesh;
pub use aabb::{compute_aabb, Aabb};
pub use mesh::Mesh;
