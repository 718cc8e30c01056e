use crate::geometry::Aabb;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Bumped whenever the field layout of [`Camera`] changes.
pub const CAMERA_LAYOUT_VERSION: u32 = 1;

/// Camera uniform, binding 0. Each `Vec3` is followed by a scalar so the
/// layout matches WGSL `vec3<f32>` alignment without explicit padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Camera {
    eye: Vec3,
    version: u32,
    direction: Vec3,
    focus_distance: f32,
    up: Vec3,
    fov: f32,
    right: Vec3,
    aspect: f32,
}

impl Camera {
    pub fn new(from: Vec3, to: Vec3, focus_distance: f32, fov: f32) -> Self {
        let direction = (to - from).try_normalize().unwrap_or(Vec3::NEG_Z);
        let world_up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let right = direction.cross(world_up).normalize();
        let up = right.cross(direction);
        Self {
            eye: from,
            version: CAMERA_LAYOUT_VERSION,
            direction,
            focus_distance,
            up,
            fov,
            right,
            aspect: 1.0,
        }
    }

    /// Looks at `bounds` from the +z side, far enough back to fit it in view.
    pub fn frame(bounds: &Aabb, fov: f32, aspect: f32) -> Self {
        let (center, radius) = if bounds.is_empty() {
            (Vec3::ZERO, 1.0)
        } else {
            (bounds.center(), (bounds.extent().length() * 0.5).max(1e-3))
        };
        let distance = radius / (fov * 0.5).sin();
        let eye = center + Vec3::new(0.0, radius * 0.3, distance);
        let mut ret = Self::new(eye, center, distance, fov);
        ret.set_aspect(aspect);
        ret
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}
