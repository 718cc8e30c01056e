use bytemuck::{Pod, Zeroable};
use glam::Vec4;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub color: Vec4,
    pub emission: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Vec4::new(0.8, 0.8, 0.8, 1.0), Vec4::ZERO)
    }
}

impl Material {
    pub fn new(color: Vec4, emission: Vec4) -> Self {
        Self { color, emission }
    }
    pub fn emissive(emission: Vec4) -> Self {
        Self::new(Vec4::new(0.0, 0.0, 0.0, 1.0), emission)
    }
    pub fn is_emissive(&self) -> bool {
        self.emission.truncate().max_element() > 0.0
    }
}
