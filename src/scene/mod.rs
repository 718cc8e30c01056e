pub mod bsp;
pub mod buffers;
mod camera;
mod material;
mod render_ppm;
mod scene_bsp;
pub use camera::{Camera, CAMERA_LAYOUT_VERSION};
pub use material::Material;
pub use render_ppm::render_ppm;
pub use scene_bsp::SceneBsp;

use crate::error::Result;

pub trait Scene {
    fn init(&mut self);
    fn draw(&mut self) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32);
}

impl Scene for SceneBsp {
    fn init(&mut self) {
        self.write_camera();
    }
    fn draw(&mut self) -> Result<()> {
        self.renderer.draw()
    }
    fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
        self.camera.set_aspect(self.renderer.aspect());
        self.write_camera();
    }
}
