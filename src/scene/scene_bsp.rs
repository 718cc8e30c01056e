use std::f32::consts::PI;

use crate::error::Result;
use crate::geometry::Mesh;
use crate::renderer::{RenderOutput, Renderer};

use super::bsp::{BspTree, BuildConfig, FlatTree};
use super::buffers::{Binding, BufferLimits, SceneBuffers};
use super::Camera;

const FOV: f32 = PI * 0.3;

/// A mesh, its flattened tree and the renderer the buffers live in. Reloading
/// a mesh means building a new `SceneBsp`.
pub struct SceneBsp {
    pub renderer: Renderer,
    pub camera: Camera,
    pub mesh: Mesh,
    pub tree: FlatTree,
}

impl SceneBsp {
    pub async fn new(output: RenderOutput, mesh: Mesh, config: &BuildConfig) -> Result<Self> {
        let tree = BspTree::build(&mesh, config)?.flatten()?;
        let aspect = match &output {
            RenderOutput::Window(window) => {
                let size = window.inner_size();
                size.width.max(1) as f32 / size.height.max(1) as f32
            }
            RenderOutput::Headless(width, height) => (*width).max(1) as f32 / (*height).max(1) as f32,
        };
        let camera = Camera::frame(&tree.bounds, FOV, aspect);
        let buffers = SceneBuffers::new(&mesh, &tree, &camera, &BufferLimits::default())?;
        let renderer = Self::make_renderer(output, &buffers).await?;
        Ok(Self {
            renderer,
            camera,
            mesh,
            tree,
        })
    }

    pub async fn new_cube(output: RenderOutput) -> Result<Self> {
        let mesh = Mesh::load_obj(include_bytes!("../../assets/cube.obj"))?;
        Self::new(output, mesh, &BuildConfig::default()).await
    }

    async fn make_renderer(output: RenderOutput, buffers: &SceneBuffers) -> Result<Renderer> {
        Renderer::new(output, buffers, include_str!("../shaders/bsp.wgsl")).await
    }

    pub fn write_camera(&mut self) {
        self.renderer
            .write_buffer(Binding::Camera, bytemuck::bytes_of(&self.camera));
    }
}
