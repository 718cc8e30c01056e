//! CPU-built binary split-plane tree for a WGSL ray tracer.
//!
//! A [`geometry::Mesh`] is partitioned by [`scene::bsp::BspTree::build`],
//! flattened into the three arrays the shader walks, packed per binding slot
//! by [`scene::buffers::SceneBuffers`] and uploaded by [`renderer::Renderer`].

mod app;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod scene;
pub use app::{App, AppConfig};
pub use error::{Error, Result};
pub use scene::render_ppm;
