use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::renderer::RenderOutput;
use crate::scene::bsp::{BuildConfig, MAX_TRAVERSAL_DEPTH};
use crate::scene::{Scene, SceneBsp};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

/// Command line: `wgsl_bsp [file.obj] [--max-depth N] [--leaf-size N]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Built-in cube when absent.
    pub mesh_path: Option<PathBuf>,
    pub build: BuildConfig,
}

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>, current: T) -> T {
    match value.map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => {
            log::warn!("{flag} expects a number, keeping the default");
            current
        }
    }
}

impl AppConfig {
    /// `args[0]` is the program name.
    pub fn from_args(args: &[String]) -> Self {
        let mut ret = Self::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--max-depth" => {
                    ret.build.max_depth = parse_value(arg, iter.next(), ret.build.max_depth)
                }
                "--leaf-size" => {
                    ret.build.max_leaf_triangles =
                        parse_value(arg, iter.next(), ret.build.max_leaf_triangles)
                }
                flag if flag.starts_with("--") => log::warn!("ignoring unknown flag {flag}"),
                path => ret.mesh_path = Some(PathBuf::from(path)),
            }
        }
        if ret.build.max_depth > MAX_TRAVERSAL_DEPTH {
            log::warn!(
                "--max-depth {} exceeds the shader traversal stack, using {}",
                ret.build.max_depth,
                MAX_TRAVERSAL_DEPTH
            );
            ret.build.max_depth = MAX_TRAVERSAL_DEPTH;
        }
        ret
    }
}

#[derive(Default)]
pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    scene: Option<SceneBsp>,
}

impl App {
    pub fn parse_args(&mut self, args: Vec<String>) {
        self.config = AppConfig::from_args(&args);
    }

    fn load_mesh(&self) -> Result<Mesh> {
        match &self.config.mesh_path {
            Some(path) => Mesh::load_obj_file(path),
            None => Mesh::load_obj(include_bytes!("../assets/cube.obj")),
        }
    }

    fn init(&mut self, window: Arc<Window>) -> Result<()> {
        let app_init_timestamp = Instant::now();
        let mesh = self.load_mesh()?;
        let mut scene = pollster::block_on(SceneBsp::new(
            RenderOutput::Window(window.clone()),
            mesh,
            &self.config.build,
        ))?;
        scene.init();
        log::info!("app initialized in {:?}", app_init_timestamp.elapsed());
        self.scene = Some(scene);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("wgsl_bsp");
        let result = event_loop
            .create_window(attributes)
            .map_err(|e| log::error!("failed to create window: {e}"))
            .and_then(|window| {
                self.init(Arc::new(window))
                    .map_err(|e| log::error!("failed to initialize: {e}"))
            });
        if result.is_err() {
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(window), Some(scene)) = (&self.window, &mut self.scene) else {
            return;
        };
        match event {
            WindowEvent::Resized(size) => {
                scene.resize(size.width, size.height);
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => match scene.draw() {
                Ok(()) => {}
                Err(Error::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    let size = window.inner_size();
                    scene.resize(size.width, size.height);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("draw failed: {e}");
                    event_loop.exit();
                }
            },
            WindowEvent::CloseRequested => event_loop.exit(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("wgsl_bsp")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(AppConfig::from_args(&args(&[])), AppConfig::default());
    }

    #[test]
    fn parses_path_and_flags() {
        let config = AppConfig::from_args(&args(&["bunny.obj", "--max-depth", "12", "--leaf-size", "2"]));
        assert_eq!(config.mesh_path, Some(PathBuf::from("bunny.obj")));
        assert_eq!(config.build.max_depth, 12);
        assert_eq!(config.build.max_leaf_triangles, 2);
    }

    #[test]
    fn max_depth_is_clamped_to_the_traversal_stack() {
        let config = AppConfig::from_args(&args(&["--max-depth", "100"]));
        assert_eq!(config.build.max_depth, MAX_TRAVERSAL_DEPTH);
    }

    #[test]
    fn bad_numbers_keep_defaults() {
        let config = AppConfig::from_args(&args(&["--max-depth", "deep", "--verbose"]));
        assert_eq!(config.build, BuildConfig::default());
        assert_eq!(config.mesh_path, None);
    }
}
