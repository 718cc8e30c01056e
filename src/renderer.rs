use crate::error::{Error, Result};
use crate::scene::buffers::{Binding, BufferKind, BufferLimits, SceneBuffers};
use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use std::cmp::max;
use std::mem::size_of;
use std::sync::mpsc::channel;
use std::sync::Arc;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    vertex_attr_array, Buffer, Color, CommandEncoderDescriptor, Device, DeviceDescriptor, Features,
    FragmentState, IndexFormat, Instance, Limits, LoadOp, MultisampleState, Operations,
    PipelineLayoutDescriptor, PowerPreference, PrimitiveState, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipelineDescriptor, RequestAdapterOptions, ShaderSource, StoreOp,
    Surface, SurfaceConfiguration, TextureViewDescriptor, VertexState,
};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BufferAddress, BufferBindingType, BufferDescriptor,
    BufferUsages, CompositeAlphaMode, Extent3d, ImageCopyBuffer, ImageCopyTexture,
    ImageDataLayout, Maintain, MapMode, MemoryHints, Origin3d, PipelineCompilationOptions,
    PresentMode, ShaderStages, Texture, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, VertexBufferLayout, VertexStepMode,
};
use winit::window::Window;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    position: [f32; 4],
}

impl Vertex {
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &vertex_attr_array![0 => Float32x4],
        }
    }
}

const VERTICES: &[Vertex] = &[
    Vertex {
        position: [1.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: [-1.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: [-1.0, -1.0, 0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0, 0.0, 1.0],
    },
];
const INDICES: &[u32] = &[0, 1, 2, 2, 3, 0];

pub enum RenderOutput {
    Window(Arc<Window>),
    Headless(u32, u32),
}

/// Offscreen color target plus the buffer each frame is copied into.
struct Headless {
    texture: Texture,
    buffer: Buffer,
    padded_bytes_per_row: u32,
}

pub struct Renderer {
    pub device: Device,
    pub queue: Queue,
    pub config: SurfaceConfiguration,
    surface: Option<Surface<'static>>,
    headless: Option<Headless>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    buffers: Vec<Buffer>,
    bind_group: BindGroup,
}

impl Renderer {
    pub async fn new(output: RenderOutput, scene: &SceneBuffers, shader: &str) -> Result<Self> {
        let instance = Instance::default();
        let (surface, width, height) = match &output {
            RenderOutput::Window(window) => {
                let size = window.inner_size();
                let surface = instance.create_surface(window.clone())?;
                (Some(surface), max(1, size.width), max(1, size.height))
            }
            RenderOutput::Headless(width, height) => (None, max(1, *width), max(1, *height)),
        };
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: surface.as_ref(),
            })
            .await
            .ok_or(Error::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info());
        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: None,
                    required_features: Features::empty(),
                    required_limits: Limits {
                        max_storage_buffer_binding_size: adapter_limits
                            .max_storage_buffer_binding_size,
                        max_buffer_size: adapter_limits.max_buffer_size,
                        ..Limits::default().using_resolution(adapter_limits)
                    },
                    memory_hints: MemoryHints::default(),
                },
                None,
            )
            .await?;
        scene.check(&BufferLimits::from(&device.limits()))?;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl(Cow::Borrowed(shader)),
        });
        let vertex_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(VERTICES),
            usage: BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(INDICES),
            usage: BufferUsages::INDEX,
        });
        let buffers: Vec<Buffer> = scene
            .slots()
            .iter()
            .map(|slot| {
                let usage = match slot.binding.kind() {
                    BufferKind::Uniform => BufferUsages::UNIFORM,
                    BufferKind::Storage => BufferUsages::STORAGE,
                };
                device.create_buffer_init(&BufferInitDescriptor {
                    label: Some(slot.binding.name()),
                    contents: &slot.contents,
                    usage: usage | BufferUsages::COPY_DST,
                })
            })
            .collect();
        log::info!(
            "uploaded {} scene buffers, {} bytes",
            buffers.len(),
            scene.total_size()
        );
        let layout_entries: Vec<BindGroupLayoutEntry> = scene
            .slots()
            .iter()
            .map(|slot| BindGroupLayoutEntry {
                binding: slot.binding.slot(),
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: match slot.binding.kind() {
                        BufferKind::Uniform => BufferBindingType::Uniform,
                        BufferKind::Storage => BufferBindingType::Storage { read_only: true },
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &layout_entries,
        });
        let bind_group_entries: Vec<BindGroupEntry> = scene
            .slots()
            .iter()
            .zip(buffers.iter())
            .map(|(slot, buffer)| BindGroupEntry {
                binding: slot.binding.slot(),
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout: &bind_group_layout,
            entries: &bind_group_entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let config = match &surface {
            Some(surface) => {
                let config = surface
                    .get_default_config(&adapter, width, height)
                    .ok_or(Error::NoAdapter)?;
                surface.configure(&device, &config);
                config
            }
            None => SurfaceConfiguration {
                usage: TextureUsages::RENDER_ATTACHMENT,
                format: TextureFormat::Rgba8Unorm,
                width,
                height,
                present_mode: PresentMode::Fifo,
                desired_maximum_frame_latency: 2,
                alpha_mode: CompositeAlphaMode::Auto,
                view_formats: vec![],
            },
        };
        let headless = surface
            .is_none()
            .then(|| Self::make_headless(&device, width, height));
        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: None,
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[Vertex::desc()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(config.format.into())],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        Ok(Self {
            device,
            queue,
            config,
            surface,
            headless,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            buffers,
            bind_group,
        })
    }

    fn make_headless(device: &Device, width: u32, height: u32) -> Headless {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("Headless Target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (width * 4).div_ceil(align) * align;
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some("Image Buffer"),
            size: (padded_bytes_per_row * height) as BufferAddress,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Headless {
            texture,
            buffer,
            padded_bytes_per_row,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(surface) = &self.surface else {
            return;
        };
        self.config.width = max(1, width);
        self.config.height = max(1, height);
        surface.configure(&self.device, &self.config);
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    pub fn write_buffer(&mut self, binding: Binding, data: &[u8]) {
        self.queue
            .write_buffer(&self.buffers[binding.slot() as usize], 0, data);
    }

    pub fn draw(&mut self) -> Result<()> {
        let frame = self
            .surface
            .as_ref()
            .map(|surface| surface.get_current_texture())
            .transpose()?;
        let view = match (&frame, &self.headless) {
            (Some(frame), _) => frame.texture.create_view(&TextureViewDescriptor::default()),
            (None, Some(headless)) => headless
                .texture
                .create_view(&TextureViewDescriptor::default()),
            (None, None) => return Ok(()),
        };
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.render_pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.draw_indexed(0..INDICES.len() as u32, 0, 0..1);
        }
        if let Some(headless) = &self.headless {
            encoder.copy_texture_to_buffer(
                ImageCopyTexture {
                    texture: &headless.texture,
                    mip_level: 0,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                ImageCopyBuffer {
                    buffer: &headless.buffer,
                    layout: ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(headless.padded_bytes_per_row),
                        rows_per_image: Some(self.config.height),
                    },
                },
                Extent3d {
                    width: self.config.width,
                    height: self.config.height,
                    depth_or_array_layers: 1,
                },
            );
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }

    /// Tightly packed RGBA8 pixels of the last headless frame, empty for windowed output.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let Some(headless) = &self.headless else {
            return Ok(Vec::new());
        };
        let slice = headless.buffer.slice(..);
        let (tx, rx) = channel();
        slice.map_async(MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(Maintain::Wait);
        rx.recv().unwrap_or(Err(wgpu::BufferAsyncError))?;
        let row_bytes = (self.config.width * 4) as usize;
        let pixels: Vec<u8> = {
            let data = slice.get_mapped_range();
            data.chunks_exact(headless.padded_bytes_per_row as usize)
                .flat_map(|row| &row[..row_bytes])
                .copied()
                .collect()
        };
        headless.buffer.unmap();
        Ok(pixels)
    }
}
