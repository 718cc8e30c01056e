use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::scene::bsp::{FlatTree, MAX_TRAVERSAL_DEPTH};
use crate::scene::{Camera, Material};
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Binding slots in bind group 0. The numbers are shared with `bsp.wgsl`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    Camera = 0,
    RootBounds = 1,
    Vertices = 2,
    Triangles = 3,
    Materials = 4,
    MaterialIndices = 5,
    Lights = 6,
    TreeIds = 7,
    BspTree = 8,
    BspPlanes = 9,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Uniform,
    Storage,
}

impl Binding {
    pub const ALL: [Binding; 10] = [
        Binding::Camera,
        Binding::RootBounds,
        Binding::Vertices,
        Binding::Triangles,
        Binding::Materials,
        Binding::MaterialIndices,
        Binding::Lights,
        Binding::TreeIds,
        Binding::BspTree,
        Binding::BspPlanes,
    ];

    pub fn slot(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Binding::Camera => "camera",
            Binding::RootBounds => "root bounds",
            Binding::Vertices => "vertices",
            Binding::Triangles => "triangles",
            Binding::Materials => "materials",
            Binding::MaterialIndices => "material indices",
            Binding::Lights => "lights",
            Binding::TreeIds => "tree ids",
            Binding::BspTree => "bsp tree",
            Binding::BspPlanes => "bsp planes",
        }
    }

    pub fn kind(self) -> BufferKind {
        match self {
            Binding::Camera | Binding::RootBounds => BufferKind::Uniform,
            _ => BufferKind::Storage,
        }
    }
}

/// Root bounding box uniform, binding 1.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneBounds {
    pub min: Vec3,
    pub light_count: u32,
    pub max: Vec3,
    pub node_count: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: Vec4,
    /// Zero when the mesh has no normals; the shader falls back to the face normal.
    pub normal: Vec4,
}

/// Largest buffer and binding sizes the destination device accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferLimits {
    pub max_uniform_binding: u64,
    pub max_storage_binding: u64,
    pub max_buffer_size: u64,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self::from(&wgpu::Limits::default())
    }
}

impl From<&wgpu::Limits> for BufferLimits {
    fn from(limits: &wgpu::Limits) -> Self {
        Self {
            max_uniform_binding: limits.max_uniform_buffer_binding_size as u64,
            max_storage_binding: limits.max_storage_buffer_binding_size as u64,
            max_buffer_size: limits.max_buffer_size,
        }
    }
}

impl BufferLimits {
    /// A slot is bound whole, so it must fit both the binding and the buffer limit.
    pub fn limit(&self, kind: BufferKind) -> u64 {
        let binding = match kind {
            BufferKind::Uniform => self.max_uniform_binding,
            BufferKind::Storage => self.max_storage_binding,
        };
        binding.min(self.max_buffer_size)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BufferData {
    pub binding: Binding,
    pub contents: Vec<u8>,
}

/// Host-side contents of every buffer the ray tracing shader binds, in slot order.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneBuffers {
    slots: Vec<BufferData>,
}

// wgpu rejects zero-sized bindings
fn padded<T: Pod>(data: &[T]) -> Vec<u8> {
    if data.is_empty() {
        vec![0; std::mem::size_of::<T>()]
    } else {
        bytemuck::cast_slice(data).to_vec()
    }
}

/// Triangles whose material emits light.
pub fn light_triangles(mesh: &Mesh) -> Vec<u32> {
    mesh.material_indices
        .iter()
        .enumerate()
        .filter(|&(_, &m)| mesh.materials.get(m as usize).is_some_and(Material::is_emissive))
        .map(|(t, _)| t as u32)
        .collect()
}

impl SceneBuffers {
    pub fn new(
        mesh: &Mesh,
        tree: &FlatTree,
        camera: &Camera,
        limits: &BufferLimits,
    ) -> Result<Self> {
        mesh.validate()?;
        if mesh.is_empty() {
            return Err(Error::EmptyMesh);
        }
        if tree.depth > MAX_TRAVERSAL_DEPTH {
            return Err(Error::CapacityOverflow {
                buffer: "traversal stack",
                size: tree.depth as u64,
                limit: MAX_TRAVERSAL_DEPTH as u64,
            });
        }
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let vertices: Vec<GpuVertex> = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| GpuVertex {
                position: p.extend(1.0),
                normal: if has_normals {
                    mesh.normals[i].extend(0.0)
                } else {
                    Vec4::ZERO
                },
            })
            .collect();
        let triangles: Vec<[u32; 4]> = mesh.indices.iter().map(|&[a, b, c]| [a, b, c, 0]).collect();
        let materials = if mesh.materials.is_empty() {
            vec![Material::default()]
        } else {
            mesh.materials.clone()
        };
        let lights = light_triangles(mesh);
        let bounds = SceneBounds {
            min: tree.bounds.min,
            light_count: lights.len() as u32,
            max: tree.bounds.max,
            node_count: tree.nodes.len() as u32,
        };
        let slots = vec![
            BufferData {
                binding: Binding::Camera,
                contents: bytemuck::bytes_of(camera).to_vec(),
            },
            BufferData {
                binding: Binding::RootBounds,
                contents: bytemuck::bytes_of(&bounds).to_vec(),
            },
            BufferData {
                binding: Binding::Vertices,
                contents: padded(&vertices),
            },
            BufferData {
                binding: Binding::Triangles,
                contents: padded(&triangles),
            },
            BufferData {
                binding: Binding::Materials,
                contents: padded(&materials),
            },
            BufferData {
                binding: Binding::MaterialIndices,
                contents: padded(&mesh.material_indices),
            },
            BufferData {
                binding: Binding::Lights,
                contents: padded(&lights),
            },
            BufferData {
                binding: Binding::TreeIds,
                contents: padded(&tree.leaf_ids),
            },
            BufferData {
                binding: Binding::BspTree,
                contents: padded(&tree.nodes),
            },
            BufferData {
                binding: Binding::BspPlanes,
                contents: padded(&tree.planes),
            },
        ];
        let ret = Self { slots };
        ret.check(limits)?;
        Ok(ret)
    }

    /// Fails on the first slot larger than its binding limit.
    pub fn check(&self, limits: &BufferLimits) -> Result<()> {
        for slot in &self.slots {
            let size = slot.contents.len() as u64;
            let limit = limits.limit(slot.binding.kind());
            if size > limit {
                return Err(Error::CapacityOverflow {
                    buffer: slot.binding.name(),
                    size,
                    limit,
                });
            }
        }
        Ok(())
    }

    pub fn slots(&self) -> &[BufferData] {
        &self.slots
    }

    pub fn get(&self, binding: Binding) -> &[u8] {
        &self.slots[binding.slot() as usize].contents
    }

    pub fn total_size(&self) -> usize {
        self.slots.iter().map(|s| s.contents.len()).sum()
    }
}
