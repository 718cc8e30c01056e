use crate::error::{Error, Result};
use crate::geometry::Aabb;
use crate::scene::Material;
use glam::{Vec3, Vec4};
use std::io::BufReader;
use std::path::Path;

/// Indexed triangle mesh with one material slot per triangle.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    /// Per-vertex normals, empty when the asset has none.
    pub normals: Vec<Vec3>,
    pub materials: Vec<Material>,
    pub material_indices: Vec<u32>,
}

fn triples(name: &'static str, data: &[f32]) -> Result<Vec<Vec3>> {
    if data.len() % 3 != 0 {
        return Err(Error::InvalidArrayLength {
            name,
            len: data.len(),
        });
    }
    Ok(data
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect())
}

impl Mesh {
    /// Builds a mesh with a single default material.
    pub fn new(positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        let n = indices.len();
        Self {
            positions,
            indices,
            normals: Vec::new(),
            materials: vec![Material::default()],
            material_indices: vec![0; n],
        }
    }

    /// Builds a mesh from the flat arrays an asset loader hands out.
    pub fn from_flat(positions: &[f32], indices: &[u32], normals: &[f32]) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidArrayLength {
                name: "index",
                len: indices.len(),
            });
        }
        let mut mesh = Self::new(
            triples("position", positions)?,
            indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
        );
        mesh.normals = triples("normal", normals)?;
        Ok(mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks that every index references a position and that every triangle has a material slot.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.positions.len();
        for (triangle, tri) in self.indices.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(Error::MalformedMesh {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        if self.material_indices.len() != self.indices.len() {
            return Err(Error::MaterialCountMismatch {
                expected: self.indices.len(),
                actual: self.material_indices.len(),
            });
        }
        let material_count = self.materials.len();
        if let Some((triangle, &material)) = self
            .material_indices
            .iter()
            .enumerate()
            .find(|&(_, &m)| m as usize >= material_count)
        {
            return Err(Error::MaterialOutOfRange {
                triangle,
                material,
                material_count,
            });
        }
        Ok(())
    }

    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[t];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    pub fn triangle_bounds(&self, t: usize) -> Aabb {
        let mut ret = Aabb::empty();
        for p in self.triangle(t) {
            ret.grow(p);
        }
        ret
    }

    /// Appends `other`, shifting its vertex and material references.
    pub fn merge(&mut self, other: Mesh) {
        let vertex_offset = self.positions.len() as u32;
        let material_offset = self.materials.len() as u32;
        if self.normals.len() == self.positions.len() && other.normals.len() == other.positions.len()
        {
            self.normals.extend(other.normals);
        } else {
            self.normals.clear();
        }
        self.positions.extend(other.positions);
        self.indices.extend(
            other
                .indices
                .into_iter()
                .map(|t| t.map(|i| i + vertex_offset)),
        );
        self.materials.extend(other.materials);
        self.material_indices.extend(
            other
                .material_indices
                .into_iter()
                .map(|m| m + material_offset),
        );
    }

    /// Replaces every material slot with `material`.
    pub fn with_material(mut self, material: Material) -> Self {
        self.materials = vec![material];
        self.material_indices = vec![0; self.indices.len()];
        self
    }

    pub fn load_obj(source: &[u8]) -> Result<Self> {
        let mut reader = BufReader::new(source);
        let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_matpath| {
            Err(tobj::LoadError::GenericFailure)
        })?;
        Ok(Self::from_models(models, materials.unwrap_or_default()))
    }

    pub fn load_obj_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(path, &load_options())?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("{}: no usable material library ({e})", path.display());
            Vec::new()
        });
        let mesh = Self::from_models(models, materials);
        log::info!(
            "loaded {}: {} vertices, {} triangles, {} materials",
            path.display(),
            mesh.positions.len(),
            mesh.triangle_count(),
            mesh.materials.len()
        );
        Ok(mesh)
    }

    fn from_models(models: Vec<tobj::Model>, materials: Vec<tobj::Material>) -> Self {
        let mut ret = Self::default();
        ret.materials = materials.iter().map(material_from_obj).collect();
        if ret.materials.is_empty() {
            ret.materials.push(Material::default());
        }
        let material_count = ret.materials.len();
        let mut has_normals = true;
        for model in models {
            let mesh = model.mesh;
            let offset = ret.positions.len() as u32;
            let material = mesh
                .material_id
                .filter(|&m| m < material_count)
                .unwrap_or(0) as u32;
            has_normals &= mesh.normals.len() == mesh.positions.len();
            ret.positions.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2])),
            );
            ret.normals.extend(
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2])),
            );
            for t in mesh.indices.chunks_exact(3) {
                ret.indices.push([offset + t[0], offset + t[1], offset + t[2]]);
                ret.material_indices.push(material);
            }
        }
        if !has_normals {
            ret.normals.clear();
        }
        ret
    }
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

fn material_from_obj(m: &tobj::Material) -> Material {
    let default = Material::default();
    let color = m
        .diffuse
        .map(|[r, g, b]| Vec4::new(r, g, b, m.dissolve.unwrap_or(1.0)))
        .unwrap_or(default.color);
    // tobj keeps non-standard keys such as Ke as raw strings
    let emission = m
        .unknown_param
        .get("Ke")
        .and_then(|s| {
            let v = s
                .split_whitespace()
                .map(|x| x.parse::<f32>().ok())
                .collect::<Option<Vec<f32>>>()?;
            match v.as_slice() {
                [r, g, b] => Some(Vec4::new(*r, *g, *b, 1.0)),
                _ => None,
            }
        })
        .unwrap_or(default.emission);
    Material::new(color, emission)
}
