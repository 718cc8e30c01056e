//! Error types for mesh ingest, tree construction and GPU upload.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A triangle references a vertex that does not exist
    #[error("Malformed mesh: triangle {triangle} references vertex {index} (vertex count: {vertex_count})")]
    MalformedMesh {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// A flat attribute array is not made of whole triples
    #[error("Invalid {name} array length {len}: expected a multiple of 3")]
    InvalidArrayLength { name: &'static str, len: usize },

    /// Per-triangle material table does not match the triangle count
    #[error("Material index count mismatch: expected {expected}, got {actual}")]
    MaterialCountMismatch { expected: usize, actual: usize },

    /// A triangle points past the end of the material table
    #[error("Malformed mesh: triangle {triangle} uses material {material} (material count: {material_count})")]
    MaterialOutOfRange {
        triangle: usize,
        material: u32,
        material_count: usize,
    },

    /// Nothing to upload
    #[error("Mesh has no triangles")]
    EmptyMesh,

    /// Serialized data does not fit the destination
    #[error("Capacity overflow: {buffer} needs {size} but the limit is {limit}")]
    CapacityOverflow {
        buffer: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("OBJ load failed: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("Device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_mesh_names_the_triangle() {
        let e = Error::MalformedMesh {
            triangle: 7,
            index: 42,
            vertex_count: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("triangle 7"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn capacity_overflow_reports_sizes() {
        let e = Error::CapacityOverflow {
            buffer: "bsp tree",
            size: 2048,
            limit: 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("bsp tree"));
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn obj_errors_convert() {
        let err: Error = tobj::LoadError::OpenFileFailed.into();
        assert!(matches!(err, Error::ObjLoad(_)));
    }
}
