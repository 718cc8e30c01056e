use crate::error::Result;
use crate::geometry::{compute_aabb, Aabb, Mesh};
use crate::scene::bsp::node::{Axis, PartitionNode, Slot};
use glam::Vec3;
use std::time::Instant;

/// Policy constants for tree construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    pub max_depth: u32,
    /// Sets this small or smaller become leaves without trying to split.
    pub max_leaf_triangles: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            max_leaf_triangles: 4,
        }
    }
}

/// Binary split-plane tree over a mesh. Nodes are stored in depth-first
/// pre-order, left before right, so node 0 is the root and an index here is
/// the same index the GPU sees after flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct BspTree {
    nodes: Vec<Slot>,
    bounds: Aabb,
    depth: u32,
    triangle_count: usize,
}

struct Builder<'a> {
    config: &'a BuildConfig,
    tri_bounds: Vec<Aabb>,
    nodes: Vec<Slot>,
    depth: u32,
}

struct Split {
    axis: Axis,
    plane: f32,
    left: Vec<u32>,
    right: Vec<u32>,
}

impl Builder<'_> {
    fn bounds_of(&self, triangles: &[u32]) -> Aabb {
        triangles
            .iter()
            .fold(Aabb::empty(), |acc, &t| acc.union(&self.tri_bounds[t as usize]))
    }

    fn subdivide(&mut self, triangles: Vec<u32>, bounds: Aabb, depth: u32) -> u32 {
        let id = self.nodes.len() as u32;
        self.depth = self.depth.max(depth);
        self.nodes.push(Slot {
            node: PartitionNode::Leaf {
                triangles: Vec::new(),
            },
            bounds,
        });
        let Some(split) = self.split(&triangles, &bounds, depth) else {
            self.nodes[id as usize].node = PartitionNode::Leaf { triangles };
            return id;
        };
        let axis = split.axis.index();
        let mut left_region = bounds;
        left_region.max[axis] = split.plane;
        let mut right_region = bounds;
        right_region.min[axis] = split.plane;
        let left_bounds = clip(self.bounds_of(&split.left), &left_region);
        let right_bounds = clip(self.bounds_of(&split.right), &right_region);
        let left = self.subdivide(split.left, left_bounds, depth + 1);
        let right = self.subdivide(split.right, right_bounds, depth + 1);
        self.nodes[id as usize].node = PartitionNode::Internal {
            axis: split.axis,
            plane: split.plane,
            left,
            right,
        };
        id
    }

    fn split(&self, triangles: &[u32], bounds: &Aabb, depth: u32) -> Option<Split> {
        if triangles.len() <= self.config.max_leaf_triangles || depth >= self.config.max_depth {
            return None;
        }
        let axis = bounds.longest_axis();
        let (lo, hi) = (bounds.min[axis], bounds.max[axis]);
        let plane = lo + (hi - lo) * 0.5;
        if !(plane > lo && plane < hi) {
            return None;
        }
        let left: Vec<u32> = triangles
            .iter()
            .copied()
            .filter(|&t| self.tri_bounds[t as usize].min[axis] <= plane)
            .collect();
        let right: Vec<u32> = triangles
            .iter()
            .copied()
            .filter(|&t| self.tri_bounds[t as usize].max[axis] >= plane)
            .collect();
        // no progress on this axis
        if left.len() == triangles.len() || right.len() == triangles.len() {
            return None;
        }
        Some(Split {
            axis: Axis::from_index(axis)?,
            plane,
            left,
            right,
        })
    }
}

fn clip(bounds: Aabb, region: &Aabb) -> Aabb {
    let ret = bounds.intersection(region);
    if ret.is_empty() {
        *region
    } else {
        ret
    }
}

impl BspTree {
    pub fn build(mesh: &Mesh, config: &BuildConfig) -> Result<Self> {
        mesh.validate()?;
        let start = Instant::now();
        let n = mesh.triangle_count();
        let triangles: Vec<u32> = (0..n as u32).collect();
        let bounds = compute_aabb(&triangles, mesh);
        if n == 0 {
            log::warn!("building bsp tree over an empty mesh");
        }
        let mut builder = Builder {
            config,
            tri_bounds: (0..n).map(|t| mesh.triangle_bounds(t)).collect(),
            nodes: Vec::new(),
            depth: 0,
        };
        builder.subdivide(triangles, bounds, 0);
        let ret = Self {
            nodes: builder.nodes,
            bounds,
            depth: builder.depth,
            triangle_count: n,
        };
        log::debug!(
            "bsp tree: {} triangles, {} nodes, {} leaves, depth {}, {} duplicated references, built in {:?}",
            n,
            ret.node_count(),
            ret.leaf_count(),
            ret.depth,
            ret.reference_count().saturating_sub(n),
            start.elapsed()
        );
        Ok(ret)
    }

    pub fn nodes(&self) -> &[Slot] {
        &self.nodes
    }

    pub fn node(&self, id: u32) -> &PartitionNode {
        &self.nodes[id as usize].node
    }

    /// Region a node was built for: the root box clipped by every ancestor plane.
    pub fn node_bounds(&self, id: u32) -> Aabb {
        self.nodes[id as usize].bounds
    }

    pub fn root_bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|s| s.node.is_leaf()).count()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Total leaf entries, counting straddling triangles once per leaf.
    pub fn reference_count(&self) -> usize {
        self.leaves().map(|(_, t)| t.len()).sum()
    }

    /// Leaves in pre-order with their node ids.
    pub fn leaves(&self) -> impl Iterator<Item = (u32, &[u32])> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.node {
                PartitionNode::Leaf { triangles } => Some((i as u32, triangles.as_slice())),
                PartitionNode::Internal { .. } => None,
            })
    }

    /// Id of the leaf whose region holds `p`. Points on a plane go right.
    pub fn locate(&self, p: Vec3) -> u32 {
        let mut id = 0;
        while let PartitionNode::Internal {
            axis,
            plane,
            left,
            right,
        } = self.node(id)
        {
            id = if p[axis.index()] < *plane { *left } else { *right };
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_cube() {
        let mesh = Mesh::load_obj(include_bytes!("../../../assets/cube.obj")).unwrap();
        let tree = BspTree::build(&mesh, &BuildConfig::default()).unwrap();
        assert_eq!(tree.triangle_count(), 12);
        assert_eq!(tree.root_bounds(), Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        assert!(tree.node_count() > 1);
        assert_eq!(tree.node_count(), 2 * tree.leaf_count() - 1);
        match tree.node(0) {
            PartitionNode::Internal { axis, plane, .. } => {
                assert_eq!(*axis, Axis::X);
                assert_eq!(*plane, 0.0);
            }
            PartitionNode::Leaf { .. } => panic!("cube root should split"),
        }
    }

    #[test]
    fn zero_depth_is_a_single_leaf() {
        let mesh = Mesh::load_obj(include_bytes!("../../../assets/cube.obj")).unwrap();
        let config = BuildConfig {
            max_depth: 0,
            max_leaf_triangles: 0,
        };
        let tree = BspTree::build(&mesh, &config).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.reference_count(), 12);
    }

    #[test]
    fn empty_mesh_is_a_single_empty_leaf() {
        let tree = BspTree::build(&Mesh::default(), &BuildConfig::default()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.root_bounds().is_empty());
        assert_eq!(tree.leaves().next(), Some((0, &[] as &[u32])));
    }

    #[test]
    fn first_child_follows_parent() {
        let mesh = Mesh::load_obj(include_bytes!("../../../assets/cube.obj")).unwrap();
        let tree = BspTree::build(&mesh, &BuildConfig::default()).unwrap();
        for (i, slot) in tree.nodes().iter().enumerate() {
            if let PartitionNode::Internal { left, right, .. } = slot.node {
                assert_eq!(left as usize, i + 1);
                assert!(right > left);
            }
        }
    }
}
