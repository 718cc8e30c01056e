use crate::error::{Error, Result};
use crate::geometry::Aabb;
use crate::scene::bsp::node::{BspNode, PartitionNode, MAX_LEAF_COUNT};
use crate::scene::bsp::BspTree;
use glam::Vec3;
use std::mem::size_of;

/// GPU-ready form of a [`BspTree`]: `nodes` and `planes` run in lockstep,
/// leaves slice into `leaf_ids` through `offset` and `count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTree {
    pub nodes: Vec<BspNode>,
    pub planes: Vec<f32>,
    pub leaf_ids: Vec<u32>,
    pub bounds: Aabb,
    /// Depth of the deepest leaf, 0 for a lone root leaf.
    pub depth: u32,
}

impl BspTree {
    pub fn flatten(&self) -> Result<FlatTree> {
        let mut ret = FlatTree {
            nodes: Vec::with_capacity(self.node_count()),
            planes: Vec::with_capacity(self.node_count()),
            leaf_ids: Vec::with_capacity(self.reference_count()),
            bounds: self.root_bounds(),
            depth: self.depth(),
        };
        for slot in self.nodes() {
            match &slot.node {
                PartitionNode::Internal {
                    axis,
                    plane,
                    left,
                    right,
                } => {
                    ret.nodes.push(BspNode::internal(*axis, *left, *right));
                    ret.planes.push(*plane);
                }
                PartitionNode::Leaf { triangles } => {
                    let count = triangles.len() as u64;
                    if count > MAX_LEAF_COUNT as u64 {
                        return Err(Error::CapacityOverflow {
                            buffer: "bsp tree leaf count",
                            size: count,
                            limit: MAX_LEAF_COUNT as u64,
                        });
                    }
                    let offset = ret.leaf_ids.len() as u64;
                    if offset + count > u32::MAX as u64 {
                        return Err(Error::CapacityOverflow {
                            buffer: "tree ids",
                            size: offset + count,
                            limit: u32::MAX as u64,
                        });
                    }
                    ret.nodes.push(BspNode::leaf(offset as u32, count as u32));
                    ret.planes.push(0.0);
                    ret.leaf_ids.extend_from_slice(triangles);
                }
            }
        }
        log::debug!(
            "flattened bsp tree: {} nodes, {} leaf ids, {} bytes",
            ret.nodes.len(),
            ret.leaf_ids.len(),
            ret.byte_size()
        );
        Ok(ret)
    }
}

impl FlatTree {
    pub fn leaf_slice(&self, node: &BspNode) -> &[u32] {
        let start = node.offset as usize;
        &self.leaf_ids[start..start + node.count() as usize]
    }

    /// Walks the flat arrays from node 0 and collects every leaf's triangle
    /// list, left before right.
    pub fn leaf_sets(&self) -> Vec<Vec<u32>> {
        let mut ret = Vec::new();
        if self.nodes.is_empty() {
            return ret;
        }
        let mut stack = vec![0u32];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.is_leaf() {
                ret.push(self.leaf_slice(node).to_vec());
            } else {
                stack.push(node.right);
                stack.push(node.left);
            }
        }
        ret
    }

    /// Same descent the shader performs: `p[axis] < plane` goes left.
    pub fn locate(&self, p: Vec3) -> u32 {
        let mut id = 0u32;
        loop {
            let node = &self.nodes[id as usize];
            match node.axis() {
                Some(axis) => {
                    id = if p[axis.index()] < self.planes[id as usize] {
                        node.left
                    } else {
                        node.right
                    };
                }
                None => return id,
            }
        }
    }

    pub fn byte_size(&self) -> usize {
        self.nodes.len() * size_of::<BspNode>()
            + self.planes.len() * size_of::<f32>()
            + self.leaf_ids.len() * size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::scene::bsp::BuildConfig;

    #[test]
    fn cube_layout() {
        let mesh = Mesh::load_obj(include_bytes!("../../../assets/cube.obj")).unwrap();
        let tree = BspTree::build(&mesh, &BuildConfig::default()).unwrap();
        let flat = tree.flatten().unwrap();
        assert_eq!(flat.nodes.len(), tree.node_count());
        assert_eq!(flat.planes.len(), flat.nodes.len());
        assert_eq!(flat.leaf_ids.len(), tree.reference_count());
        let mut next = 0;
        for node in flat.nodes.iter().filter(|n| n.is_leaf()) {
            assert_eq!(node.offset, next);
            next += node.count();
        }
        assert_eq!(next as usize, flat.leaf_ids.len());
    }

    #[test]
    fn leaf_planes_are_zero() {
        let mesh = Mesh::load_obj(include_bytes!("../../../assets/cube.obj")).unwrap();
        let flat = BspTree::build(&mesh, &BuildConfig::default())
            .unwrap()
            .flatten()
            .unwrap();
        for (node, plane) in flat.nodes.iter().zip(&flat.planes) {
            if node.is_leaf() {
                assert_eq!(*plane, 0.0);
            }
        }
    }
}
