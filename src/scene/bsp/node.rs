use crate::geometry::Aabb;
use bytemuck::{Pod, Zeroable};

/// Split axis of an internal node, encoded as 0, 1, 2 on the GPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub fn index(self) -> usize {
        self as usize
    }
    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Value stored in the low two bits of [`BspNode::flags`] for leaves.
pub const LEAF_TAG: u32 = 3;
/// Leaf triangle counts live above the two tag bits.
pub const COUNT_SHIFT: u32 = 2;
pub const MAX_LEAF_COUNT: u32 = u32::MAX >> COUNT_SHIFT;

/// One record of the "bsp tree" buffer, 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BspNode {
    pub flags: u32,
    pub offset: u32,
    pub left: u32,
    pub right: u32,
}

impl BspNode {
    pub fn internal(axis: Axis, left: u32, right: u32) -> Self {
        Self {
            flags: axis as u32,
            offset: 0,
            left,
            right,
        }
    }
    /// `count` must not exceed [`MAX_LEAF_COUNT`].
    pub fn leaf(offset: u32, count: u32) -> Self {
        Self {
            flags: LEAF_TAG | (count << COUNT_SHIFT),
            offset,
            left: 0,
            right: 0,
        }
    }
    pub fn is_leaf(&self) -> bool {
        self.flags & 3 == LEAF_TAG
    }
    pub fn axis(&self) -> Option<Axis> {
        Axis::from_index((self.flags & 3) as usize)
    }
    pub fn count(&self) -> u32 {
        self.flags >> COUNT_SHIFT
    }
}

/// Arena node produced by the builder.
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionNode {
    Internal {
        axis: Axis,
        plane: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        triangles: Vec<u32>,
    },
}

impl PartitionNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, PartitionNode::Leaf { .. })
    }
}

/// Arena slot: the node plus the region it was built for.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub node: PartitionNode,
    pub bounds: Aabb,
}
