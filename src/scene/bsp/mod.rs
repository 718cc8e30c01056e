pub mod flat;
pub mod node;
pub mod traverse;
pub mod tree;
pub use flat::FlatTree;
pub use node::{Axis, BspNode, PartitionNode};
pub use traverse::{brute_force_hit, Hit, MAX_TRAVERSAL_DEPTH};
pub use tree::{BspTree, BuildConfig};
