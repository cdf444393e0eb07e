//! Spatial search: k-DOP volumes, binary trees and collision search

pub mod binary_tree;
pub mod bounding_volume;
pub mod collision;
pub mod communicator;
pub mod self_tree;
pub mod tree_node;

pub use binary_tree::BinaryTree;
pub use bounding_volume::{BoundingVolume, DopKind, Slab};
pub use collision::{
    collision_search, global_collision_search, CollisionSearchResult,
    GlobalCollisionSearchResult,
};
pub use communicator::{Communicator, CommunicatorExt, SerialCommunicator, ThreadCommunicator};
pub use self_tree::SelfBinaryTree;
pub use tree_node::{NodeId, TreeNode, TreeNodeArena, TreeNodeType};
