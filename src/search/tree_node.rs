//! Binary tree nodes stored in an arena
//!
//! Nodes reference their parent and children by [`NodeId`]. The arena also
//! keeps a per-layer node list so bottom-up updates can sweep from the deepest
//! layer to the root without walking the tree. Both the two-sided
//! [`BinaryTree`](crate::search::BinaryTree) and the
//! [`SelfBinaryTree`](crate::search::SelfBinaryTree) build on this interface.

use crate::error::{ContactSearchError, Result};
use crate::mesh::geometry::centroid;
use crate::mesh::types::Discretization;
use crate::search::bounding_volume::{BoundingVolume, DopKind};
use serde::{Deserialize, Serialize};

/// Index of a node in a [`TreeNodeArena`]
pub type NodeId = usize;

/// Role of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeNodeType {
    SlaveInner,
    SlaveLeaf,
    MasterInner,
    MasterLeaf,
    SelfInner,
    SelfLeaf,
    /// Placeholder root of an empty slave side
    NoSlaveElements,
    /// Placeholder root of an empty master side
    NoMasterElements,
}

impl TreeNodeType {
    /// Leaf type of the same side
    pub fn leaf(self) -> Self {
        match self {
            TreeNodeType::SlaveInner => TreeNodeType::SlaveLeaf,
            TreeNodeType::MasterInner => TreeNodeType::MasterLeaf,
            TreeNodeType::SelfInner => TreeNodeType::SelfLeaf,
            other => other,
        }
    }

    /// Inner type of the same side
    pub fn inner(self) -> Self {
        match self {
            TreeNodeType::SlaveLeaf => TreeNodeType::SlaveInner,
            TreeNodeType::MasterLeaf => TreeNodeType::MasterInner,
            TreeNodeType::SelfLeaf => TreeNodeType::SelfInner,
            other => other,
        }
    }
}

/// Node of a binary search tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Role of this node
    pub node_type: TreeNodeType,

    /// Global ids of all elements in this subtree
    pub elelist: Vec<usize>,

    /// Depth, root = 0
    pub layer: usize,

    /// Enlarged bounding volume
    pub slabs: BoundingVolume,

    pub parent: Option<NodeId>,

    /// Either no children (leaf) or exactly two
    pub children: Option<[NodeId; 2]>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Owner of all nodes of one or more trees
#[derive(Debug, Clone)]
pub struct TreeNodeArena {
    nodes: Vec<TreeNode>,
    layers: Vec<Vec<NodeId>>,
    kind: DopKind,
    enlarge: f64,
}

impl TreeNodeArena {
    /// Create an empty arena; `enlarge` is applied to every node volume
    pub fn new(kind: DopKind, enlarge: f64) -> Self {
        Self {
            nodes: Vec::new(),
            layers: Vec::new(),
            kind,
            enlarge: enlarge.max(0.0),
        }
    }

    /// Remove all nodes
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.layers.clear();
    }

    pub fn kind(&self) -> DopKind {
        self.kind
    }

    /// Enlargement applied to every node volume
    pub fn enlarge(&self) -> f64 {
        self.enlarge
    }

    pub fn set_enlarge(&mut self, enlarge: f64) {
        self.enlarge = enlarge.max(0.0);
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids per layer, root layer first
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    /// Number of layers
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Iterate over all nodes
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Insert a leaf node and register it in its layer
    pub fn push_node(
        &mut self,
        node_type: TreeNodeType,
        elelist: Vec<usize>,
        layer: usize,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            node_type,
            elelist,
            layer,
            slabs: BoundingVolume::new(self.kind),
            parent,
            children: None,
        });
        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, Vec::new);
        }
        self.layers[layer].push(id);
        id
    }

    /// Compute the node volume directly from the geometry of its elements
    pub fn calculate_slabs_dop(&mut self, id: NodeId, disc: &dyn Discretization) -> Result<()> {
        let mut slabs = BoundingVolume::new(self.kind);
        for &gid in &self.nodes[id].elelist {
            for p in disc.element_hull_points(gid)? {
                slabs.add_point(&p);
            }
        }
        self.nodes[id].slabs = slabs;
        Ok(())
    }

    /// Inflate the node volume by `eps`
    pub fn enlarge_geometry(&mut self, id: NodeId, eps: f64) {
        self.nodes[id].slabs.enlarge(eps);
    }

    /// Update one node from below
    ///
    /// Leaves read the current geometry and are enlarged, inner nodes take the
    /// union of their (already enlarged) children.
    pub fn update_slabs_bottom_up(&mut self, id: NodeId, disc: &dyn Discretization) -> Result<()> {
        match self.nodes[id].children {
            None => {
                self.calculate_slabs_dop(id, disc)?;
                self.enlarge_geometry(id, self.enlarge);
            }
            Some([left, right]) => {
                let merged = self.nodes[left].slabs.merged(&self.nodes[right].slabs)?;
                self.nodes[id].slabs = merged;
            }
        }
        Ok(())
    }

    /// Split a node into two children
    ///
    /// Elements are ordered by the projection of their centroid onto the
    /// widest slab direction and split at the median, so both children are
    /// strictly smaller than the parent. Returns `None` for single-element
    /// nodes, which stay leaves.
    pub fn divide_tree_node(
        &mut self,
        id: NodeId,
        disc: &dyn Discretization,
    ) -> Result<Option<[NodeId; 2]>> {
        if self.nodes[id].elelist.len() < 2 {
            let node = &mut self.nodes[id];
            node.node_type = node.node_type.leaf();
            return Ok(None);
        }

        let direction = self.nodes[id].slabs.longest_direction();
        let mut keyed = Vec::with_capacity(self.nodes[id].elelist.len());
        for &gid in &self.nodes[id].elelist {
            let points = disc.element_hull_points(gid)?;
            let c = centroid(&points).ok_or_else(|| {
                ContactSearchError::InvalidMeshTopology(format!(
                    "Element {} has no geometry",
                    gid
                ))
            })?;
            keyed.push((self.nodes[id].slabs.project(&c, direction), gid));
        }
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let half = keyed.len() / 2;
        let left: Vec<usize> = keyed[..half].iter().map(|(_, g)| *g).collect();
        let right: Vec<usize> = keyed[half..].iter().map(|(_, g)| *g).collect();

        let layer = self.nodes[id].layer + 1;
        let child_type = self.nodes[id].node_type.leaf();
        let l = self.push_node(child_type, left, layer, Some(id));
        let r = self.push_node(child_type, right, layer, Some(id));

        let node = &mut self.nodes[id];
        node.node_type = node.node_type.inner();
        node.children = Some([l, r]);
        Ok(Some([l, r]))
    }

    /// Build the subtree below `root` top-down by recursive division
    pub fn build_subtree(&mut self, root: NodeId, disc: &dyn Discretization) -> Result<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.calculate_slabs_dop(id, disc)?;
            self.enlarge_geometry(id, self.enlarge);
            if let Some([l, r]) = self.divide_tree_node(id, disc)? {
                stack.push(l);
                stack.push(r);
            }
        }
        Ok(())
    }

    /// Recompute every node below `root` directly from the geometry
    pub fn update_top_down(&mut self, root: NodeId, disc: &dyn Discretization) -> Result<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.calculate_slabs_dop(id, disc)?;
            self.enlarge_geometry(id, self.enlarge);
            if let Some(children) = self.nodes[id].children {
                stack.extend_from_slice(&children);
            }
        }
        Ok(())
    }

    /// Update every node in the arena from the deepest layer up to the roots
    pub fn update_bottom_up(&mut self, disc: &dyn Discretization) -> Result<()> {
        for layer in (0..self.layers.len()).rev() {
            for i in 0..self.layers[layer].len() {
                let id = self.layers[layer][i];
                self.update_slabs_bottom_up(id, disc)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::{BeamElement, BeamMesh, CurveShape, Point};

    fn chain(n: usize) -> BeamMesh {
        let mut mesh = BeamMesh::new();
        for i in 0..=n {
            mesh.add_node(Point::new(i as f64, 0.0, 0.0));
        }
        for i in 0..n {
            mesh.add_element(BeamElement::new(i, vec![i, i + 1], CurveShape::Line2, 0.05))
                .unwrap();
        }
        mesh
    }

    #[test]
    fn test_build_divides_to_single_elements() {
        let mesh = chain(7);
        let mut arena = TreeNodeArena::new(DopKind::Dop18, 0.1);
        let root = arena.push_node(TreeNodeType::SlaveInner, (0..7).collect(), 0, None);
        arena.build_subtree(root, &mesh).unwrap();

        let mut leaf_elements = Vec::new();
        for (_, node) in arena.nodes() {
            match node.children {
                None => {
                    assert_eq!(node.elelist.len(), 1);
                    assert_eq!(node.node_type, TreeNodeType::SlaveLeaf);
                    leaf_elements.extend_from_slice(&node.elelist);
                }
                Some([l, r]) => {
                    assert_eq!(node.node_type, TreeNodeType::SlaveInner);
                    assert!(arena.node(l).elelist.len() < node.elelist.len());
                    assert!(arena.node(r).elelist.len() < node.elelist.len());
                    assert_eq!(arena.node(l).layer, node.layer + 1);
                }
            }
        }
        leaf_elements.sort_unstable();
        assert_eq!(leaf_elements, (0..7).collect::<Vec<_>>());
        assert_eq!(arena.num_nodes(), 13);
    }

    #[test]
    fn test_bottom_up_encloses_children() {
        let mut mesh = chain(5);
        let mut arena = TreeNodeArena::new(DopKind::Aabb, 0.1);
        let root = arena.push_node(TreeNodeType::MasterInner, (0..5).collect(), 0, None);
        arena.build_subtree(root, &mesh).unwrap();

        mesh.displace_nodes(|i, _| crate::mesh::types::Vec3::new(0.0, 0.3 * i as f64, 0.0));
        arena.update_bottom_up(&mesh).unwrap();

        for (_, node) in arena.nodes() {
            if let Some([l, r]) = node.children {
                assert!(node.slabs.contains(&arena.node(l).slabs));
                assert!(node.slabs.contains(&arena.node(r).slabs));
            }
        }
        let root_slabs = &arena.node(root).slabs.slabs()[1];
        assert!(root_slabs.max >= 1.5 + 0.1 - 1e-12);
    }

    #[test]
    fn test_single_element_is_leaf() {
        let mesh = chain(1);
        let mut arena = TreeNodeArena::new(DopKind::Dop18, 0.0);
        let root = arena.push_node(TreeNodeType::SlaveInner, vec![0], 0, None);
        arena.build_subtree(root, &mesh).unwrap();
        assert!(arena.node(root).is_leaf());
        assert_eq!(arena.node(root).node_type, TreeNodeType::SlaveLeaf);
    }
}
