//! Self-contact variant of the binary tree
//!
//! A single element set is searched against itself. Each unordered pair is
//! reported once; an element is never paired with itself or with an element
//! it shares a node with.

use crate::config::{SearchParameters, TreeUpdateType};
use crate::error::{ContactSearchError, Result};
use crate::mesh::types::Discretization;
use crate::search::tree_node::{NodeId, TreeNodeArena, TreeNodeType};
use std::collections::BTreeSet;

/// Binary tree over one element set for self contact
#[derive(Debug, Clone)]
pub struct SelfBinaryTree {
    element_ids: Vec<usize>,
    params: SearchParameters,
    arena: TreeNodeArena,
    root: Option<NodeId>,
    topology_revision: Option<u64>,
    pairs: BTreeSet<(usize, usize)>,
}

impl SelfBinaryTree {
    pub fn new(mut element_ids: Vec<usize>, params: SearchParameters) -> Self {
        element_ids.sort_unstable();
        element_ids.dedup();
        let arena = TreeNodeArena::new(params.dop, 0.0);
        Self {
            element_ids,
            params,
            arena,
            root: None,
            topology_revision: None,
            pairs: BTreeSet::new(),
        }
    }

    /// Build the tree from scratch
    pub fn init(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.arena.clear();
        self.pairs.clear();

        let mut min_length = f64::INFINITY;
        for &gid in &self.element_ids {
            min_length = min_length.min(disc.element(gid)?.ref_length);
        }
        if min_length.is_finite() {
            self.arena.set_enlarge(self.params.eps.max(0.0) * min_length);
        }

        if self.element_ids.is_empty() {
            self.root = None;
        } else {
            let root = self.arena.push_node(
                TreeNodeType::SelfInner,
                self.element_ids.clone(),
                0,
                None,
            );
            self.arena.build_subtree(root, disc)?;
            self.root = Some(root);
        }
        self.topology_revision = Some(disc.topology_revision());

        log::info!(
            "Initialized self binary tree: {} elements, {} nodes",
            self.element_ids.len(),
            self.arena.num_nodes()
        );
        Ok(())
    }

    /// Update the tree and return all unordered candidate pairs `(a, b)` with `a < b`
    pub fn evaluate_search(&mut self, disc: &dyn Discretization) -> Result<&BTreeSet<(usize, usize)>> {
        let expected = self.topology_revision.ok_or_else(|| {
            ContactSearchError::ConfigError(
                "Self binary tree must be initialized before searching".to_string(),
            )
        })?;
        let found = disc.topology_revision();
        if expected != found {
            return Err(ContactSearchError::TreeTopologyChanged { expected, found });
        }

        if let Some(root) = self.root {
            match self.params.update_type {
                TreeUpdateType::TopDown => self.arena.update_top_down(root, disc)?,
                TreeUpdateType::BottomUp => self.arena.update_bottom_up(disc)?,
            }
        }
        self.search_self_contact(disc)?;
        Ok(&self.pairs)
    }

    fn search_self_contact(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.pairs.clear();
        let Some(root) = self.root else {
            return Ok(());
        };

        let mut stack = vec![(root, root)];
        while let Some((a, b)) = stack.pop() {
            let anode = self.arena.node(a);
            let bnode = self.arena.node(b);

            if a == b {
                if let Some([l, r]) = anode.children {
                    stack.push((l, l));
                    stack.push((r, r));
                    stack.push((l, r));
                }
                continue;
            }
            if !anode.slabs.intersects(&bnode.slabs) {
                continue;
            }
            match (anode.children, bnode.children) {
                (None, None) => {
                    for &ga in &anode.elelist {
                        for &gb in &bnode.elelist {
                            if ga != gb && !share_node(disc, ga, gb)? {
                                self.pairs.insert((ga.min(gb), ga.max(gb)));
                            }
                        }
                    }
                }
                (Some([l, r]), None) => {
                    stack.push((l, b));
                    stack.push((r, b));
                }
                (None, Some([l, r])) => {
                    stack.push((a, l));
                    stack.push((a, r));
                }
                (Some([al, ar]), Some(_)) => {
                    if anode.elelist.len() >= bnode.elelist.len() {
                        stack.push((al, b));
                        stack.push((ar, b));
                    } else if let Some([bl, br]) = bnode.children {
                        stack.push((a, bl));
                        stack.push((a, br));
                    }
                }
            }
        }
        Ok(())
    }

    /// Candidate pairs of the last search
    pub fn pairs(&self) -> &BTreeSet<(usize, usize)> {
        &self.pairs
    }

    pub fn arena(&self) -> &TreeNodeArena {
        &self.arena
    }
}

fn share_node(disc: &dyn Discretization, a: usize, b: usize) -> Result<bool> {
    let nodes_a = &disc.element(a)?.node_ids;
    let nodes_b = &disc.element(b)?.node_ids;
    Ok(nodes_a.iter().any(|n| nodes_b.contains(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::{BeamElement, BeamMesh, CurveShape, Point};

    /// A chain folded back onto itself: x goes 0..4 at y=0, then back at y=0.1
    fn hairpin() -> BeamMesh {
        let mut mesh = BeamMesh::new();
        for i in 0..=4 {
            mesh.add_node(Point::new(i as f64, 0.0, 0.0));
        }
        for i in (0..4).rev() {
            mesh.add_node(Point::new(i as f64, 0.1, 0.0));
        }
        for e in 0..8 {
            mesh.add_element(BeamElement::new(e, vec![e, e + 1], CurveShape::Line2, 0.02))
                .unwrap();
        }
        mesh
    }

    #[test]
    fn test_self_search_finds_folded_neighbours() {
        let mesh = hairpin();
        let mut tree = SelfBinaryTree::new((0..8).collect(), SearchParameters::default());
        tree.init(&mesh).unwrap();
        let pairs = tree.evaluate_search(&mesh).unwrap().clone();

        // element 0 (x in [0,1], y=0) lies under element 7 (x in [1,0], y=0.1)
        assert!(pairs.contains(&(0, 7)));
        // neighbours along the chain share a node and are skipped
        assert!(!pairs.contains(&(0, 1)));
        assert!(!pairs.contains(&(3, 4)));
        assert!(pairs.iter().all(|(a, b)| a < b));
    }

    #[test]
    fn test_self_search_bottom_up_matches_top_down() {
        let mesh = hairpin();
        let mut results = Vec::new();
        for update_type in [TreeUpdateType::TopDown, TreeUpdateType::BottomUp] {
            let params = SearchParameters {
                update_type,
                ..Default::default()
            };
            let mut tree = SelfBinaryTree::new((0..8).collect(), params);
            tree.init(&mesh).unwrap();
            results.push(tree.evaluate_search(&mesh).unwrap().clone());
        }
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_empty_self_tree() {
        let mesh = hairpin();
        let mut tree = SelfBinaryTree::new(vec![], SearchParameters::default());
        tree.init(&mesh).unwrap();
        assert!(tree.evaluate_search(&mesh).unwrap().is_empty());
    }
}
