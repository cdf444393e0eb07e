//! Two-sided binary search tree over slave and master elements
//!
//! The tree is built once with [`BinaryTree::init`] and refreshed every step
//! with [`BinaryTree::evaluate_search`], which updates the node volumes
//! according to the configured [`TreeUpdateType`] and runs a simultaneous
//! traversal of both sides to collect candidate pairs.

use crate::config::{SearchParameters, TreeUpdateType};
use crate::error::{ContactSearchError, Result};
use crate::mesh::types::Discretization;
use crate::search::tree_node::{NodeId, TreeNodeArena, TreeNodeType};
use std::collections::{BTreeMap, BTreeSet};

/// Binary tree over two disjoint element sets
#[derive(Debug, Clone)]
pub struct BinaryTree {
    slave_ids: Vec<usize>,
    master_ids: Vec<usize>,
    params: SearchParameters,
    arena: TreeNodeArena,
    slave_root: Option<NodeId>,
    master_root: Option<NodeId>,
    topology_revision: Option<u64>,
    contact_map: BTreeMap<usize, Vec<usize>>,
}

impl BinaryTree {
    /// Create a tree over the given element sets; call [`BinaryTree::init`] before searching
    pub fn new(
        slave_ids: Vec<usize>,
        master_ids: Vec<usize>,
        params: SearchParameters,
    ) -> Result<Self> {
        let slave_ids = sorted_unique(slave_ids);
        let master_ids = sorted_unique(master_ids);
        let master_set: BTreeSet<usize> = master_ids.iter().copied().collect();
        if let Some(gid) = slave_ids.iter().find(|gid| master_set.contains(gid)) {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Element {} is part of both the slave and the master side",
                gid
            )));
        }

        let arena = TreeNodeArena::new(params.dop, 0.0);
        Ok(Self {
            slave_ids,
            master_ids,
            params,
            arena,
            slave_root: None,
            master_root: None,
            topology_revision: None,
            contact_map: BTreeMap::new(),
        })
    }

    /// Build both sides from scratch
    ///
    /// Also the way to recover after elements were added or removed.
    pub fn init(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.arena.clear();
        self.contact_map.clear();
        self.set_enlarge(disc)?;

        self.slave_root = Some(self.build_side(
            self.slave_ids.clone(),
            TreeNodeType::SlaveInner,
            TreeNodeType::NoSlaveElements,
            disc,
        )?);
        self.master_root = Some(self.build_side(
            self.master_ids.clone(),
            TreeNodeType::MasterInner,
            TreeNodeType::NoMasterElements,
            disc,
        )?);
        self.topology_revision = Some(disc.topology_revision());

        log::info!(
            "Initialized binary tree: {} slave and {} master elements, {} nodes, {} layers, enlargement {:.3e}",
            self.slave_ids.len(),
            self.master_ids.len(),
            self.arena.num_nodes(),
            self.arena.depth(),
            self.arena.enlarge()
        );
        Ok(())
    }

    fn build_side(
        &mut self,
        ids: Vec<usize>,
        inner: TreeNodeType,
        empty: TreeNodeType,
        disc: &dyn Discretization,
    ) -> Result<NodeId> {
        if ids.is_empty() {
            return Ok(self.arena.push_node(empty, ids, 0, None));
        }
        let root = self.arena.push_node(inner, ids, 0, None);
        self.arena.build_subtree(root, disc)?;
        Ok(root)
    }

    /// Enlargement = eps times the smallest reference length of all tree elements
    fn set_enlarge(&mut self, disc: &dyn Discretization) -> Result<()> {
        let mut min_length = f64::INFINITY;
        for &gid in self.slave_ids.iter().chain(self.master_ids.iter()) {
            min_length = min_length.min(disc.element(gid)?.ref_length);
        }
        let enlarge = if min_length.is_finite() {
            self.params.eps.max(0.0) * min_length
        } else {
            0.0
        };
        self.arena.set_enlarge(enlarge);
        Ok(())
    }

    /// Update the tree for the current geometry and search for candidate pairs
    pub fn evaluate_search(
        &mut self,
        disc: &dyn Discretization,
    ) -> Result<&BTreeMap<usize, Vec<usize>>> {
        let expected = self.topology_revision.ok_or_else(|| {
            ContactSearchError::ConfigError(
                "Binary tree must be initialized before searching".to_string(),
            )
        })?;
        let found = disc.topology_revision();
        if expected != found {
            return Err(ContactSearchError::TreeTopologyChanged { expected, found });
        }

        match self.params.update_type {
            TreeUpdateType::TopDown => self.update_tree_top_down(disc)?,
            TreeUpdateType::BottomUp => self.update_tree_bottom_up(disc)?,
        }
        self.search_contact();
        Ok(&self.contact_map)
    }

    /// Recompute every node volume from geometry, root to leaves
    pub fn update_tree_top_down(&mut self, disc: &dyn Discretization) -> Result<()> {
        for root in [self.slave_root, self.master_root].into_iter().flatten() {
            if !self.arena.node(root).elelist.is_empty() {
                self.arena.update_top_down(root, disc)?;
            }
        }
        Ok(())
    }

    /// Recompute leaves from geometry and merge upwards using the layer maps
    pub fn update_tree_bottom_up(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.arena.update_bottom_up(disc)
    }

    /// Simultaneous traversal of the slave and master tree
    pub fn search_contact(&mut self) {
        self.contact_map.clear();
        let (Some(slave), Some(master)) = (self.slave_root, self.master_root) else {
            return;
        };
        if self.arena.node(slave).node_type == TreeNodeType::NoSlaveElements
            || self.arena.node(master).node_type == TreeNodeType::NoMasterElements
        {
            return;
        }

        let mut stack = vec![(slave, master)];
        while let Some((s, m)) = stack.pop() {
            let snode = self.arena.node(s);
            let mnode = self.arena.node(m);
            if !snode.slabs.intersects(&mnode.slabs) {
                continue;
            }
            match (snode.children, mnode.children) {
                (None, None) => {
                    for &sgid in &snode.elelist {
                        let entry = self.contact_map.entry(sgid).or_default();
                        entry.extend_from_slice(&mnode.elelist);
                    }
                }
                (Some([l, r]), None) => {
                    stack.push((l, m));
                    stack.push((r, m));
                }
                (None, Some([l, r])) => {
                    stack.push((s, l));
                    stack.push((s, r));
                }
                (Some([sl, sr]), Some([ml, mr])) => {
                    // descend the side with more elements
                    if snode.elelist.len() >= mnode.elelist.len() {
                        stack.push((sl, m));
                        stack.push((sr, m));
                    } else {
                        stack.push((s, ml));
                        stack.push((s, mr));
                    }
                }
            }
        }

        for masters in self.contact_map.values_mut() {
            masters.sort_unstable();
            masters.dedup();
        }
    }

    /// Master candidates of one slave element from the last search
    pub fn search_elements(&self, slave_gid: usize) -> &[usize] {
        self.contact_map
            .get(&slave_gid)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All `(slave, master)` candidate pairs from the last search, sorted
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        self.contact_map
            .iter()
            .flat_map(|(&s, masters)| masters.iter().map(move |&m| (s, m)))
            .collect()
    }

    /// Absolute enlargement of the node volumes
    pub fn enlarge(&self) -> f64 {
        self.arena.enlarge()
    }

    pub fn arena(&self) -> &TreeNodeArena {
        &self.arena
    }

    pub fn slave_root(&self) -> Option<NodeId> {
        self.slave_root
    }

    pub fn master_root(&self) -> Option<NodeId> {
        self.master_root
    }

    pub fn slave_ids(&self) -> &[usize] {
        &self.slave_ids
    }

    pub fn master_ids(&self) -> &[usize] {
        &self.master_ids
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }
}

fn sorted_unique(mut ids: Vec<usize>) -> Vec<usize> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::{BeamElement, BeamMesh, CurveShape, Point, Vec3};
    use crate::search::bounding_volume::{BoundingVolume, DopKind};

    /// Two parallel chains of `n` unit elements along x, `gap` apart in y
    fn parallel_chains(n: usize, gap: f64) -> BeamMesh {
        let mut mesh = BeamMesh::new();
        for row in 0..2 {
            for i in 0..=n {
                mesh.add_node(Point::new(i as f64, row as f64 * gap, 0.0));
            }
        }
        for row in 0..2 {
            for i in 0..n {
                let first = row * (n + 1) + i;
                mesh.add_element(BeamElement::new(
                    row * n + i,
                    vec![first, first + 1],
                    CurveShape::Line2,
                    0.05,
                ))
                .unwrap();
            }
        }
        mesh
    }

    fn brute_force(
        mesh: &BeamMesh,
        slaves: &[usize],
        masters: &[usize],
        params: &SearchParameters,
        enlarge: f64,
    ) -> Vec<(usize, usize)> {
        let volume = |gid: usize| {
            let points = mesh.element_hull_points(gid).unwrap();
            BoundingVolume::from_points(params.dop, &points).enlarged(enlarge)
        };
        let mut pairs = Vec::new();
        for &s in slaves {
            for &m in masters {
                if volume(s).intersects(&volume(m)) {
                    pairs.push((s, m));
                }
            }
        }
        pairs
    }

    #[test]
    fn test_init_then_search_matches_brute_force() {
        let mesh = parallel_chains(8, 0.25);
        let slaves: Vec<usize> = (0..8).collect();
        let masters: Vec<usize> = (8..16).collect();
        for update_type in [TreeUpdateType::TopDown, TreeUpdateType::BottomUp] {
            let params = SearchParameters {
                update_type,
                ..Default::default()
            };
            let mut tree = BinaryTree::new(slaves.clone(), masters.clone(), params.clone()).unwrap();
            tree.init(&mesh).unwrap();
            tree.evaluate_search(&mesh).unwrap();

            let expected = brute_force(&mesh, &slaves, &masters, &params, tree.enlarge());
            assert!(!expected.is_empty());
            assert_eq!(tree.candidate_pairs(), expected);
        }
    }

    #[test]
    fn test_curved_element_bulge_is_bounded() {
        // Line4 arch with nodes at y <= 1 and apex y = 1.125, crossed by a line at y = 1.1
        let mut mesh = BeamMesh::new();
        let nodes: Vec<usize> = [
            (-1.0, 0.0),
            (1.0, 0.0),
            (-1.0 / 3.0, 1.0),
            (1.0 / 3.0, 1.0),
            (-2.0, 1.1),
            (2.0, 1.1),
        ]
        .iter()
        .map(|&(x, y)| mesh.add_node(Point::new(x, y, 0.0)))
        .collect();
        mesh.add_element(BeamElement::new(0, nodes[..4].to_vec(), CurveShape::Line4, 0.0))
            .unwrap();
        mesh.add_element(BeamElement::new(1, nodes[4..].to_vec(), CurveShape::Line2, 0.0))
            .unwrap();

        for update_type in [TreeUpdateType::TopDown, TreeUpdateType::BottomUp] {
            for dop in [DopKind::Aabb, DopKind::Dop8, DopKind::Dop18] {
                let params = SearchParameters {
                    eps: 0.02,
                    update_type,
                    dop,
                };
                let mut tree = BinaryTree::new(vec![0], vec![1], params).unwrap();
                tree.init(&mesh).unwrap();
                tree.evaluate_search(&mesh).unwrap();
                assert_eq!(tree.candidate_pairs(), vec![(0, 1)]);
            }
        }
    }

    #[test]
    fn test_distant_chains_have_no_candidates() {
        let mesh = parallel_chains(4, 10.0);
        let mut tree =
            BinaryTree::new((0..4).collect(), (4..8).collect(), SearchParameters::default())
                .unwrap();
        tree.init(&mesh).unwrap();
        assert!(tree.evaluate_search(&mesh).unwrap().is_empty());
        assert!(tree.search_elements(0).is_empty());
    }

    #[test]
    fn test_update_follows_motion() {
        let mut mesh = parallel_chains(4, 10.0);
        for update_type in [TreeUpdateType::TopDown, TreeUpdateType::BottomUp] {
            let params = SearchParameters {
                update_type,
                ..Default::default()
            };
            let mut tree = BinaryTree::new((0..4).collect(), (4..8).collect(), params).unwrap();
            tree.init(&mesh).unwrap();

            // bring the master chain next to the slave chain
            mesh.displace_nodes(|i, _| {
                if i >= 5 {
                    Vec3::new(0.0, -9.9, 0.0)
                } else {
                    Vec3::zeros()
                }
            });
            tree.evaluate_search(&mesh).unwrap();
            assert!(tree.search_elements(0).contains(&4));
            assert!(!tree.search_elements(0).contains(&7));

            mesh.displace_nodes(|i, _| {
                if i >= 5 {
                    Vec3::new(0.0, 9.9, 0.0)
                } else {
                    Vec3::zeros()
                }
            });
        }
    }

    #[test]
    fn test_topology_change_requires_init() {
        let mut mesh = parallel_chains(3, 0.2);
        let mut tree =
            BinaryTree::new((0..3).collect(), (3..6).collect(), SearchParameters::default())
                .unwrap();
        tree.init(&mesh).unwrap();
        mesh.remove_element(5);

        let result = tree.evaluate_search(&mesh);
        assert!(matches!(
            result,
            Err(ContactSearchError::TreeTopologyChanged { .. })
        ));

        let mut tree =
            BinaryTree::new((0..3).collect(), (3..5).collect(), SearchParameters::default())
                .unwrap();
        tree.init(&mesh).unwrap();
        assert!(tree.evaluate_search(&mesh).is_ok());
    }

    #[test]
    fn test_search_before_init_fails() {
        let mesh = parallel_chains(1, 0.2);
        let mut tree = BinaryTree::new(vec![0], vec![1], SearchParameters::default()).unwrap();
        assert!(tree.evaluate_search(&mesh).is_err());
    }

    #[test]
    fn test_overlapping_sides_rejected() {
        assert!(BinaryTree::new(vec![0, 1], vec![1, 2], SearchParameters::default()).is_err());
    }

    #[test]
    fn test_empty_side() {
        let mesh = parallel_chains(2, 0.2);
        let mut tree = BinaryTree::new(vec![0, 1], vec![], SearchParameters::default()).unwrap();
        tree.init(&mesh).unwrap();
        assert!(tree.evaluate_search(&mesh).unwrap().is_empty());
        let master_root = tree.master_root().unwrap();
        assert_eq!(
            tree.arena().node(master_root).node_type,
            TreeNodeType::NoMasterElements
        );
    }

    #[test]
    fn test_enlargement_from_min_length() {
        let mesh = parallel_chains(2, 0.2);
        let params = SearchParameters {
            eps: 0.5,
            ..Default::default()
        };
        let mut tree = BinaryTree::new(vec![0, 1], vec![2, 3], params).unwrap();
        tree.init(&mesh).unwrap();
        assert!((tree.enlarge() - 0.5).abs() < 1e-12);
    }
}
