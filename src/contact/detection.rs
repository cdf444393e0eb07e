//! Beam contact pipeline
//!
//! Ties the binary tree search to pair evaluation: every step the tree is
//! updated and searched, a line contact pair is created for each candidate
//! (slave, master) element pair, prescribed point couplings are added, and the
//! evaluator assembles all contributions into the caller's global system.

use crate::config::{
    AnalysisConfig, ContactParameters, PointCouplingConfig, ProjectionParameters,
    SearchParameters,
};
use crate::contact::assembly::GlobalSystem;
use crate::contact::evaluator::ContactPairEvaluator;
use crate::contact::pair::{create_line_contact_pair, create_point_coupling_pair, ContactPair};
use crate::contact::types::ContactResults;
use crate::error::Result;
use crate::mesh::types::Discretization;
use crate::search::binary_tree::BinaryTree;
use std::collections::BTreeMap;

/// Owns the search tree and the contact pairs of a slave/master interface
#[derive(Debug)]
pub struct BeamContactManager {
    tree: BinaryTree,
    contact: ContactParameters,
    projection: ProjectionParameters,
    point_couplings: Vec<PointCouplingConfig>,
    evaluator: ContactPairEvaluator,
}

impl BeamContactManager {
    /// Build the tree over the given element sets in the current configuration
    pub fn new(
        disc: &dyn Discretization,
        slave_elements: Vec<usize>,
        master_elements: Vec<usize>,
        search: SearchParameters,
        projection: ProjectionParameters,
        contact: ContactParameters,
    ) -> Result<Self> {
        let mut tree = BinaryTree::new(slave_elements, master_elements, search)?;
        tree.init(disc)?;

        // Volumes bound the centerlines only
        let max_radius = |ids: &[usize]| -> Result<f64> {
            ids.iter()
                .map(|&gid| disc.element(gid).map(|e| e.radius))
                .try_fold(0.0_f64, |acc, r| r.map(|r| acc.max(r)))
        };
        let radius_sum = max_radius(tree.slave_ids())? + max_radius(tree.master_ids())?;
        if tree.enlarge() < radius_sum {
            log::warn!(
                "Tree enlargement {:.3e} is smaller than the sum of the largest radii {:.3e}; \
                 contact of thick beams may be missed",
                tree.enlarge(),
                radius_sum
            );
        }

        Ok(Self {
            tree,
            contact,
            projection,
            point_couplings: Vec::new(),
            evaluator: ContactPairEvaluator::new(),
        })
    }

    /// Build a manager from an analysis configuration
    pub fn from_config(disc: &dyn Discretization, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let manager = Self::new(
            disc,
            config.slave_elements.clone(),
            config.master_elements.clone(),
            config.search.clone(),
            config.projection.clone(),
            config.contact.clone(),
        )?;
        Ok(manager.with_point_couplings(config.point_couplings.clone()))
    }

    /// Add prescribed penalty point couplings, evaluated every step
    pub fn with_point_couplings(mut self, point_couplings: Vec<PointCouplingConfig>) -> Self {
        self.point_couplings = point_couplings;
        self
    }

    /// Rebuild the tree after the element topology changed
    pub fn reinit(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.tree.init(disc)
    }

    /// Search, evaluate and assemble contact in the current configuration
    ///
    /// Nothing is added to `system` if any pair fails.
    pub fn evaluate(
        &mut self,
        disc: &dyn Discretization,
        system: &mut GlobalSystem,
    ) -> Result<ContactResults> {
        self.tree.evaluate_search(disc)?;
        let candidate_pairs = self.tree.candidate_pairs();

        let mut pairs: Vec<Box<dyn ContactPair>> = Vec::with_capacity(candidate_pairs.len());
        for &(slave, master) in &candidate_pairs {
            pairs.push(create_line_contact_pair(
                disc.element(slave)?,
                disc.element(master)?,
                &self.contact,
                &self.projection,
            )?);
        }

        let mut couplings: BTreeMap<(usize, usize), Vec<(f64, f64)>> = BTreeMap::new();
        for coupling in &self.point_couplings {
            couplings
                .entry((coupling.element1, coupling.element2))
                .or_default()
                .push((coupling.xi1, coupling.xi2));
        }
        for ((element1, element2), points) in couplings {
            pairs.push(create_point_coupling_pair(
                disc.element(element1)?,
                disc.element(element2)?,
                self.contact.penalty_parameter,
                points,
            )?);
        }

        self.evaluator.set_pairs(pairs);
        self.evaluator.setup(disc)?;
        let num_active_pairs = self.evaluator.evaluate(disc, system)?;

        let results = ContactResults {
            candidate_pairs,
            num_pairs_evaluated: self.evaluator.num_pairs(),
            num_active_pairs,
            contact_points: self.evaluator.contact_points(),
        };

        log::info!(
            "Contact evaluation: {} candidate pairs, {} active pairs, {} contact points",
            results.candidate_pairs.len(),
            results.num_active_pairs,
            results.num_contact_points()
        );
        Ok(results)
    }

    pub fn tree(&self) -> &BinaryTree {
        &self.tree
    }

    pub fn evaluator(&self) -> &ContactPairEvaluator {
        &self.evaluator
    }
}
