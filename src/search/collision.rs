//! Collision search between sets of bounding volumes
//!
//! [`collision_search`] tests the predicates of this rank against the
//! primitives of this rank. [`global_collision_search`] first gathers the
//! primitives of every rank and reports, for each locally owned predicate,
//! the matching primitives together with the rank owning them.
//!
//! Both functions are collectives and must be called on every rank of the
//! communicator.

use crate::config::Verbosity;
use crate::error::{ContactSearchError, Result};
use crate::search::bounding_volume::BoundingVolume;
use crate::search::communicator::{Communicator, CommunicatorExt};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Below this number of predicates the queries run serially
const PARALLEL_THRESHOLD: usize = 1000;

/// Leaves of the primitive hierarchy hold at most this many volumes
const LEAF_SIZE: usize = 4;

/// Overlapping (predicate, primitive) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollisionSearchResult {
    pub gid_predicate: usize,
    pub gid_primitive: usize,
}

/// Overlapping pair annotated with local index and owning rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlobalCollisionSearchResult {
    /// Index of the predicate in the local predicate list
    pub lid_predicate: usize,
    pub gid_predicate: usize,
    pub gid_primitive: usize,
    /// Rank owning the primitive
    pub pid_primitive: usize,
}

#[derive(Debug)]
struct BvhNode {
    volume: BoundingVolume,
    /// Range into the permutation for leaves, child indices for inner nodes
    content: BvhContent,
}

#[derive(Debug)]
enum BvhContent {
    Leaf { start: usize, end: usize },
    Inner { left: usize, right: usize },
}

/// Bounding volume hierarchy over a fixed set of primitives
#[derive(Debug)]
pub struct PrimitiveBvh {
    nodes: Vec<BvhNode>,
    order: Vec<usize>,
}

impl PrimitiveBvh {
    /// Build the hierarchy by median splits along the widest direction
    pub fn build(volumes: &[&BoundingVolume]) -> Result<Self> {
        let mut bvh = PrimitiveBvh {
            nodes: Vec::new(),
            order: (0..volumes.len()).collect(),
        };
        if !volumes.is_empty() {
            bvh.build_node(volumes, 0, volumes.len())?;
        }
        Ok(bvh)
    }

    fn build_node(
        &mut self,
        volumes: &[&BoundingVolume],
        start: usize,
        end: usize,
    ) -> Result<usize> {
        let mut volume = BoundingVolume::new(volumes[self.order[start]].kind());
        for &i in &self.order[start..end] {
            volume.merge(volumes[i])?;
        }

        let id = self.nodes.len();
        if end - start <= LEAF_SIZE {
            self.nodes.push(BvhNode {
                volume,
                content: BvhContent::Leaf { start, end },
            });
            return Ok(id);
        }

        let direction = volume.longest_direction();
        let center = |i: usize| {
            let slab = volumes[i].slabs()[direction];
            slab.min + slab.max
        };
        self.order[start..end].sort_by(|&a, &b| center(a).total_cmp(&center(b)));

        self.nodes.push(BvhNode {
            volume,
            content: BvhContent::Leaf { start, end },
        });
        let mid = start + (end - start) / 2;
        let left = self.build_node(volumes, start, mid)?;
        let right = self.build_node(volumes, mid, end)?;
        self.nodes[id].content = BvhContent::Inner { left, right };
        Ok(id)
    }

    /// Indices of all primitives whose volume intersects `query`
    pub fn query(&self, volumes: &[&BoundingVolume], query: &BoundingVolume) -> Vec<usize> {
        let mut hits = Vec::new();
        if self.nodes.is_empty() {
            return hits;
        }
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.volume.intersects(query) {
                continue;
            }
            match node.content {
                BvhContent::Leaf { start, end } => {
                    hits.extend(
                        self.order[start..end]
                            .iter()
                            .copied()
                            .filter(|&i| volumes[i].intersects(query)),
                    );
                }
                BvhContent::Inner { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        hits.sort_unstable();
        hits
    }
}

fn check_kinds(
    primitives: &[(usize, BoundingVolume)],
    predicates: &[(usize, BoundingVolume)],
) -> Result<()> {
    let mut kinds = primitives
        .iter()
        .chain(predicates.iter())
        .map(|(_, bv)| bv.kind());
    if let Some(first) = kinds.next() {
        if let Some(other) = kinds.find(|k| *k != first) {
            return Err(ContactSearchError::ConfigError(format!(
                "Collision search needs a single bounding volume kind, found {:?} and {:?}",
                first, other
            )));
        }
    }
    Ok(())
}

/// For each predicate, the indices of overlapping primitives
fn query_all(
    primitives: &[&BoundingVolume],
    predicates: &[(usize, BoundingVolume)],
) -> Result<Vec<Vec<usize>>> {
    let bvh = PrimitiveBvh::build(primitives)?;

    #[cfg(feature = "parallel")]
    let hits: Vec<Vec<usize>> = if predicates.len() >= PARALLEL_THRESHOLD {
        predicates
            .par_iter()
            .map(|(_, bv)| bvh.query(primitives, bv))
            .collect()
    } else {
        predicates
            .iter()
            .map(|(_, bv)| bvh.query(primitives, bv))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let hits: Vec<Vec<usize>> = predicates
        .iter()
        .map(|(_, bv)| bvh.query(primitives, bv))
        .collect();

    Ok(hits)
}

/// Find all overlapping pairs of local predicates and local primitives
///
/// The communicator is only used to report search statistics, so all ranks
/// must still call this function together.
pub fn collision_search(
    primitives: &[(usize, BoundingVolume)],
    predicates: &[(usize, BoundingVolume)],
    comm: &dyn Communicator,
    verbosity: Verbosity,
) -> Result<Vec<CollisionSearchResult>> {
    check_kinds(primitives, predicates)?;

    let volumes: Vec<&BoundingVolume> = primitives.iter().map(|(_, bv)| bv).collect();
    let mut pairs = Vec::new();
    for ((gid_predicate, _), hits) in predicates.iter().zip(query_all(&volumes, predicates)?) {
        pairs.extend(hits.into_iter().map(|i| CollisionSearchResult {
            gid_predicate: *gid_predicate,
            gid_primitive: primitives[i].0,
        }));
    }

    report(comm, verbosity, "collision search", primitives.len(), predicates.len(), pairs.len())?;
    Ok(pairs)
}

/// Find all primitives on any rank that overlap the locally owned predicates
pub fn global_collision_search(
    primitives: &[(usize, BoundingVolume)],
    predicates: &[(usize, BoundingVolume)],
    comm: &dyn Communicator,
    verbosity: Verbosity,
) -> Result<Vec<GlobalCollisionSearchResult>> {
    check_kinds(primitives, predicates)?;

    let gathered = comm.all_gather(primitives.to_vec())?;
    let mut owners = Vec::new();
    let mut all_primitives: Vec<(usize, BoundingVolume)> = Vec::new();
    for (rank, list) in gathered.into_iter().enumerate() {
        owners.extend(std::iter::repeat(rank).take(list.len()));
        all_primitives.extend(list);
    }
    check_kinds(&all_primitives, predicates)?;

    let volumes: Vec<&BoundingVolume> = all_primitives.iter().map(|(_, bv)| bv).collect();
    let mut pairs = Vec::new();
    for (lid_predicate, ((gid_predicate, _), hits)) in predicates
        .iter()
        .zip(query_all(&volumes, predicates)?)
        .enumerate()
    {
        pairs.extend(hits.into_iter().map(|i| GlobalCollisionSearchResult {
            lid_predicate,
            gid_predicate: *gid_predicate,
            gid_primitive: all_primitives[i].0,
            pid_primitive: owners[i],
        }));
    }

    report(
        comm,
        verbosity,
        "global collision search",
        all_primitives.len(),
        predicates.len(),
        pairs.len(),
    )?;
    Ok(pairs)
}

fn report(
    comm: &dyn Communicator,
    verbosity: Verbosity,
    label: &str,
    num_primitives: usize,
    num_predicates: usize,
    num_pairs: usize,
) -> Result<()> {
    if verbosity == Verbosity::Quiet {
        return Ok(());
    }
    if verbosity == Verbosity::Debug {
        log::debug!(
            "Rank {}: {} with {} primitives and {} predicates found {} pairs",
            comm.rank(),
            label,
            num_primitives,
            num_predicates,
            num_pairs
        );
    }
    let total = comm.sum_all(num_pairs)?;
    if comm.rank() == 0 {
        log::info!("Found {} pairs in {} over {} ranks", total, label, comm.size());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::{Point, Vec3};
    use crate::search::bounding_volume::DopKind;
    use crate::search::communicator::{SerialCommunicator, ThreadCommunicator};

    fn cube(gid: usize, center: Point, eps: f64) -> (usize, BoundingVolume) {
        let corners: Vec<Point> = [-0.5, 0.5]
            .iter()
            .flat_map(|&x| [-0.5, 0.5].into_iter().map(move |y| (x, y)))
            .flat_map(|(x, y)| [-0.5, 0.5].into_iter().map(move |z| Vec3::new(x, y, z)))
            .map(|d| center + d)
            .collect();
        (
            gid,
            BoundingVolume::from_points(DopKind::Aabb, &corners).enlarged(eps),
        )
    }

    #[test]
    fn test_separated_cubes() {
        let primitives = vec![cube(0, Point::origin(), 0.5)];
        let predicates = vec![cube(1, Point::new(3.0, 0.0, 0.0), 0.5)];
        let pairs =
            collision_search(&primitives, &predicates, &SerialCommunicator, Verbosity::Quiet)
                .unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_touching_cubes() {
        let primitives = vec![cube(0, Point::origin(), 0.5)];
        let predicates = vec![cube(1, Point::new(1.5, 0.0, 0.0), 0.5)];
        let pairs =
            collision_search(&primitives, &predicates, &SerialCommunicator, Verbosity::Standard)
                .unwrap();
        assert_eq!(
            pairs,
            vec![CollisionSearchResult {
                gid_predicate: 1,
                gid_primitive: 0
            }]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let some = vec![cube(0, Point::origin(), 0.0)];
        let comm = SerialCommunicator;
        assert!(collision_search(&[], &some, &comm, Verbosity::Quiet)
            .unwrap()
            .is_empty());
        assert!(collision_search(&some, &[], &comm, Verbosity::Quiet)
            .unwrap()
            .is_empty());
        assert!(global_collision_search(&[], &[], &comm, Verbosity::Quiet)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        // a 6x6 grid of cubes against a row of predicates
        let primitives: Vec<_> = (0..36)
            .map(|i| cube(i, Point::new((i % 6) as f64 * 1.3, (i / 6) as f64 * 1.3, 0.0), 0.1))
            .collect();
        let predicates: Vec<_> = (0..10)
            .map(|i| cube(100 + i, Point::new(i as f64 * 0.7, 2.0, 0.2), 0.1))
            .collect();

        let mut pairs =
            collision_search(&primitives, &predicates, &SerialCommunicator, Verbosity::Quiet)
                .unwrap();
        pairs.sort();

        let mut expected = Vec::new();
        for (gp, p) in &predicates {
            for (gq, q) in &primitives {
                if p.intersects(q) {
                    expected.push(CollisionSearchResult {
                        gid_predicate: *gp,
                        gid_primitive: *gq,
                    });
                }
            }
        }
        expected.sort();
        assert!(!expected.is_empty());
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let primitives = vec![cube(0, Point::origin(), 0.0)];
        let predicates = vec![(
            1,
            BoundingVolume::from_points(DopKind::Dop18, [&Point::origin()]),
        )];
        assert!(
            collision_search(&primitives, &predicates, &SerialCommunicator, Verbosity::Quiet)
                .is_err()
        );
    }

    #[test]
    fn test_global_search_over_thread_ranks() {
        let group = ThreadCommunicator::group(3);
        let results: Vec<Vec<GlobalCollisionSearchResult>> = std::thread::scope(|s| {
            let handles: Vec<_> = group
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let rank = comm.rank();
                        // every rank owns one primitive at x = 2 * rank
                        let primitives =
                            vec![cube(10 + rank, Point::new(2.0 * rank as f64, 0.0, 0.0), 0.1)];
                        // and one predicate reaching its right neighbour
                        let predicates =
                            vec![cube(20 + rank, Point::new(2.0 * rank as f64 + 1.0, 0.0, 0.0), 0.1)];
                        global_collision_search(&primitives, &predicates, comm, Verbosity::Debug)
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut rank1 = results[1].clone();
        rank1.sort();
        assert_eq!(
            rank1,
            vec![
                GlobalCollisionSearchResult {
                    lid_predicate: 0,
                    gid_predicate: 21,
                    gid_primitive: 11,
                    pid_primitive: 1
                },
                GlobalCollisionSearchResult {
                    lid_predicate: 0,
                    gid_predicate: 21,
                    gid_primitive: 12,
                    pid_primitive: 2
                },
            ]
        );
        // the last predicate only reaches its own primitive
        assert_eq!(results[2].len(), 1);
        assert_eq!(results[2][0].pid_primitive, 2);
    }
}
