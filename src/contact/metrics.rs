//! Summary statistics over evaluated contact points

use crate::contact::types::ContactPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contact metrics of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMetrics {
    /// Number of active contact and coupling points
    pub num_contact_points: usize,

    /// Number of element pairs with at least one active point
    pub num_active_pairs: usize,

    /// Minimum gap
    pub min_gap: f64,

    /// Maximum gap
    pub max_gap: f64,

    /// Average gap (integration-weighted)
    pub avg_gap: f64,

    /// Integrated normal force
    pub total_normal_force: f64,

    /// Total penalty energy
    pub penalty_energy: f64,
}

impl ContactMetrics {
    /// Compute metrics from the active points of an evaluation
    pub fn compute(points: &[ContactPoint], penalty_parameter: f64) -> Self {
        let mut min_gap = f64::MAX;
        let mut max_gap = f64::MIN;
        let mut weight_sum = 0.0;
        let mut weighted_gap_sum = 0.0;
        let mut total_normal_force = 0.0;
        let mut penalty_energy = 0.0;
        let mut pairs = BTreeSet::new();

        for point in points {
            min_gap = min_gap.min(point.gap);
            max_gap = max_gap.max(point.gap);
            weight_sum += point.weight;
            weighted_gap_sum += point.gap * point.weight;
            total_normal_force += point.force * point.weight;
            penalty_energy += point.energy(penalty_parameter);
            pairs.insert((point.element1, point.element2));
        }

        let has_points = !points.is_empty();
        Self {
            num_contact_points: points.len(),
            num_active_pairs: pairs.len(),
            min_gap: if has_points { min_gap } else { 0.0 },
            max_gap: if has_points { max_gap } else { 0.0 },
            avg_gap: if weight_sum > 0.0 {
                weighted_gap_sum / weight_sum
            } else {
                0.0
            },
            total_normal_force,
            penalty_energy,
        }
    }

    /// Print metrics summary
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CONTACT METRICS");
        println!("{}", "=".repeat(60));
        println!();
        println!("  Contact Points:  {}", self.num_contact_points);
        println!("  Active Pairs:    {}", self.num_active_pairs);
        println!();

        if self.num_contact_points > 0 {
            println!("  Gap Statistics (weighted):");
            println!("    Average:   {:.6e}", self.avg_gap);
            println!("    Min:       {:.6e}", self.min_gap);
            println!("    Max:       {:.6e}", self.max_gap);
            println!();
            println!("  Total Normal Force: {:.6e}", self.total_normal_force);
            println!("  Penalty Energy:     {:.6e}", self.penalty_energy);
            println!();
        }

        println!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::Point;
    use approx::assert_relative_eq;

    fn point(element2: usize, gap: f64, weight: f64) -> ContactPoint {
        ContactPoint {
            element1: 0,
            element2,
            xi1: 0.0,
            xi2: 0.0,
            position1: Point::origin(),
            position2: Point::origin(),
            gap,
            force: 10.0 * gap.abs(),
            weight,
        }
    }

    #[test]
    fn test_contact_metrics_computation() {
        let points = vec![point(1, -0.01, 1.0), point(1, -0.02, 2.0), point(2, -0.04, 1.0)];
        let metrics = ContactMetrics::compute(&points, 10.0);

        assert_eq!(metrics.num_contact_points, 3);
        assert_eq!(metrics.num_active_pairs, 2);
        assert_eq!(metrics.min_gap, -0.04);
        assert_eq!(metrics.max_gap, -0.01);

        // (1 * -0.01 + 2 * -0.02 + 1 * -0.04) / 4
        assert_relative_eq!(metrics.avg_gap, -0.0225, epsilon = 1e-15);
        assert_relative_eq!(metrics.total_normal_force, 0.9, epsilon = 1e-12);
        assert_relative_eq!(
            metrics.penalty_energy,
            0.5 * 10.0 * (0.0001 + 2.0 * 0.0004 + 0.0016),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ContactMetrics::compute(&[], 10.0);
        assert_eq!(metrics.num_contact_points, 0);
        assert_eq!(metrics.min_gap, 0.0);
        assert_eq!(metrics.avg_gap, 0.0);
        assert_eq!(metrics.penalty_energy, 0.0);
    }
}
