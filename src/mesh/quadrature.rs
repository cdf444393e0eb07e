//! Gauss-Legendre quadrature on [-1, 1]

use crate::error::{ContactSearchError, Result};

/// Maximum supported number of integration points
pub const MAX_GAUSS_POINTS: usize = 6;

/// Gauss-Legendre points and weights, points in ascending order
pub fn gauss_legendre(num_points: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let (points, weights): (Vec<f64>, Vec<f64>) = match num_points {
        1 => (vec![0.0], vec![2.0]),
        2 => {
            let a = 0.577_350_269_189_625_8;
            (vec![-a, a], vec![1.0, 1.0])
        }
        3 => {
            let a = 0.774_596_669_241_483_4;
            (
                vec![-a, 0.0, a],
                vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0],
            )
        }
        4 => {
            let (a, b) = (0.339_981_043_584_856_3, 0.861_136_311_594_052_6);
            let (wa, wb) = (0.652_145_154_862_546_1, 0.347_854_845_137_453_9);
            (vec![-b, -a, a, b], vec![wb, wa, wa, wb])
        }
        5 => {
            let (a, b) = (0.538_469_310_105_683_1, 0.906_179_845_938_664_0);
            let (w0, wa, wb) = (
                0.568_888_888_888_888_9,
                0.478_628_670_499_366_5,
                0.236_926_885_056_189_1,
            );
            (vec![-b, -a, 0.0, a, b], vec![wb, wa, w0, wa, wb])
        }
        6 => {
            let (a, b, c) = (
                0.238_619_186_083_196_9,
                0.661_209_386_466_264_5,
                0.932_469_514_203_152_1,
            );
            let (wa, wb, wc) = (
                0.467_913_934_572_691_0,
                0.360_761_573_048_138_6,
                0.171_324_492_379_170_4,
            );
            (
                vec![-c, -b, -a, a, b, c],
                vec![wc, wb, wa, wa, wb, wc],
            )
        }
        n => {
            return Err(ContactSearchError::ConfigError(format!(
                "Unsupported number of Gauss points: {} (must be 1..={})",
                n, MAX_GAUSS_POINTS
            )))
        }
    };
    Ok((points, weights))
}
