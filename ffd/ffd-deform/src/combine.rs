//! Tensor-product combination of per-axis weights.
//!
//! A lattice weight is the product of one weight per axis,
//! `W[i, j, k] = Wu[i] · Wv[j] · Wt[k]`. The batched engine never builds
//! this tensor for more than one point; it contracts the per-axis weight
//! matrices directly. The explicit form here serves single-point queries
//! and tests.

use ffd_basis::ClampedBasis;
use ndarray::{Array1, Array2, Zip};

/// Per-axis blending weights for one point.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisWeights {
    /// Weights along X, one per control index `i`.
    pub u: Vec<f64>,
    /// Weights along Y, one per control index `j`.
    pub v: Vec<f64>,
    /// Weights along Z, one per control index `k`.
    pub w: Vec<f64>,
}

impl AxisWeights {
    /// Expands into the full `R·S·T` weight tensor in grid storage order.
    #[must_use]
    pub fn outer(&self) -> Vec<f64> {
        outer_weights(&self.u, &self.v, &self.w)
    }
}

/// Builds the `R×S×T` tensor-product weights, flattened in grid storage
/// order `(i·S + j)·T + k`.
///
/// # Example
///
/// ```
/// use ffd_deform::combine::outer_weights;
///
/// let w = outer_weights(&[0.5, 0.5], &[1.0, 0.0], &[0.25, 0.75]);
/// assert_eq!(w, vec![0.125, 0.375, 0.0, 0.0, 0.125, 0.375, 0.0, 0.0]);
/// ```
#[must_use]
pub fn outer_weights(u: &[f64], v: &[f64], w: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(u.len() * v.len() * w.len());
    for &wu in u {
        for &wv in v {
            let uv = wu * wv;
            out.extend(w.iter().map(|&wt| uv * wt));
        }
    }
    out
}

/// Evaluates one axis basis for every coordinate, producing an
/// `N × count` weight matrix.
///
/// Rows are filled in parallel.
#[must_use]
pub fn weight_matrix(basis: &ClampedBasis, coords: &Array1<f64>) -> Array2<f64> {
    let order = basis.kind().order();
    let mut matrix = Array2::zeros((coords.len(), basis.count()));

    Zip::from(matrix.rows_mut())
        .and(coords)
        .par_for_each(|mut row, &t| {
            let (first, weights) = basis.nonzero(t);
            for (offset, &weight) in weights[..order].iter().enumerate() {
                row[first + offset] = weight;
            }
        });

    matrix
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn outer_weights_sum_to_one() {
        let u = ClampedBasis::new(4).unwrap().evaluate(0.3);
        let v = ClampedBasis::new(2).unwrap().evaluate(0.9);
        let w = ClampedBasis::new(6).unwrap().evaluate(0.55);

        let tensor = outer_weights(&u, &v, &w);
        assert_eq!(tensor.len(), 4 * 2 * 6);
        assert_relative_eq!(tensor.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn outer_weights_layout() {
        let u = [0.1, 0.9];
        let v = [0.2, 0.3, 0.5];
        let w = [0.6, 0.4];
        let tensor = outer_weights(&u, &v, &w);

        for (i, wu) in u.iter().enumerate() {
            for (j, wv) in v.iter().enumerate() {
                for (k, wt) in w.iter().enumerate() {
                    assert_relative_eq!(tensor[(i * 3 + j) * 2 + k], wu * wv * wt);
                }
            }
        }
    }

    #[test]
    fn weight_matrix_rows_match_evaluate() {
        let basis = ClampedBasis::new(5).unwrap();
        let coords = Array1::from(vec![-0.2, 0.0, 0.25, 0.5, 0.999, 1.0, 1.3]);
        let matrix = weight_matrix(&basis, &coords);

        assert_eq!(matrix.dim(), (7, 5));
        for (row, &t) in matrix.rows().into_iter().zip(coords.iter()) {
            let expected = basis.evaluate(t);
            for (a, b) in row.iter().zip(&expected) {
                assert_relative_eq!(*a, *b, epsilon = 1e-15);
            }
        }
    }
}
