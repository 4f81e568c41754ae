//! Execution backends for the deformation engine.

use ffd_types::{Axis, FfdResult, Point3};
use ndarray::{Array1, Array2, Zip};
use rayon::prelude::*;
use tracing::debug;

use crate::Lattice;
use crate::combine::weight_matrix;

/// Point count above which the scalar backend runs in parallel.
pub const PARALLEL_THRESHOLD: usize = 1000;

/// An execution strategy for `P'_n = Σ W_n[i, j, k] · C[i, j, k]`.
///
/// Implementations receive a validated lattice and finite points; every
/// backend must produce the same result up to floating-point rounding.
pub trait DeformationBackend {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Deforms `points` through `lattice`, preserving order.
    ///
    /// # Errors
    ///
    /// Backends that move data to another device may fail to read results
    /// back.
    fn deform(&self, lattice: &Lattice, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>>;
}

/// Batched array backend.
///
/// Builds the `N×R`, `N×S`, `N×T` weight matrices, multiplies `Wu` with the
/// control grid reshaped to `R × (S·T·3)`, then contracts each row with
/// its `Wv` and `Wt` weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayBackend;

impl DeformationBackend for ArrayBackend {
    fn name(&self) -> &'static str {
        "array"
    }

    fn deform(&self, lattice: &Lattice, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>> {
        let frame = lattice.frame();
        let [r, s, t] = lattice.shape().as_array();

        let local = frame.to_local_batch(points);
        let [wu, wv, wt] = Axis::ALL.map(|axis| {
            let coords: Array1<f64> = local.iter().map(|p| p[axis.index()]).collect();
            weight_matrix(lattice.basis(axis), &coords)
        });

        let control = control_matrix(lattice.grid().points(), r, s * t * 3);
        let partial = wu.dot(&control);

        let mut out = Array2::<f64>::zeros((points.len(), 3));
        Zip::from(out.rows_mut())
            .and(partial.rows())
            .and(wv.rows())
            .and(wt.rows())
            .par_for_each(|mut row, pr, wv, wt| {
                let mut acc = [0.0; 3];
                for (j, &a) in wv.iter().enumerate() {
                    for (k, &b) in wt.iter().enumerate() {
                        let weight = a * b;
                        let base = (j * t + k) * 3;
                        for (c, slot) in acc.iter_mut().enumerate() {
                            *slot += weight * pr[base + c];
                        }
                    }
                }
                for (c, value) in acc.into_iter().enumerate() {
                    row[c] = value;
                }
            });

        debug!(
            points = points.len(),
            control_points = r * s * t,
            "array backend contraction complete"
        );

        Ok(out
            .rows()
            .into_iter()
            .map(|row| Point3::new(row[0], row[1], row[2]))
            .collect())
    }
}

/// Reshapes flat control points into an `R × (S·T·3)` matrix.
fn control_matrix(points: &[Point3<f64>], rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, col)| {
        points[i * (cols / 3) + col / 3][col % 3]
    })
}

/// Per-point reference backend.
///
/// Sums over the non-zero window of control points for each point. Used as
/// a test oracle for the batched backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend;

impl DeformationBackend for ScalarBackend {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn deform(&self, lattice: &Lattice, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>> {
        let out = if points.len() > PARALLEL_THRESHOLD {
            points.par_iter().map(|p| evaluate_point(lattice, p)).collect()
        } else {
            points.iter().map(|p| evaluate_point(lattice, p)).collect()
        };
        Ok(out)
    }
}

/// Evaluates one point by direct summation.
pub(crate) fn evaluate_point(lattice: &Lattice, point: &Point3<f64>) -> Point3<f64> {
    let local = lattice.frame().to_local(point);
    let shape = lattice.shape();

    let [(i0, wu), (j0, wv), (k0, wt)] =
        Axis::ALL.map(|axis| lattice.basis(axis).nonzero(local[axis.index()]));
    let [ou, ov, ow] = Axis::ALL.map(|axis| lattice.basis(axis).kind().order());

    let controls = lattice.grid().points();
    let mut acc = [0.0; 3];
    for (a, &bu) in wu[..ou].iter().enumerate() {
        for (b, &bv) in wv[..ov].iter().enumerate() {
            for (c, &bw) in wt[..ow].iter().enumerate() {
                let weight = bu * bv * bw;
                let cp = controls[shape.index(i0 + a, j0 + b, k0 + c)];
                for (slot, value) in acc.iter_mut().zip(cp.coords.iter()) {
                    *slot += weight * value;
                }
            }
        }
    }
    Point3::new(acc[0], acc[1], acc[2])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ffd_types::{ControlGrid, GridShape, RestFrame, Vector3};

    fn warped_lattice() -> Lattice {
        let frame = RestFrame::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 2.0, 0.5)).unwrap();
        let shape = GridShape::new(5, 3, 2).unwrap();
        let mut grid = ControlGrid::rest(&frame, shape).unwrap();
        for (n, flat) in (0..shape.count()).step_by(3).enumerate() {
            let [i, j, k] = shape.unflatten(flat);
            #[allow(clippy::cast_precision_loss)]
            let d = 0.05 * n as f64;
            grid.displace(i, j, k, Vector3::new(d, -d, 2.0 * d)).unwrap();
        }
        Lattice::new(frame, grid).unwrap()
    }

    fn sample_points() -> Vec<Point3<f64>> {
        (0..50)
            .map(|n| {
                #[allow(clippy::cast_precision_loss)]
                let s = n as f64 / 49.0;
                Point3::new(-1.2 + 2.4 * s, 2.1 * s * s, 0.6 - 0.7 * s)
            })
            .collect()
    }

    #[test]
    fn array_matches_scalar() {
        let lattice = warped_lattice();
        let points = sample_points();

        let a = ArrayBackend.deform(&lattice, &points).unwrap();
        let b = ScalarBackend.deform(&lattice, &points).unwrap();
        assert_eq!(a.len(), points.len());
        for (pa, pb) in a.iter().zip(&b) {
            assert_relative_eq!(pa, pb, epsilon = 1e-10);
        }
    }

    #[test]
    fn scalar_parallel_path_matches_serial() {
        let lattice = warped_lattice();
        let points: Vec<_> = sample_points().into_iter().cycle().take(PARALLEL_THRESHOLD + 7).collect();

        let batched = ScalarBackend.deform(&lattice, &points).unwrap();
        for (p, q) in points.iter().zip(&batched) {
            assert_eq!(evaluate_point(&lattice, p), *q);
        }
    }

    #[test]
    fn empty_batch() {
        let lattice = warped_lattice();
        assert!(ArrayBackend.deform(&lattice, &[]).unwrap().is_empty());
        assert!(ScalarBackend.deform(&lattice, &[]).unwrap().is_empty());
    }

    #[test]
    fn control_matrix_layout() {
        let shape = GridShape::new(2, 3, 2).unwrap();
        let grid = ControlGrid::rest(&RestFrame::unit(), shape).unwrap();
        let m = control_matrix(grid.points(), 2, 3 * 2 * 3);
        let p = grid.get(1, 2, 0).unwrap();
        let col = (2 * 2) * 3;
        assert_relative_eq!(m[(1, col)], p.x);
        assert_relative_eq!(m[(1, col + 1)], p.y);
        assert_relative_eq!(m[(1, col + 2)], p.z);
    }
}
