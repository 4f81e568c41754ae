//! Lattice free-form deformation of point batches on the CPU.
//!
//! A point is deformed by mapping it into the cage's local frame, evaluating
//! a clamped spline basis along each axis, and blending the control points
//! with the tensor-product weights:
//!
//! ```text
//! P' = Σ_{i,j,k} Wu[i] · Wv[j] · Wt[k] · C[i, j, k]
//! ```
//!
//! # Backends
//!
//! | Backend | Strategy |
//! |---------|----------|
//! | [`ArrayBackend`] | per-axis weight matrices, one matrix product, row-wise contraction |
//! | [`ScalarBackend`] | direct per-point summation over the non-zero window |
//!
//! The differentiable tensor backend lives in `ffd-autodiff`.
//!
//! # Quick Start
//!
//! ```
//! use ffd_deform::deform;
//! use ffd_types::{ControlGrid, RestFrame, Point3, Vector3};
//!
//! let frame = RestFrame::unit();
//! let mut grid = ControlGrid::from_corners(&frame).unwrap();
//! grid.displace(1, 1, 1, Vector3::new(0.0, 0.0, 0.5)).unwrap();
//!
//! let out = deform(&[Point3::new(0.5, 0.5, 0.5)], &frame, &grid).unwrap();
//! assert!((out[0].z - 0.5625).abs() < 1e-12);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod backend;
pub mod combine;
mod lattice;
mod output;

pub use backend::{ArrayBackend, DeformationBackend, PARALLEL_THRESHOLD, ScalarBackend};
pub use combine::{AxisWeights, outer_weights};
pub use lattice::Lattice;
pub use output::{DeformOutput, validate_points};

use ffd_types::{ControlGrid, FfdResult, Point3, RestFrame};

/// Deforms `points` through the cage described by `frame` and `grid`.
///
/// Uses the array backend with polynomial extrapolation. Output has the
/// same length and order as the input.
///
/// # Errors
///
/// Returns an error for non-finite control points or input points. No
/// output is produced on error.
pub fn deform(
    points: &[Point3<f64>],
    frame: &RestFrame,
    grid: &ControlGrid,
) -> FfdResult<Vec<Point3<f64>>> {
    deform_with(&ArrayBackend, points, frame, grid)
}

/// Like [`deform`], with an explicit backend.
///
/// # Errors
///
/// See [`deform`].
pub fn deform_with<B>(
    backend: &B,
    points: &[Point3<f64>],
    frame: &RestFrame,
    grid: &ControlGrid,
) -> FfdResult<Vec<Point3<f64>>>
where
    B: DeformationBackend + ?Sized,
{
    Lattice::new(*frame, grid.clone())?.deform_with(backend, points)
}
