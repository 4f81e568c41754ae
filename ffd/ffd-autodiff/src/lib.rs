//! Differentiable lattice free-form deformation on `burn` tensor backends.
//!
//! Every step of the deformation (normalisation, basis evaluation,
//! tensor-product combination, reduction) is a tensor operation, so on an
//! autodiff backend gradients flow to both the input points and the control
//! points. Several independent cages can be deformed in one call.
//!
//! # Entry points
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`TensorDeformer`] | tensor-level forward pass, `[B, N, 3]` points and `[B, R, S, T, 3]` controls |
//! | [`deform_differentiable`] | host-level vector–Jacobian product |
//! | [`fit_control_grid`] | gradient descent on control points towards targets |
//! | [`TensorBackend`] | the tensor path behind `ffd_deform::DeformationBackend` |
//!
//! # Example
//!
//! ```
//! use ffd_autodiff::{CpuAutodiff, deform_differentiable};
//! use ffd_types::{ControlGrid, Point3, RestFrame, Vector3};
//!
//! let frame = RestFrame::unit();
//! let grid = ControlGrid::from_corners(&frame).unwrap();
//! let points = [Point3::new(0.5, 0.5, 0.5)];
//! let cotangent = [Vector3::new(0.0, 0.0, 1.0)];
//!
//! let out = deform_differentiable::<CpuAutodiff>(
//!     &points, &frame, &grid, &cotangent, &Default::default(),
//! ).unwrap();
//! // Each of the 8 corners contributes 1/8 to the centre point.
//! assert!((out.control_gradient[7].z - 0.125).abs() < 1e-6);
//! ```
//!
//! # Feature Flags
//!
//! - `wgpu`: GPU backend aliases via `burn-wgpu`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod backend;
mod convert;
mod deformer;
mod differentiable;
mod fit;

pub use backend::TensorBackend;
pub use convert::{
    grid_to_tensor, points_to_tensor, read_values, tensor_to_points, tensor_to_vectors,
    vectors_to_tensor,
};
pub use deformer::TensorDeformer;
pub use differentiable::{DifferentiableOutput, deform_differentiable, deform_differentiable_with};
pub use fit::{FitConfig, FitReport, control_displacements, fit_control_grid};

/// CPU tensor backend.
pub type CpuBackend = burn_ndarray::NdArray<f32>;

/// CPU tensor backend with automatic differentiation.
pub type CpuAutodiff = burn_autodiff::Autodiff<CpuBackend>;

/// GPU tensor backend.
#[cfg(feature = "wgpu")]
pub type GpuBackend = burn_wgpu::Wgpu;

/// GPU tensor backend with automatic differentiation.
#[cfg(feature = "wgpu")]
pub type GpuAutodiff = burn_autodiff::Autodiff<GpuBackend>;
