//! Vector–Jacobian products through the deformation.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use ffd_basis::Extrapolation;
use ffd_types::{ControlGrid, FfdError, FfdResult, Point3, RestFrame, Vector3};
use tracing::debug;

use crate::TensorDeformer;
use crate::convert::{
    grid_to_tensor, points_to_tensor, tensor_to_points, tensor_to_vectors, vectors_to_tensor,
};

/// Result of [`deform_differentiable`].
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentiableOutput {
    /// Deformed points, in input order.
    pub deformed: Vec<Point3<f64>>,
    /// `∂L/∂C` for every control point, in grid storage order.
    pub control_gradient: Vec<Vector3<f64>>,
    /// `∂L/∂P` for every input point.
    pub point_gradient: Vec<Vector3<f64>>,
}

/// Deforms `points` on an autodiff backend and back-propagates
/// `L = Σ_n cotangent_n · P'_n`.
///
/// With a unit cotangent on one point and coordinate this yields one row
/// of the Jacobian; with `cotangent = ∂loss/∂P'` it yields the gradient of
/// any downstream loss.
///
/// # Errors
///
/// Returns [`FfdError::ShapeMismatch`] if `cotangent` and `points` differ
/// in length, and any error of [`TensorDeformer::forward`].
pub fn deform_differentiable<B: AutodiffBackend>(
    points: &[Point3<f64>],
    frame: &RestFrame,
    grid: &ControlGrid,
    cotangent: &[Vector3<f64>],
    device: &B::Device,
) -> FfdResult<DifferentiableOutput> {
    deform_differentiable_with::<B>(
        points,
        frame,
        grid,
        cotangent,
        Extrapolation::Polynomial,
        device,
    )
}

/// Like [`deform_differentiable`], with an explicit extrapolation policy.
///
/// # Errors
///
/// See [`deform_differentiable`].
pub fn deform_differentiable_with<B: AutodiffBackend>(
    points: &[Point3<f64>],
    frame: &RestFrame,
    grid: &ControlGrid,
    cotangent: &[Vector3<f64>],
    extrapolation: Extrapolation,
    device: &B::Device,
) -> FfdResult<DifferentiableOutput> {
    if cotangent.len() != points.len() {
        return Err(FfdError::shape_mismatch(
            "cotangent",
            format!("{} vectors", points.len()),
            format!("{} vectors", cotangent.len()),
        ));
    }

    let deformer = TensorDeformer::<B>::new(grid.shape(), extrapolation, device)?;
    if points.is_empty() {
        grid.validate_finite()?;
        return Ok(DifferentiableOutput {
            deformed: Vec::new(),
            control_gradient: vec![Vector3::zeros(); grid.shape().count()],
            point_gradient: Vec::new(),
        });
    }

    let point_tensor = points_to_tensor::<B>(points, device).require_grad();
    let control_tensor = grid_to_tensor::<B>(grid, device).require_grad();
    let weights = vectors_to_tensor::<B>(cotangent, device);

    let deformed = deformer.forward(point_tensor.clone(), control_tensor.clone(), &[*frame])?;
    let objective = (deformed.clone() * weights).sum();
    let grads = objective.backward();

    let control_gradient = gradient_or_zeros(control_tensor.grad(&grads), grid.shape().count())?;
    let point_gradient = gradient_or_zeros(point_tensor.grad(&grads), points.len())?;

    debug!(
        points = points.len(),
        control_points = grid.shape().count(),
        "vector-jacobian product computed"
    );

    Ok(DifferentiableOutput {
        deformed: tensor_to_points(&deformed)?,
        control_gradient,
        point_gradient,
    })
}

fn gradient_or_zeros<B: burn::prelude::Backend, const D: usize>(
    grad: Option<Tensor<B, D>>,
    count: usize,
) -> FfdResult<Vec<Vector3<f64>>> {
    match grad {
        Some(g) => tensor_to_vectors(&g),
        None => Ok(vec![Vector3::zeros(); count]),
    }
}
