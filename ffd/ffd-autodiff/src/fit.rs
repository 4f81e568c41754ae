//! Fitting control points to target positions by gradient descent.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use ffd_basis::Extrapolation;
use ffd_types::{Axis, ControlGrid, FfdError, FfdResult, Point3, RestFrame, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::TensorDeformer;
use crate::convert::{points_to_tensor, read_values};

/// Configuration for [`fit_control_grid`].
///
/// # Example
///
/// ```
/// use ffd_autodiff::FitConfig;
///
/// let config = FitConfig::new(500).with_learning_rate(0.5).with_fixed([0, 0, 0]);
/// assert!(config.is_valid());
/// assert_eq!(config.fixed.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Maximum number of descent steps.
    pub iterations: usize,

    /// Step size applied to the control-point gradient.
    pub learning_rate: f64,

    /// Stop once the loss falls to this value.
    pub tolerance: f64,

    /// Control indices `(i, j, k)` that keep their initial position.
    pub fixed: Vec<[usize; 3]>,

    /// Extrapolation policy used while fitting.
    pub extrapolation: Extrapolation,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::new(200)
    }
}

impl FitConfig {
    /// Creates a config with the given iteration budget.
    #[must_use]
    pub const fn new(iterations: usize) -> Self {
        Self {
            iterations,
            learning_rate: 1.0,
            tolerance: 1e-10,
            fixed: Vec::new(),
            extrapolation: Extrapolation::Polynomial,
        }
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the loss tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Pins one control point.
    #[must_use]
    pub fn with_fixed(mut self, index: [usize; 3]) -> Self {
        self.fixed.push(index);
        self
    }

    /// Sets the extrapolation policy.
    #[must_use]
    pub const fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if all values are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.iterations > 0
            && self.learning_rate.is_finite()
            && self.learning_rate > 0.0
            && self.tolerance.is_finite()
            && self.tolerance >= 0.0
    }
}

/// Outcome of [`fit_control_grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Fitted control grid.
    pub grid: ControlGrid,
    /// Loss before each step, followed by the final loss.
    pub loss_history: Vec<f64>,
    /// Number of descent steps taken.
    pub iterations: usize,
    /// Whether the loss reached the tolerance.
    pub converged: bool,
}

impl FitReport {
    /// Loss of the fitted grid.
    #[must_use]
    pub fn final_loss(&self) -> f64 {
        self.loss_history.last().copied().unwrap_or(f64::INFINITY)
    }
}

/// Moves control points so the deformed `points` approach `targets`.
///
/// Minimises the mean squared distance `1/N Σ |P'_n - target_n|²` by plain
/// gradient descent on the control points, leaving the indices listed in
/// [`FitConfig::fixed`] in place.
///
/// # Errors
///
/// Returns [`FfdError::InvalidConfig`] for an invalid config,
/// [`FfdError::ShapeMismatch`] if `points` and `targets` differ in length
/// or are empty, [`FfdError::IndexOutOfRange`] for a bad fixed index,
/// [`FfdError::NonFiniteTarget`] for a NaN or infinite target,
/// [`FfdError::Diverged`] if the loss or a control point stops being finite
/// during descent, and any error of [`TensorDeformer::forward`].
pub fn fit_control_grid<B: AutodiffBackend>(
    points: &[Point3<f64>],
    targets: &[Point3<f64>],
    frame: &RestFrame,
    initial_grid: &ControlGrid,
    config: &FitConfig,
    device: &B::Device,
) -> FfdResult<FitReport> {
    if !config.is_valid() {
        return Err(FfdError::invalid_config(format!(
            "fit config rejected: {config:?}"
        )));
    }
    if points.is_empty() || points.len() != targets.len() {
        return Err(FfdError::shape_mismatch(
            "fit targets",
            format!("{} targets (non-empty)", points.len()),
            format!("{} targets", targets.len()),
        ));
    }

    for (index, target) in targets.iter().enumerate() {
        if let Some(axis) = Axis::ALL.into_iter().find(|a| !target[a.index()].is_finite()) {
            return Err(FfdError::NonFiniteTarget { index, axis });
        }
    }

    let shape = initial_grid.shape();
    let mut free = vec![1.0; shape.count()];
    for &[i, j, k] in &config.fixed {
        if !shape.contains(i, j, k) {
            return Err(FfdError::IndexOutOfRange {
                index: [i, j, k],
                shape: shape.as_array(),
            });
        }
        free[shape.index(i, j, k)] = 0.0;
    }

    let deformer = TensorDeformer::<B>::new(shape, config.extrapolation, device)?;
    let frames = [*frame];
    let [r, s, t] = shape.as_array();
    let point_tensor = points_to_tensor::<B>(points, device);
    let target_tensor = points_to_tensor::<B>(targets, device);

    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / points.len() as f64;

    let mut control: Vec<f64> = initial_grid
        .points()
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .collect();
    let mut loss_history = Vec::with_capacity(config.iterations + 1);
    let mut converged = false;
    let mut steps = 0;

    info!(
        points = points.len(),
        shape = %shape,
        fixed = config.fixed.len(),
        "fitting control grid"
    );

    loop {
        let control_tensor = Tensor::<B, 5>::from_data(
            TensorData::new(control.clone(), [1, r, s, t, 3]).convert::<B::FloatElem>(),
            device,
        )
        .require_grad();

        let deformed =
            match deformer.forward(point_tensor.clone(), control_tensor.clone(), &frames) {
                // Finite on the host but out of range for the tensor element type.
                Err(FfdError::NonFiniteControlPoint { .. }) if steps > 0 => {
                    return Err(FfdError::Diverged {
                        iteration: steps,
                        loss: loss_history.last().copied().unwrap_or(f64::NAN),
                    });
                }
                result => result?,
            };
        let diff = deformed - target_tensor.clone();
        let loss = (diff.clone() * diff).sum().mul_scalar(inv_n);
        let loss_value: f64 = loss.clone().into_scalar().elem();
        loss_history.push(loss_value);

        if !loss_value.is_finite() {
            return Err(FfdError::Diverged {
                iteration: steps,
                loss: loss_value,
            });
        }
        if loss_value <= config.tolerance {
            converged = true;
            break;
        }
        if steps == config.iterations {
            break;
        }

        let grads = loss.backward();
        let Some(gradient) = control_tensor.grad(&grads) else {
            break;
        };
        let gradient = read_values(&gradient)?;

        for (flat, (c, g)) in control.chunks_exact_mut(3).zip(gradient.chunks_exact(3)).enumerate() {
            let step = config.learning_rate * free[flat];
            for (value, grad) in c.iter_mut().zip(g) {
                *value -= step * grad;
            }
        }
        steps += 1;

        if control.iter().any(|c| !c.is_finite()) {
            return Err(FfdError::Diverged {
                iteration: steps,
                loss: loss_value,
            });
        }

        if steps % 50 == 0 {
            debug!(step = steps, loss = loss_value, "fit progress");
        }
    }

    let fitted = control
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect();
    let grid = ControlGrid::from_points(shape, fitted)?;

    info!(
        iterations = steps,
        converged,
        loss = loss_history.last().copied().unwrap_or(f64::NAN),
        "fit finished"
    );

    Ok(FitReport {
        grid,
        loss_history,
        iterations: steps,
        converged,
    })
}

/// Displacement of every control point between two grids of the same
/// shape, in storage order.
#[must_use]
pub fn control_displacements(before: &ControlGrid, after: &ControlGrid) -> Vec<Vector3<f64>> {
    before
        .points()
        .iter()
        .zip(after.points())
        .map(|(a, b)| b - a)
        .collect()
}
