//! Lattice deformation as a chain of tensor operations.
//!
//! Each axis basis is evaluated as a sum over knot segments,
//!
//! ```text
//! W(t) = Σ_s mask_s(t) ⊙ (powers(t) · Coef_s)
//! ```
//!
//! where `mask_s` selects the right-continuous segment containing `t`,
//! `powers` runs over the segment-local variable `u = (t - origin) / width`
//! and `Coef_s` holds the segment's power-basis coefficients in `u`. Masks
//! are comparison results and carry no gradient; everything else is
//! differentiable with respect to both points and control points.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use ffd_basis::{ClampedBasis, Extrapolation};
use ffd_types::{Axis, FfdError, FfdResult, GridShape, RestFrame};
use tracing::debug;

use crate::convert::read_values;

/// Tensor form of one basis segment.
#[derive(Debug, Clone)]
struct SegmentTensor<B: Backend> {
    lower: Option<f64>,
    upper: Option<f64>,
    origin: f64,
    width: f64,
    /// `[order, count]`: row `d` multiplies `u^d`.
    coefficients: Tensor<B, 2>,
}

/// Tensor form of one axis basis.
#[derive(Debug, Clone)]
struct AxisTensor<B: Backend> {
    count: usize,
    order: usize,
    segments: Vec<SegmentTensor<B>>,
}

impl<B: Backend> AxisTensor<B> {
    fn new(basis: &ClampedBasis, device: &B::Device) -> Self {
        let count = basis.count();
        let order = basis.kind().order();

        let segments = basis
            .segment_polynomials()
            .into_iter()
            .map(|segment| {
                let mut data = Vec::with_capacity(order * count);
                for d in 0..order {
                    data.extend(segment.coefficients.iter().map(|c| c[d]));
                }
                SegmentTensor {
                    lower: segment.lower,
                    upper: segment.upper,
                    origin: segment.origin,
                    width: segment.width,
                    coefficients: Tensor::from_data(
                        TensorData::new(data, [order, count]).convert::<B::FloatElem>(),
                        device,
                    ),
                }
            })
            .collect();

        Self {
            count,
            order,
            segments,
        }
    }

    /// Evaluates the basis for `t` of shape `[M, 1]`, returning `[M, count]`.
    fn evaluate(&self, t: Tensor<B, 2>) -> Tensor<B, 2> {
        let [rows, _] = t.dims();
        let mut weights = Tensor::zeros([rows, self.count], &t.device());
        for segment in &self.segments {
            let u = t.clone().sub_scalar(segment.origin).div_scalar(segment.width);
            let mut value = self.powers(u).matmul(segment.coefficients.clone());

            if let Some(lo) = segment.lower {
                value = value * t.clone().greater_equal_elem(lo).float();
            }
            if let Some(hi) = segment.upper {
                value = value * t.clone().lower_elem(hi).float();
            }

            weights = weights + value;
        }
        weights
    }

    /// `[M, 1]` to `[M, order]` holding `1, u, u², …`.
    ///
    /// The constant column is derived from `u` so that every input of the
    /// concatenation is tracked; an untracked column would shift the
    /// gradient of the others under `cat`.
    fn powers(&self, u: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut powers = vec![u.clone().mul_scalar(0.0).add_scalar(1.0)];
        for _ in 1..self.order {
            let next = powers[powers.len() - 1].clone() * u.clone();
            powers.push(next);
        }
        Tensor::cat(powers, 1)
    }
}

/// Differentiable deformer for a fixed grid shape.
///
/// Built once per [`GridShape`]; the degree per axis and the segment loop
/// are fixed at construction. Supports `B` independent cages in one call:
/// points `[B, N, 3]`, control points `[B, R, S, T, 3]`, and either one
/// shared rest frame or one per cage.
///
/// # Example
///
/// ```
/// use burn::prelude::Backend;
/// use burn_ndarray::NdArray;
/// use ffd_autodiff::{TensorDeformer, grid_to_tensor, points_to_tensor, tensor_to_points};
/// use ffd_types::{ControlGrid, Extrapolation, GridShape, Point3, RestFrame};
///
/// type B = NdArray<f32>;
/// let device = <B as Backend>::Device::default();
///
/// let frame = RestFrame::unit();
/// let grid = ControlGrid::from_corners(&frame).unwrap();
/// let deformer = TensorDeformer::<B>::new(GridShape::TRILINEAR, Extrapolation::Polynomial, &device).unwrap();
///
/// let points = points_to_tensor::<B>(&[Point3::new(0.25, 0.5, 0.75)], &device);
/// let out = deformer.forward(points, grid_to_tensor(&grid, &device), &[frame]).unwrap();
/// let out = tensor_to_points(&out).unwrap();
/// assert!((out[0].x - 0.25).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct TensorDeformer<B: Backend> {
    shape: GridShape,
    extrapolation: Extrapolation,
    axes: [AxisTensor<B>; 3],
    device: B::Device,
}

impl<B: Backend> TensorDeformer<B> {
    /// Prepares the per-axis segment polynomials for `shape`.
    ///
    /// # Errors
    ///
    /// Propagates basis construction errors.
    pub fn new(
        shape: GridShape,
        extrapolation: Extrapolation,
        device: &B::Device,
    ) -> FfdResult<Self> {
        let [u, v, w] = Axis::ALL.map(|axis| shape.basis(axis, extrapolation));
        let (u, v, w) = (u?, v?, w?);

        let axes = [
            AxisTensor::new(&u, device),
            AxisTensor::new(&v, device),
            AxisTensor::new(&w, device),
        ];
        debug!(
            shape = %shape,
            segments = ?axes.each_ref().map(|a| a.segments.len()),
            "tensor deformer prepared"
        );

        Ok(Self {
            shape,
            extrapolation,
            axes,
            device: device.clone(),
        })
    }

    /// Grid shape this deformer was built for.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Extrapolation policy.
    #[must_use]
    pub const fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    /// Device the coefficient tensors live on.
    #[must_use]
    pub const fn device(&self) -> &B::Device {
        &self.device
    }

    /// Maps `[B, N, 3]` world points to local coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ShapeMismatch`] if the points are not `[B, N, 3]`
    /// or `frames` has neither 1 nor `B` entries.
    pub fn local_coordinates(
        &self,
        points: Tensor<B, 3>,
        frames: &[RestFrame],
    ) -> FfdResult<Tensor<B, 3>> {
        let [batch, _, dim] = points.dims();
        if dim != 3 {
            return Err(FfdError::shape_mismatch(
                "points",
                "[B, N, 3]",
                format!("{:?}", points.dims()),
            ));
        }
        check_frames(batch, frames)?;

        let mins: Vec<f64> = frames
            .iter()
            .flat_map(|f| {
                let m = f.min();
                [m.x, m.y, m.z]
            })
            .collect();
        let extents: Vec<f64> = frames
            .iter()
            .flat_map(|f| {
                let e = f.extent();
                [e.x, e.y, e.z]
            })
            .collect();
        let min = self.frame_tensor(mins, frames.len());
        let extent = self.frame_tensor(extents, frames.len());

        Ok((points - min) / extent)
    }

    fn frame_tensor(&self, values: Vec<f64>, count: usize) -> Tensor<B, 3> {
        Tensor::from_data(
            TensorData::new(values, [count, 1, 3]).convert::<B::FloatElem>(),
            &self.device,
        )
    }

    /// Per-axis weights for `[B, N, 3]` local coordinates.
    ///
    /// Returns `[B, N, R]`, `[B, N, S]` and `[B, N, T]`.
    #[must_use]
    pub fn axis_weights(&self, local: Tensor<B, 3>) -> [Tensor<B, 3>; 3] {
        let [batch, n, _] = local.dims();
        let flat = local.reshape([batch * n, 3]);

        Axis::ALL.map(|axis| {
            let a = axis.index();
            let mut t = flat.clone().slice([0..batch * n, a..a + 1]);
            if self.extrapolation == Extrapolation::Clamp {
                t = t.clamp(0.0, 1.0);
            }
            let tensor = &self.axes[a];
            tensor.evaluate(t).reshape([batch, n, tensor.count])
        })
    }

    /// Deforms `[B, N, 3]` points with `[B, R, S, T, 3]` control points.
    ///
    /// Inputs are checked for shape and finiteness on the host before any
    /// computation. An empty batch (`N = 0`) is returned unchanged once the
    /// control points and frames pass their checks.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ShapeMismatch`] for inconsistent shapes,
    /// [`FfdError::NonFinitePoint`] or [`FfdError::NonFiniteControlPoint`]
    /// for NaN or infinite values, and [`FfdError::Tensor`] if data cannot
    /// be read back for validation.
    ///
    /// `NonFinitePoint::index` counts across the whole batch: point `n` of
    /// cage `b` is reported as `b·N + n`.
    pub fn forward(
        &self,
        points: Tensor<B, 3>,
        control: Tensor<B, 5>,
        frames: &[RestFrame],
    ) -> FfdResult<Tensor<B, 3>> {
        let [batch, n, _] = points.dims();
        let [r, s, t] = self.shape.as_array();
        let expected = [batch, r, s, t, 3];
        if control.dims() != expected {
            return Err(FfdError::shape_mismatch(
                "control points",
                format!("{expected:?}"),
                format!("{:?}", control.dims()),
            ));
        }

        self.validate(&points, &control)?;
        check_frames(batch, frames)?;
        if n == 0 {
            return Ok(points);
        }

        let local = self.local_coordinates(points, frames)?;
        let [wu, wv, wt] = self.axis_weights(local);

        // Σ_i Wu[n, i] · C[i, ..] as a batched matrix product.
        let partial = wu.matmul(control.reshape([batch, r, s * t * 3]));
        // Σ_j Wv[n, j] · partial[n, j, ..]
        let partial = (partial.reshape([batch, n, s, t * 3]) * wv.unsqueeze_dim::<4>(3))
            .sum_dim(2)
            .reshape([batch, n, t, 3]);
        // Σ_k Wt[n, k] · partial[n, k, ..]
        let deformed = (partial * wt.unsqueeze_dim::<4>(3))
            .sum_dim(2)
            .reshape([batch, n, 3]);

        Ok(deformed)
    }

    fn validate(&self, points: &Tensor<B, 3>, control: &Tensor<B, 5>) -> FfdResult<()> {
        if points.dims()[1] > 0 {
            for (flat, chunk) in read_values(points)?.chunks_exact(3).enumerate() {
                if let Some(axis) = first_non_finite(chunk) {
                    return Err(FfdError::NonFinitePoint { index: flat, axis });
                }
            }
        }

        let per_cage = self.shape.count();
        for (flat, chunk) in read_values(control)?.chunks_exact(3).enumerate() {
            if let Some(axis) = first_non_finite(chunk) {
                return Err(FfdError::NonFiniteControlPoint {
                    index: self.shape.unflatten(flat % per_cage),
                    axis,
                });
            }
        }
        Ok(())
    }
}

fn check_frames(batch: usize, frames: &[RestFrame]) -> FfdResult<()> {
    if frames.len() != 1 && frames.len() != batch {
        return Err(FfdError::shape_mismatch(
            "rest frames",
            format!("1 or {batch} frames"),
            format!("{} frames", frames.len()),
        ));
    }
    Ok(())
}

fn first_non_finite(xyz: &[f64]) -> Option<Axis> {
    xyz.iter()
        .position(|c| !c.is_finite())
        .and_then(Axis::from_index)
}
