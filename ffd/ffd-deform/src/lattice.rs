//! Validated lattice snapshot.

use ffd_basis::{ClampedBasis, Extrapolation};
use ffd_types::{
    Axis, ControlGrid, FfdError, FfdResult, GridShape, LocalCoordinate, Point3, RestFrame, Vector3,
};
use tracing::{debug, info};

use crate::backend::{ArrayBackend, DeformationBackend, evaluate_point};
use crate::combine::AxisWeights;
use crate::{DeformOutput, validate_points};

/// A rest frame, control grid and per-axis bases, validated once and
/// reusable across calls.
///
/// Mutating control points needs `&mut self`, so a deformation call always
/// reads a complete snapshot of the grid.
///
/// # Example
///
/// ```
/// use ffd_deform::Lattice;
/// use ffd_types::{ControlGrid, RestFrame, Point3, Vector3};
///
/// let frame = RestFrame::unit();
/// let grid = ControlGrid::from_corners(&frame).unwrap();
/// let mut lattice = Lattice::new(frame, grid).unwrap();
/// lattice.displace_control_point(1, 1, 1, Vector3::new(0.0, 0.0, 0.5)).unwrap();
///
/// let out = lattice.deform(&[Point3::new(1.0, 1.0, 1.0)]).unwrap();
/// assert!((out[0].z - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    frame: RestFrame,
    grid: ControlGrid,
    bases: [ClampedBasis; 3],
}

impl Lattice {
    /// Builds a lattice with polynomial extrapolation.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFiniteControlPoint`] if the grid contains NaN
    /// or infinite coordinates.
    pub fn new(frame: RestFrame, grid: ControlGrid) -> FfdResult<Self> {
        grid.validate_finite()?;
        let bases = build_bases(grid.shape(), Extrapolation::default())?;

        debug!(
            shape = %grid.shape(),
            kinds = ?bases.each_ref().map(ClampedBasis::kind),
            "lattice prepared"
        );

        Ok(Self { frame, grid, bases })
    }

    /// Rebuilds the bases with a different extrapolation policy.
    #[must_use]
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.bases = self
            .bases
            .map(|basis| basis.with_extrapolation(extrapolation));
        self
    }

    /// Rest frame.
    #[must_use]
    pub const fn frame(&self) -> &RestFrame {
        &self.frame
    }

    /// Control grid.
    #[must_use]
    pub const fn grid(&self) -> &ControlGrid {
        &self.grid
    }

    /// Grid shape.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.grid.shape()
    }

    /// Basis along `axis`.
    #[must_use]
    pub const fn basis(&self, axis: Axis) -> &ClampedBasis {
        &self.bases[axis.index()]
    }

    /// Extrapolation policy shared by the three bases.
    #[must_use]
    pub const fn extrapolation(&self) -> Extrapolation {
        self.bases[0].extrapolation()
    }

    /// Deforms a batch with the array backend.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFinitePoint`] for NaN or infinite input.
    pub fn deform(&self, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>> {
        self.deform_with(&ArrayBackend, points)
    }

    /// Deforms a batch with the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFinitePoint`] for NaN or infinite input, or
    /// any backend failure.
    pub fn deform_with<B>(&self, backend: &B, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>>
    where
        B: DeformationBackend + ?Sized,
    {
        validate_points(points)?;
        debug!(backend = backend.name(), points = points.len(), "deforming");
        backend.deform(self, points)
    }

    /// Deforms a batch and reports displacement statistics.
    ///
    /// # Errors
    ///
    /// Same as [`Lattice::deform_with`].
    pub fn deform_with_stats<B>(&self, backend: &B, points: &[Point3<f64>]) -> FfdResult<DeformOutput>
    where
        B: DeformationBackend + ?Sized,
    {
        let deformed = self.deform_with(backend, points)?;
        let output = DeformOutput::new(points, deformed, &self.frame);

        info!(
            backend = backend.name(),
            points = points.len(),
            max_displacement = output.max_displacement,
            outside = output.points_outside,
            "deformation complete"
        );

        Ok(output)
    }

    /// Deforms a single point by direct summation.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFinitePoint`] for NaN or infinite input.
    pub fn deform_point(&self, point: &Point3<f64>) -> FfdResult<Point3<f64>> {
        validate_points(std::slice::from_ref(point))?;
        Ok(evaluate_point(self, point))
    }

    /// Maps world points into local cage coordinates.
    #[must_use]
    pub fn local_coordinates(&self, points: &[Point3<f64>]) -> Vec<LocalCoordinate> {
        self.frame.to_local_batch(points)
    }

    /// Full per-axis weights at a local coordinate.
    #[must_use]
    pub fn axis_weights(&self, local: &LocalCoordinate) -> AxisWeights {
        let [u, v, w] = Axis::ALL.map(|axis| self.basis(axis).evaluate(local[axis.index()]));
        AxisWeights { u, v, w }
    }

    /// Replaces control point `(i, j, k)`.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::IndexOutOfRange`] or
    /// [`FfdError::NonFiniteControlPoint`]; the lattice is unchanged on
    /// error.
    pub fn set_control_point(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        point: Point3<f64>,
    ) -> FfdResult<()> {
        if let Some(axis) = Axis::ALL.into_iter().find(|a| !point[a.index()].is_finite()) {
            return Err(FfdError::NonFiniteControlPoint {
                index: [i, j, k],
                axis,
            });
        }
        self.grid.set(i, j, k, point)
    }

    /// Moves control point `(i, j, k)` by `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`Lattice::set_control_point`].
    pub fn displace_control_point(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        offset: Vector3<f64>,
    ) -> FfdResult<()> {
        let current = self.grid.get(i, j, k).ok_or(FfdError::IndexOutOfRange {
            index: [i, j, k],
            shape: self.shape().as_array(),
        })?;
        self.set_control_point(i, j, k, current + offset)
    }

    /// Consumes the lattice, returning its control grid.
    #[must_use]
    pub fn into_grid(self) -> ControlGrid {
        self.grid
    }
}

fn build_bases(shape: GridShape, extrapolation: Extrapolation) -> FfdResult<[ClampedBasis; 3]> {
    let [u, v, w] = Axis::ALL.map(|axis| shape.basis(axis, extrapolation));
    Ok([u?, v?, w?])
}
