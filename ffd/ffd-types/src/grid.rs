//! Control grid of a lattice cage.

use ffd_basis::{ClampedBasis, Extrapolation};
use nalgebra::{Point3, Vector3};

use crate::{Axis, FfdError, FfdResult, RestFrame};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest supported `R·S·T`.
pub const MAX_CONTROL_POINTS: usize = 1 << 24;

/// Per-axis control point counts `(R, S, T)`.
///
/// Each count is at least 2 and the total is at most
/// [`MAX_CONTROL_POINTS`]. Serialized as `[R, S, T]`; deserializing goes
/// through the same checks as [`GridShape::from_array`].
///
/// # Example
///
/// ```
/// use ffd_types::{Axis, GridShape};
///
/// let shape = GridShape::new(4, 3, 2).unwrap();
/// assert_eq!(shape.count(), 24);
/// assert_eq!(shape.dim(Axis::Y), 3);
/// assert_eq!(shape.index(1, 2, 1), (1 * 3 + 2) * 2 + 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "[usize; 3]", into = "[usize; 3]"))]
pub struct GridShape {
    dims: [usize; 3],
}

impl GridShape {
    /// The 2×2×2 shape of a trilinear cage.
    pub const TRILINEAR: Self = Self { dims: [2, 2, 2] };

    /// Creates a grid shape.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::InsufficientControlPoints`] naming the first axis
    /// with fewer than two control points, or [`FfdError::InvalidConfig`] if
    /// the total exceeds [`MAX_CONTROL_POINTS`].
    pub fn new(r: usize, s: usize, t: usize) -> FfdResult<Self> {
        Self::from_array([r, s, t])
    }

    /// Creates a grid shape from `[R, S, T]`.
    ///
    /// # Errors
    ///
    /// See [`GridShape::new`].
    pub fn from_array(dims: [usize; 3]) -> FfdResult<Self> {
        for axis in Axis::ALL {
            let count = dims[axis.index()];
            if count < 2 {
                return Err(FfdError::InsufficientControlPoints { axis, count });
            }
        }

        let total = dims
            .iter()
            .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
            .filter(|&total| total <= MAX_CONTROL_POINTS);
        if total.is_none() {
            return Err(FfdError::invalid_config(format!(
                "grid {}x{}x{} exceeds {MAX_CONTROL_POINTS} control points",
                dims[0], dims[1], dims[2]
            )));
        }
        Ok(Self { dims })
    }

    /// Total number of control points `R·S·T`.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Control point count along an axis.
    #[inline]
    #[must_use]
    pub const fn dim(&self, axis: Axis) -> usize {
        self.dims[axis.index()]
    }

    /// Returns `[R, S, T]`.
    #[inline]
    #[must_use]
    pub const fn as_array(&self) -> [usize; 3] {
        self.dims
    }

    /// Flat storage index of `(i, j, k)`. Does not bounds-check.
    #[inline]
    #[must_use]
    pub const fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    /// Inverse of [`GridShape::index`].
    #[inline]
    #[must_use]
    pub const fn unflatten(&self, flat: usize) -> [usize; 3] {
        let k = flat % self.dims[2];
        let rest = flat / self.dims[2];
        [rest / self.dims[1], rest % self.dims[1], k]
    }

    /// Returns true if `(i, j, k)` lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        i < self.dims[0] && j < self.dims[1] && k < self.dims[2]
    }

    /// Builds the spline basis for an axis.
    ///
    /// # Errors
    ///
    /// Never fails for a validated shape; the error is propagated for
    /// completeness.
    pub fn basis(&self, axis: Axis, extrapolation: Extrapolation) -> FfdResult<ClampedBasis> {
        ClampedBasis::new(self.dim(axis))
            .map(|basis| basis.with_extrapolation(extrapolation))
            .map_err(|e| FfdError::basis(axis, e))
    }

    fn check(&self, i: usize, j: usize, k: usize) -> FfdResult<usize> {
        if self.contains(i, j, k) {
            Ok(self.index(i, j, k))
        } else {
            Err(FfdError::IndexOutOfRange {
                index: [i, j, k],
                shape: self.dims,
            })
        }
    }
}

impl TryFrom<[usize; 3]> for GridShape {
    type Error = FfdError;

    fn try_from(dims: [usize; 3]) -> FfdResult<Self> {
        Self::from_array(dims)
    }
}

impl From<GridShape> for [usize; 3] {
    fn from(shape: GridShape) -> Self {
        shape.dims
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.dims[0], self.dims[1], self.dims[2])
    }
}

/// An `R×S×T` array of absolute control point positions.
///
/// Points are stored flat with `index = (i·S + j)·T + k`.
///
/// # Example
///
/// ```
/// use ffd_types::{ControlGrid, GridShape, RestFrame, Point3, Vector3};
///
/// let frame = RestFrame::unit();
/// let mut grid = ControlGrid::rest(&frame, GridShape::TRILINEAR).unwrap();
/// assert_eq!(grid.get(1, 1, 1), Some(Point3::new(1.0, 1.0, 1.0)));
///
/// grid.displace(1, 1, 1, Vector3::new(0.0, 0.0, 0.5)).unwrap();
/// assert_eq!(grid.get(1, 1, 1), Some(Point3::new(1.0, 1.0, 1.5)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "GridRecord", into = "GridRecord"))]
pub struct ControlGrid {
    shape: GridShape,
    points: Vec<Point3<f64>>,
}

/// Unchecked serialized form of a [`ControlGrid`].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct GridRecord {
    shape: GridShape,
    points: Vec<Point3<f64>>,
}

#[cfg(feature = "serde")]
impl TryFrom<GridRecord> for ControlGrid {
    type Error = FfdError;

    fn try_from(record: GridRecord) -> FfdResult<Self> {
        Self::from_points(record.shape, record.points)
    }
}

#[cfg(feature = "serde")]
impl From<ControlGrid> for GridRecord {
    fn from(grid: ControlGrid) -> Self {
        Self {
            shape: grid.shape,
            points: grid.points,
        }
    }
}

impl ControlGrid {
    /// Creates the undeformed grid for a rest frame.
    ///
    /// Control point `(i, j, k)` sits at the Greville abscissae of each
    /// axis basis, mapped into the frame. With this placement an undisplaced
    /// grid reproduces its input exactly, at any resolution.
    ///
    /// # Errors
    ///
    /// Propagates basis construction errors.
    pub fn rest(frame: &RestFrame, shape: GridShape) -> FfdResult<Self> {
        let [gu, gv, gw] = [Axis::X, Axis::Y, Axis::Z].map(|axis| {
            shape
                .basis(axis, Extrapolation::Polynomial)
                .map(|b| b.greville_abscissae())
        });
        let (gu, gv, gw) = (gu?, gv?, gw?);

        let mut points = Vec::with_capacity(shape.count());
        for u in &gu {
            for v in &gv {
                for w in &gw {
                    points.push(frame.to_world(&Point3::new(*u, *v, *w)));
                }
            }
        }
        Ok(Self { shape, points })
    }

    /// The 2×2×2 grid on the corners of `frame`.
    ///
    /// # Errors
    ///
    /// Never fails for a validated frame.
    pub fn from_corners(frame: &RestFrame) -> FfdResult<Self> {
        Self::rest(frame, GridShape::TRILINEAR)
    }

    /// Wraps explicit control point positions.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ShapeMismatch`] if `points.len()` differs from
    /// `shape.count()`.
    pub fn from_points(shape: GridShape, points: Vec<Point3<f64>>) -> FfdResult<Self> {
        if points.len() != shape.count() {
            return Err(FfdError::shape_mismatch(
                "control grid",
                format!("{} points for {shape}", shape.count()),
                format!("{} points", points.len()),
            ));
        }
        Ok(Self { shape, points })
    }

    /// Returns the grid shape.
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Returns the flat control point storage.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Consumes the grid, returning its flat storage.
    #[must_use]
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    /// Returns control point `(i, j, k)` if it exists.
    #[must_use]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<Point3<f64>> {
        self.shape
            .contains(i, j, k)
            .then(|| self.points[self.shape.index(i, j, k)])
    }

    /// Replaces control point `(i, j, k)`.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::IndexOutOfRange`] for an index outside the grid.
    pub fn set(&mut self, i: usize, j: usize, k: usize, point: Point3<f64>) -> FfdResult<()> {
        let idx = self.shape.check(i, j, k)?;
        self.points[idx] = point;
        Ok(())
    }

    /// Moves control point `(i, j, k)` by `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::IndexOutOfRange`] for an index outside the grid.
    pub fn displace(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        offset: Vector3<f64>,
    ) -> FfdResult<()> {
        let idx = self.shape.check(i, j, k)?;
        self.points[idx] += offset;
        Ok(())
    }

    /// Applies a displacement to every control point, in flat order.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::ShapeMismatch`] if the displacement count is
    /// wrong.
    pub fn with_displacements(mut self, offsets: &[Vector3<f64>]) -> FfdResult<Self> {
        if offsets.len() != self.points.len() {
            return Err(FfdError::shape_mismatch(
                "control displacements",
                format!("{} vectors", self.points.len()),
                format!("{} vectors", offsets.len()),
            ));
        }
        for (p, d) in self.points.iter_mut().zip(offsets) {
            *p += d;
        }
        Ok(self)
    }

    /// Iterates `((i, j, k), point)` in storage order.
    pub fn iter_indexed(&self) -> impl Iterator<Item = ([usize; 3], Point3<f64>)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(|(flat, p)| (self.shape.unflatten(flat), *p))
    }

    /// Checks that every coordinate is finite.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFiniteControlPoint`] for the first offending
    /// point.
    pub fn validate_finite(&self) -> FfdResult<()> {
        for (index, p) in self.iter_indexed() {
            if let Some(axis) = Axis::ALL.into_iter().find(|a| !p[a.index()].is_finite()) {
                return Err(FfdError::NonFiniteControlPoint { index, axis });
            }
        }
        Ok(())
    }
}
