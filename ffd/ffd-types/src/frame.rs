//! Rest frame of the undeformed cage.
//!
//! The rest frame is the axis-aligned box spanned by the undeformed cage. It
//! defines the affine map between world space and the cage's local
//! `[0, 1]³` coordinates.

use nalgebra::{Point3, Vector3};

use crate::{Axis, FfdError, FfdResult, LocalCoordinate};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Absolute margin added around point bounds so boundary points lie
/// strictly inside the frame.
pub const BOUNDS_EPSILON: f64 = 1e-12;

/// Axis-aligned bounds of the undeformed cage.
///
/// A `RestFrame` always has finite corners and strictly positive extent on
/// every axis, so the world-to-local map never divides by zero.
///
/// # Example
///
/// ```
/// use ffd_types::{RestFrame, Point3};
///
/// let frame = RestFrame::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 8.0)).unwrap();
/// let local = frame.to_local(&Point3::new(1.0, 1.0, 10.0));
///
/// assert_eq!(local, Point3::new(0.5, 0.25, 1.25));
/// assert_eq!(frame.to_world(&local), Point3::new(1.0, 1.0, 10.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestFrame {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl RestFrame {
    /// Creates a rest frame from its minimum and maximum corners.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::NonFiniteFrame`] if a coordinate is NaN or
    /// infinite, and [`FfdError::DegenerateFrame`] if `max <= min` on any
    /// axis.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> FfdResult<Self> {
        for axis in Axis::ALL {
            let (lo, hi) = (min[axis.index()], max[axis.index()]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(FfdError::NonFiniteFrame { axis });
            }
            if hi <= lo {
                return Err(FfdError::DegenerateFrame {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(Self { min, max })
    }

    /// The unit cube `[0, 1]³`.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::new(1.0, 1.0, 1.0),
        }
    }

    /// Creates the frame bounding a point batch.
    ///
    /// The bounds are widened by [`BOUNDS_EPSILON`] on every side.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is empty, contains non-finite
    /// coordinates, or is flat along some axis.
    ///
    /// # Example
    ///
    /// ```
    /// use ffd_types::{RestFrame, Point3};
    ///
    /// let points = [Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 5.0, 4.0)];
    /// let frame = RestFrame::from_points(&points).unwrap();
    /// assert!(frame.contains(&points[0]));
    /// assert!(frame.contains(&points[1]));
    /// ```
    pub fn from_points(points: &[Point3<f64>]) -> FfdResult<Self> {
        if points.is_empty() {
            return Err(FfdError::shape_mismatch(
                "point batch",
                "at least one point",
                "0 points",
            ));
        }

        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);

        for (index, point) in points.iter().enumerate() {
            for axis in Axis::ALL {
                let c = point[axis.index()];
                if !c.is_finite() {
                    return Err(FfdError::NonFinitePoint { index, axis });
                }
                min[axis.index()] = min[axis.index()].min(c);
                max[axis.index()] = max[axis.index()].max(c);
            }
        }

        let margin = Vector3::repeat(BOUNDS_EPSILON);
        Self::new(min - margin, max + margin)
    }

    /// Grows the frame by a fraction of its extent on every side.
    ///
    /// # Errors
    ///
    /// Returns an error if `fraction` is negative or not finite.
    pub fn with_padding(self, fraction: f64) -> FfdResult<Self> {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(FfdError::invalid_config(format!(
                "padding must be a non-negative finite fraction, got {fraction}"
            )));
        }
        let pad = self.extent() * fraction;
        Self::new(self.min - pad, self.max + pad)
    }

    /// Minimum corner.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> Point3<f64> {
        self.min
    }

    /// Maximum corner.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Point3<f64> {
        self.max
    }

    /// Size of the frame along each axis (always positive).
    #[inline]
    #[must_use]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Center of the frame.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Corner selected by one bit per axis (`false` = min, `true` = max).
    #[must_use]
    pub fn corner(&self, x: bool, y: bool, z: bool) -> Point3<f64> {
        Point3::new(
            if x { self.max.x } else { self.min.x },
            if y { self.max.y } else { self.min.y },
            if z { self.max.z } else { self.min.z },
        )
    }

    /// Maps a world-space point into local cage coordinates.
    ///
    /// No clamping is applied: points outside the frame map outside
    /// `[0, 1]³`.
    #[inline]
    #[must_use]
    pub fn to_local(&self, point: &Point3<f64>) -> LocalCoordinate {
        let offset = point - self.min;
        Point3::from(offset.component_div(&self.extent()))
    }

    /// Maps local cage coordinates back to world space.
    #[inline]
    #[must_use]
    pub fn to_world(&self, local: &LocalCoordinate) -> Point3<f64> {
        self.min + local.coords.component_mul(&self.extent())
    }

    /// Maps a batch of world-space points into local coordinates, keeping
    /// order.
    #[must_use]
    pub fn to_local_batch(&self, points: &[Point3<f64>]) -> Vec<LocalCoordinate> {
        points.iter().map(|p| self.to_local(p)).collect()
    }

    /// Returns true if the point lies inside the frame (boundary included).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        Axis::ALL.iter().all(|axis| {
            let c = point[axis.index()];
            c >= self.min[axis.index()] && c <= self.max[axis.index()]
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame() -> RestFrame {
        RestFrame::new(Point3::new(-1.0, 0.0, 2.0), Point3::new(1.0, 4.0, 3.0)).unwrap()
    }

    #[test]
    fn test_rejects_zero_extent() {
        let err = RestFrame::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 1.0));
        assert_eq!(
            err,
            Err(FfdError::DegenerateFrame {
                axis: Axis::Y,
                min: 0.0,
                max: 0.0
            })
        );
    }

    #[test]
    fn test_rejects_inverted_axis() {
        let err = RestFrame::new(Point3::new(0.0, 0.0, 2.0), Point3::new(1.0, 1.0, 1.0));
        assert!(matches!(
            err,
            Err(FfdError::DegenerateFrame { axis: Axis::Z, .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = RestFrame::new(Point3::new(0.0, f64::NAN, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(err, Err(FfdError::NonFiniteFrame { axis: Axis::Y }));

        let err = RestFrame::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(f64::INFINITY, 1.0, 1.0),
        );
        assert_eq!(err, Err(FfdError::NonFiniteFrame { axis: Axis::X }));
    }

    #[test]
    fn test_local_mapping() {
        let f = frame();
        assert_eq!(f.to_local(&f.min()), Point3::origin());
        assert_eq!(f.to_local(&f.max()), Point3::new(1.0, 1.0, 1.0));

        let local = f.to_local(&Point3::new(0.0, 1.0, 2.5));
        assert_relative_eq!(local, Point3::new(0.5, 0.25, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_local_mapping_is_not_clamped() {
        let f = frame();
        let local = f.to_local(&Point3::new(3.0, -4.0, 4.0));
        assert_relative_eq!(local, Point3::new(2.0, -1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_world_inverts_local() {
        let f = frame();
        for p in [
            Point3::new(0.3, 2.2, 2.9),
            Point3::new(-5.0, 10.0, 0.0),
            Point3::new(1.0, 4.0, 3.0),
        ] {
            assert_relative_eq!(f.to_world(&f.to_local(&p)), p, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_from_points_bounds() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, -1.0, 5.0),
            Point3::new(1.0, 3.0, 1.0),
        ];
        let f = RestFrame::from_points(&points).unwrap();
        assert_relative_eq!(f.min(), Point3::new(0.0, -1.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(f.max(), Point3::new(2.0, 3.0, 5.0), epsilon = 1e-9);
        assert!(points.iter().all(|p| f.contains(p)));
    }

    #[test]
    fn test_from_points_errors() {
        assert!(matches!(
            RestFrame::from_points(&[]),
            Err(FfdError::ShapeMismatch { .. })
        ));
        assert_eq!(
            RestFrame::from_points(&[Point3::new(0.0, 0.0, f64::NAN)]),
            Err(FfdError::NonFinitePoint {
                index: 0,
                axis: Axis::Z
            })
        );
    }

    #[test]
    fn test_padding() {
        let f = RestFrame::unit().with_padding(0.5).unwrap();
        assert_eq!(f.min(), Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(f.max(), Point3::new(1.5, 1.5, 1.5));
        assert!(RestFrame::unit().with_padding(-0.1).is_err());
    }

    #[test]
    fn test_corners_and_center() {
        let f = frame();
        assert_eq!(f.corner(false, false, false), f.min());
        assert_eq!(f.corner(true, true, true), f.max());
        assert_eq!(f.corner(true, false, true), Point3::new(1.0, 0.0, 3.0));
        assert_eq!(f.center(), Point3::new(0.0, 2.0, 2.5));
    }

    #[test]
    fn test_batch_preserves_order() {
        let f = RestFrame::unit();
        let points = [Point3::new(0.9, 0.1, 0.5), Point3::new(0.1, 0.9, 0.5)];
        let local = f.to_local_batch(&points);
        assert_eq!(local, points.to_vec());
    }
}
