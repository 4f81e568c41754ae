//! Deformation results and input checks.

use ffd_types::{Axis, FfdError, FfdResult, Point3, RestFrame};

/// Deformed points with displacement statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformOutput {
    /// Deformed points, in input order.
    pub points: Vec<Point3<f64>>,
    /// Largest distance any point moved.
    pub max_displacement: f64,
    /// Mean distance moved.
    pub mean_displacement: f64,
    /// Number of input points outside the rest frame.
    pub points_outside: usize,
}

impl DeformOutput {
    /// Gathers statistics for `deformed` against the original points.
    #[must_use]
    pub fn new(original: &[Point3<f64>], deformed: Vec<Point3<f64>>, frame: &RestFrame) -> Self {
        let mut max_displacement: f64 = 0.0;
        let mut total = 0.0;
        for (before, after) in original.iter().zip(&deformed) {
            let d = (after - before).norm();
            max_displacement = max_displacement.max(d);
            total += d;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_displacement = if deformed.is_empty() {
            0.0
        } else {
            total / deformed.len() as f64
        };

        Self {
            points_outside: original.iter().filter(|p| !frame.contains(p)).count(),
            points: deformed,
            max_displacement,
            mean_displacement,
        }
    }

    /// Returns true if at least one point moved more than `tolerance`.
    #[must_use]
    pub fn is_displaced(&self, tolerance: f64) -> bool {
        self.max_displacement > tolerance
    }
}

/// Checks that every point coordinate is finite.
///
/// # Errors
///
/// Returns [`FfdError::NonFinitePoint`] for the first offending point.
pub fn validate_points(points: &[Point3<f64>]) -> FfdResult<()> {
    for (index, p) in points.iter().enumerate() {
        if let Some(axis) = Axis::ALL.into_iter().find(|a| !p[a.index()].is_finite()) {
            return Err(FfdError::NonFinitePoint { index, axis });
        }
    }
    Ok(())
}
