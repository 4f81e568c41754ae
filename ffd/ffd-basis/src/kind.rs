//! Degree selection and extrapolation policy.

use crate::{BasisError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest polynomial degree used along any lattice axis.
pub const MAX_DEGREE: usize = 3;

/// Polynomial family of a lattice axis.
///
/// The degree is `min(3, n - 1)` for `n` control points, so coarse lattices
/// fall back to lower-order splines automatically. The variant is resolved
/// once when the axis size is known and never re-dispatched per point.
///
/// # Example
///
/// ```
/// use ffd_basis::BasisKind;
///
/// assert_eq!(BasisKind::for_control_count(2).unwrap(), BasisKind::Linear);
/// assert_eq!(BasisKind::for_control_count(3).unwrap(), BasisKind::Quadratic);
/// assert_eq!(BasisKind::for_control_count(8).unwrap(), BasisKind::Cubic);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BasisKind {
    /// Degree 1: piecewise linear interpolation.
    Linear,
    /// Degree 2.
    Quadratic,
    /// Degree 3.
    Cubic,
}

impl BasisKind {
    /// Selects the basis family for `count` control points.
    ///
    /// # Errors
    ///
    /// Returns [`BasisError::InsufficientControlPoints`] if `count < 2`.
    pub const fn for_control_count(count: usize) -> Result<Self> {
        match count {
            0 | 1 => Err(BasisError::InsufficientControlPoints { count }),
            2 => Ok(Self::Linear),
            3 => Ok(Self::Quadratic),
            _ => Ok(Self::Cubic),
        }
    }

    /// Returns the polynomial degree.
    #[must_use]
    pub const fn degree(self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
            Self::Cubic => 3,
        }
    }

    /// Returns the order (degree + 1), the number of non-zero weights per
    /// evaluation.
    #[must_use]
    pub const fn order(self) -> usize {
        self.degree() + 1
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Quadratic => "quadratic",
            Self::Cubic => "cubic",
        }
    }
}

impl std::fmt::Display for BasisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the basis treats coordinates outside `[0, 1]`.
///
/// # Example
///
/// ```
/// use ffd_basis::Extrapolation;
///
/// assert_eq!(Extrapolation::default(), Extrapolation::Polynomial);
/// assert!((Extrapolation::Clamp.apply(1.5) - 1.0).abs() < 1e-12);
/// assert!((Extrapolation::Polynomial.apply(1.5) - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Extrapolation {
    /// Continue the boundary segment's polynomial indefinitely.
    #[default]
    Polynomial,
    /// Clamp the coordinate to `[0, 1]`, so points beyond the cage follow
    /// the cage boundary.
    Clamp,
}

impl Extrapolation {
    /// Maps a local coordinate according to the policy.
    #[inline]
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Polynomial => t,
            Self::Clamp => t.clamp(0.0, 1.0),
        }
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Polynomial => "polynomial",
            Self::Clamp => "clamp",
        }
    }
}

impl std::fmt::Display for Extrapolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
