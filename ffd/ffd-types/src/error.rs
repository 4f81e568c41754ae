//! Error types for lattice deformation.

use crate::Axis;
use ffd_basis::BasisError;
use thiserror::Error;

/// Broad class of an [`FfdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid cage or input description; fix the configuration.
    Configuration,
    /// Non-finite values in the inputs.
    NumericInstability,
    /// A tensor backend failed to hand back data.
    Backend,
}

/// Errors that can occur while preparing or running a deformation.
///
/// Every error is raised before any output is produced.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum FfdError {
    /// The rest frame has zero or negative extent along an axis.
    #[error("degenerate rest frame on {axis} axis: min {min} must be below max {max}")]
    DegenerateFrame {
        /// Offending axis.
        axis: Axis,
        /// Minimum coordinate.
        min: f64,
        /// Maximum coordinate.
        max: f64,
    },

    /// Fewer than two control points along an axis.
    #[error("{axis} axis needs at least 2 control points, got {count}")]
    InsufficientControlPoints {
        /// Offending axis.
        axis: Axis,
        /// Number of control points requested.
        count: usize,
    },

    /// Array or tensor shapes do not agree.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which input was malformed.
        what: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// A control index is outside the grid.
    #[error("control index {index:?} is outside grid of shape {shape:?}")]
    IndexOutOfRange {
        /// Requested `(i, j, k)`.
        index: [usize; 3],
        /// Grid shape `(R, S, T)`.
        shape: [usize; 3],
    },

    /// Invalid parameter in a configuration struct.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Basis construction failed along an axis.
    #[error("basis construction failed on {axis} axis: {source}")]
    Basis {
        /// Offending axis.
        axis: Axis,
        /// Underlying basis error.
        #[source]
        source: BasisError,
    },

    /// The rest frame has a non-finite coordinate.
    #[error("rest frame has a non-finite coordinate on {axis} axis")]
    NonFiniteFrame {
        /// Offending axis.
        axis: Axis,
    },

    /// A control point has a non-finite coordinate.
    #[error("control point {index:?} has a non-finite {axis} coordinate")]
    NonFiniteControlPoint {
        /// Control index `(i, j, k)`.
        index: [usize; 3],
        /// Offending coordinate.
        axis: Axis,
    },

    /// An input point has a non-finite coordinate.
    #[error("input point {index} has a non-finite {axis} coordinate")]
    NonFinitePoint {
        /// Position in the point batch.
        index: usize,
        /// Offending coordinate.
        axis: Axis,
    },

    /// A fitting target has a non-finite coordinate.
    #[error("fit target {index} has a non-finite {axis} coordinate")]
    NonFiniteTarget {
        /// Position in the target batch.
        index: usize,
        /// Offending coordinate.
        axis: Axis,
    },

    /// An iterative solve left the finite range.
    #[error("fit diverged at iteration {iteration} (loss {loss}); lower the learning rate")]
    Diverged {
        /// Descent step at which the loss or a control point became non-finite.
        iteration: usize,
        /// Last loss value.
        loss: f64,
    },

    /// Tensor data could not be read back from the backend.
    #[error("tensor backend error: {0}")]
    Tensor(String),
}

impl FfdError {
    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a tensor backend error.
    #[must_use]
    pub fn tensor(reason: impl Into<String>) -> Self {
        Self::Tensor(reason.into())
    }

    /// Wraps a basis error with the axis it occurred on.
    #[must_use]
    pub fn basis(axis: Axis, source: BasisError) -> Self {
        match source {
            BasisError::InsufficientControlPoints { count } => {
                Self::InsufficientControlPoints { axis, count }
            }
            source => Self::Basis { axis, source },
        }
    }

    /// Returns the broad class of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NonFiniteFrame { .. }
            | Self::NonFiniteControlPoint { .. }
            | Self::NonFinitePoint { .. }
            | Self::NonFiniteTarget { .. }
            | Self::Diverged { .. } => ErrorCategory::NumericInstability,
            Self::Tensor(_) => ErrorCategory::Backend,
            _ => ErrorCategory::Configuration,
        }
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.category(), ErrorCategory::Configuration)
    }

    /// Returns true for non-finite input errors.
    #[must_use]
    pub const fn is_numeric_instability(&self) -> bool {
        matches!(self.category(), ErrorCategory::NumericInstability)
    }
}

/// Result type for lattice deformation.
pub type FfdResult<T> = Result<T, FfdError>;
