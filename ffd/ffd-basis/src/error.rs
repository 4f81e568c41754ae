//! Error types for basis construction.

use thiserror::Error;

/// Errors that can occur while building a spline basis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BasisError {
    /// A spline needs at least two control points to span an interval.
    #[error("insufficient control points: need at least 2, got {count}")]
    InsufficientControlPoints {
        /// Number of control points that was requested.
        count: usize,
    },
}

/// Result type for basis operations.
pub type Result<T> = std::result::Result<T, BasisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_points_message() {
        let err = BasisError::InsufficientControlPoints { count: 1 };
        assert!(err.to_string().contains("at least 2"));
        assert!(err.to_string().contains("got 1"));
    }
}
