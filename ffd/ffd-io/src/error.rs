//! Error types for cage and point-set I/O.

use std::path::PathBuf;

use ffd_types::FfdError;
use thiserror::Error;

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while reading or writing cages and point sets.
#[derive(Debug, Error)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Unknown file format (unrecognized extension).
    #[error("unknown file format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// Invalid file content.
    #[error("invalid content at line {line}: {message}")]
    InvalidContent {
        /// 1-based line number, or 0 when not tied to a line.
        line: usize,
        /// Description of what was invalid.
        message: String,
    },

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The described lattice is invalid.
    #[error(transparent)]
    Ffd(#[from] FfdError),
}

impl IoError {
    /// Create an `InvalidContent` error for a line.
    #[must_use]
    pub fn invalid_content(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidContent {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffd_types::Axis;

    #[test]
    fn invalid_content_reports_line() {
        let err = IoError::invalid_content(12, "expected 3 coordinates");
        assert_eq!(
            err.to_string(),
            "invalid content at line 12: expected 3 coordinates"
        );
    }

    #[test]
    fn lattice_errors_pass_through() {
        let err: IoError = FfdError::InsufficientControlPoints {
            axis: Axis::X,
            count: 1,
        }
        .into();
        assert!(err.to_string().contains("x axis"));
    }
}
