//! Core types for lattice free-form deformation.
//!
//! This crate defines the value types shared by every deformation backend:
//!
//! - [`RestFrame`]: the undeformed cage bounds and the world ↔ local map
//! - [`GridShape`]: per-axis control point counts
//! - [`ControlGrid`]: absolute control point positions
//! - [`FfdError`]: configuration and numeric errors, with the offending axis
//!   or index
//!
//! # Coordinates
//!
//! World points map into local cage coordinates with
//! `u = (x - min_x) / (max_x - min_x)` (likewise `v`, `w`). The cage
//! interior is `[0, 1]³`; points outside get coordinates outside that
//! range and are never clamped here.
//!
//! # Example
//!
//! ```
//! use ffd_types::{ControlGrid, GridShape, RestFrame, Point3};
//!
//! let frame = RestFrame::from_points(&[
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(2.0, 1.0, 1.0),
//! ]).unwrap();
//! let grid = ControlGrid::rest(&frame, GridShape::new(4, 2, 2).unwrap()).unwrap();
//! assert_eq!(grid.points().len(), 16);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Feature Flags
//!
//! - `serde`: Serialization for frames, shapes and grids

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod axis;
mod error;
mod frame;
mod grid;

pub use axis::Axis;
pub use error::{ErrorCategory, FfdError, FfdResult};
pub use frame::{BOUNDS_EPSILON, RestFrame};
pub use grid::{ControlGrid, GridShape, MAX_CONTROL_POINTS};

pub use ffd_basis::{BasisKind, ClampedBasis, Extrapolation};
pub use nalgebra::{Point3, Vector3};

/// A point in local cage coordinates `(u, v, w)`.
pub type LocalCoordinate = Point3<f64>;
