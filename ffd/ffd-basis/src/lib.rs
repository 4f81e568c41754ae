//! Clamped uniform spline basis functions for lattice deformation.
//!
//! Each axis of a deformation lattice blends its control points with a
//! clamped (open) uniform B-spline basis. The degree follows the number of
//! control points on the axis, `min(3, n - 1)`:
//!
//! | Control points | Basis | Behaviour |
//! |----------------|-------|-----------|
//! | 2 | [`BasisKind::Linear`] | linear interpolation, `w = [1 - t, t]` |
//! | 3 | [`BasisKind::Quadratic`] | quadratic Bernstein |
//! | 4 | [`BasisKind::Cubic`] | cubic Bernstein |
//! | ≥ 5 | [`BasisKind::Cubic`] | piecewise cubic with uniform interior knots |
//!
//! For every coordinate the weights sum to one, inside or outside `[0, 1]`.
//!
//! # Example
//!
//! ```
//! use ffd_basis::ClampedBasis;
//!
//! let basis = ClampedBasis::new(5).unwrap();
//! let weights = basis.evaluate(0.3);
//! let sum: f64 = weights.iter().sum();
//! assert!((sum - 1.0).abs() < 1e-12);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Feature Flags
//!
//! - `serde`: Serialization for [`BasisKind`] and [`Extrapolation`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod clamped;
mod error;
mod kind;

pub use clamped::{ClampedBasis, MAX_ORDER, Segment};
pub use error::{BasisError, Result};
pub use kind::{BasisKind, Extrapolation, MAX_DEGREE};
