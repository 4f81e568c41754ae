//! Clamped uniform B-spline basis along one lattice axis.
//!
//! The knot vector repeats its end knots `degree + 1` times, so the first and
//! last control points are interpolated exactly. Interior knots are spaced
//! uniformly over `[0, 1]`. Coordinates outside `[0, 1]` evaluate the
//! boundary segment's polynomial unless the basis is configured to clamp.

use crate::{BasisKind, Extrapolation, MAX_DEGREE, Result};

/// Number of coefficients in a segment polynomial (`MAX_DEGREE + 1`).
pub const MAX_ORDER: usize = MAX_DEGREE + 1;

/// A clamped uniform spline basis for `count` control points.
///
/// # Example
///
/// ```
/// use ffd_basis::ClampedBasis;
///
/// let basis = ClampedBasis::new(2).unwrap();
/// let weights = basis.evaluate(0.25);
/// assert!((weights[0] - 0.75).abs() < 1e-12);
/// assert!((weights[1] - 0.25).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClampedBasis {
    /// Number of control points along the axis.
    count: usize,
    /// Polynomial family, resolved from `count`.
    kind: BasisKind,
    /// Full clamped knot vector (`count + degree + 1` entries).
    knots: Vec<f64>,
    /// Treatment of coordinates outside `[0, 1]`.
    extrapolation: Extrapolation,
}

impl ClampedBasis {
    /// Builds the basis for `count` control points with polynomial
    /// extrapolation.
    ///
    /// # Errors
    ///
    /// Returns an error if `count < 2`.
    pub fn new(count: usize) -> Result<Self> {
        let kind = BasisKind::for_control_count(count)?;
        let degree = kind.degree();

        let mut knots = Vec::with_capacity(count + degree + 1);
        knots.extend(std::iter::repeat_n(0.0, degree + 1));

        let num_interior = count - degree - 1;
        #[allow(clippy::cast_precision_loss)]
        for i in 1..=num_interior {
            knots.push(i as f64 / (num_interior + 1) as f64);
        }

        knots.extend(std::iter::repeat_n(1.0, degree + 1));

        Ok(Self {
            count,
            kind,
            knots,
            extrapolation: Extrapolation::default(),
        })
    }

    /// Sets the extrapolation policy.
    #[must_use]
    pub const fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Number of control points (and weights) along the axis.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Polynomial family.
    #[must_use]
    pub const fn kind(&self) -> BasisKind {
        self.kind
    }

    /// Polynomial degree.
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.kind.degree()
    }

    /// Extrapolation policy.
    #[must_use]
    pub const fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    /// The full clamped knot vector.
    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Interior knots, i.e. the breaks between polynomial segments.
    #[must_use]
    pub fn segment_breaks(&self) -> &[f64] {
        &self.knots[self.degree() + 1..self.count]
    }

    /// Number of polynomial segments (`count - degree`).
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.count - self.kind.degree()
    }

    /// Returns the knot span used for coordinate `t`.
    ///
    /// The span is right-continuous: a coordinate lying exactly on an
    /// interior knot belongs to the segment starting at that knot. Values
    /// at or beyond 1 use the last span, values below 0 the first.
    #[must_use]
    pub fn span(&self, t: f64) -> usize {
        self.span_of(self.extrapolation.apply(t))
    }

    fn span_of(&self, t: f64) -> usize {
        self.degree() + self.segment_breaks().partition_point(|&knot| knot <= t)
    }

    /// Evaluates the non-zero basis functions at `t`.
    ///
    /// Returns the index of the first non-zero function and the
    /// `degree + 1` weights starting there; entries past the degree are
    /// zero.
    #[must_use]
    pub fn nonzero(&self, t: f64) -> (usize, [f64; MAX_ORDER]) {
        let t = self.extrapolation.apply(t);
        let span = self.span_of(t);
        let p = self.degree();
        let knots = &self.knots;

        let mut basis = [0.0; MAX_ORDER];
        let mut left = [0.0; MAX_ORDER];
        let mut right = [0.0; MAX_ORDER];
        basis[0] = 1.0;

        for j in 1..=p {
            left[j] = t - knots[span + 1 - j];
            right[j] = knots[span + j] - t;

            let mut saved = 0.0;
            for r in 0..j {
                // Knot differences are positive for every valid span of a
                // clamped vector, independent of t.
                let temp = basis[r] / (right[r + 1] + left[j - r]);
                basis[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            basis[j] = saved;
        }

        (span - p, basis)
    }

    /// Writes all `count` weights for coordinate `t` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != self.count()`.
    pub fn evaluate_into(&self, t: f64, out: &mut [f64]) {
        assert_eq!(out.len(), self.count, "weight buffer has wrong length");
        let (first, basis) = self.nonzero(t);
        out.fill(0.0);
        let order = self.kind.order();
        out[first..first + order].copy_from_slice(&basis[..order]);
    }

    /// Returns all `count` weights for coordinate `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Vec<f64> {
        let mut weights = vec![0.0; self.count];
        self.evaluate_into(t, &mut weights);
        weights
    }

    /// Greville abscissae: the parameter values at which control points
    /// must sit for the basis to reproduce the identity map.
    ///
    /// For up to four control points these are uniformly spaced.
    #[must_use]
    pub fn greville_abscissae(&self) -> Vec<f64> {
        let p = self.degree();
        #[allow(clippy::cast_precision_loss)]
        let scale = p as f64;
        (0..self.count)
            .map(|i| self.knots[i + 1..=i + p].iter().sum::<f64>() / scale)
            .collect()
    }

    /// Power-basis coefficients of every basis function on every segment.
    ///
    /// Segment `s` covers `[breaks[s-1], breaks[s])`; the first segment is
    /// unbounded below and the last unbounded above, matching [`span`].
    /// Each polynomial is expressed in the segment-local variable
    /// `u = (t - origin) / width`, which stays in `[0, 1)` inside the
    /// segment and keeps coefficients small enough for `f32` evaluation.
    /// Coefficients are obtained by running the Cox–de Boor recursion on
    /// polynomials instead of numbers.
    ///
    /// [`span`]: Self::span
    #[must_use]
    pub fn segment_polynomials(&self) -> Vec<Segment> {
        let breaks = self.segment_breaks();
        let last = self.segment_count() - 1;

        (0..self.segment_count())
            .map(|s| {
                let span = self.degree() + s;
                let origin = self.knots[span];
                let width = self.knots[span + 1] - origin;
                Segment {
                    lower: (s > 0).then(|| breaks[s - 1]),
                    upper: (s < last).then(|| breaks[s]),
                    origin,
                    width,
                    coefficients: self.span_coefficients(span, origin, width),
                }
            })
            .collect()
    }

    /// Runs the recursion with `t = origin + width·u`.
    fn span_coefficients(&self, span: usize, origin: f64, width: f64) -> Vec<[f64; MAX_ORDER]> {
        let knots = &self.knots;
        let functions = knots.len() - 1;

        let mut current: Vec<[f64; MAX_ORDER]> = (0..functions)
            .map(|i| {
                let mut poly = [0.0; MAX_ORDER];
                if i == span {
                    poly[0] = 1.0;
                }
                poly
            })
            .collect();

        for d in 1..=self.degree() {
            current = (0..functions - d)
                .map(|i| {
                    let mut poly = [0.0; MAX_ORDER];

                    // (t - k_i) / left
                    let left = knots[i + d] - knots[i];
                    if left > 0.0 {
                        add_linear_times(
                            &mut poly,
                            &current[i],
                            (origin - knots[i]) / left,
                            width / left,
                        );
                    }

                    // (k_{i+d+1} - t) / right
                    let right = knots[i + d + 1] - knots[i + 1];
                    if right > 0.0 {
                        add_linear_times(
                            &mut poly,
                            &current[i + 1],
                            (knots[i + d + 1] - origin) / right,
                            -width / right,
                        );
                    }

                    poly
                })
                .collect();
        }

        current
    }
}

/// `acc += (a + b·u) · poly`
fn add_linear_times(acc: &mut [f64; MAX_ORDER], poly: &[f64; MAX_ORDER], a: f64, b: f64) {
    for k in 0..MAX_ORDER {
        acc[k] += a * poly[k];
        if k > 0 {
            acc[k] += b * poly[k - 1];
        }
    }
}

/// One polynomial piece of a [`ClampedBasis`].
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Inclusive lower break, or `None` when unbounded.
    pub lower: Option<f64>,
    /// Exclusive upper break, or `None` when unbounded.
    pub upper: Option<f64>,
    /// Knot at which the local variable is zero.
    pub origin: f64,
    /// Knot spacing of the segment; `u = (t - origin) / width`.
    pub width: f64,
    /// `coefficients[i][d]` multiplies `u^d` in basis function `i`.
    pub coefficients: Vec<[f64; MAX_ORDER]>,
}

impl Segment {
    /// Returns true if `t` selects this segment.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.lower.is_none_or(|lo| t >= lo) && self.upper.is_none_or(|hi| t < hi)
    }

    /// Segment-local variable for `t`.
    #[must_use]
    pub fn local(&self, t: f64) -> f64 {
        (t - self.origin) / self.width
    }

    /// Evaluates every basis function's polynomial at `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Vec<f64> {
        let u = self.local(t);
        self.coefficients
            .iter()
            .map(|c| c.iter().rev().fold(0.0_f64, |acc, &coef| acc.mul_add(u, coef)))
            .collect()
    }
}
