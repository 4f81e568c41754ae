//! Behavioural tests for the deformation engine.
//!
//! Run with: cargo test -p ffd-deform

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use ffd_deform::{ArrayBackend, DeformationBackend, Lattice, ScalarBackend, deform, deform_with};
use ffd_types::{Axis, ControlGrid, FfdError, GridShape, Point3, RestFrame, Vector3};

// =============================================================================
// Helpers
// =============================================================================

fn unit_corners() -> (RestFrame, ControlGrid) {
    let frame = RestFrame::unit();
    let grid = ControlGrid::from_corners(&frame).unwrap();
    (frame, grid)
}

fn sample_points() -> Vec<Point3<f64>> {
    let mut points = Vec::new();
    for &x in &[-0.5, 0.0, 0.1, 0.5, 0.77, 1.0, 1.6] {
        for &y in &[0.0, 0.33, 1.0] {
            for &z in &[-0.25, 0.5, 1.0] {
                points.push(Point3::new(x, y, z));
            }
        }
    }
    points
}

fn backends() -> Vec<Box<dyn DeformationBackend>> {
    vec![Box::new(ArrayBackend), Box::new(ScalarBackend)]
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn lifted_corner_on_every_backend() {
    let (frame, mut grid) = unit_corners();
    grid.displace(1, 1, 1, Vector3::new(0.0, 0.0, 0.5)).unwrap();

    let points = [
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.5, 0.5, 0.5),
    ];

    for backend in backends() {
        let out = deform_with(backend.as_ref(), &points, &frame, &grid).unwrap();
        assert_relative_eq!(out[0], Point3::new(1.0, 1.0, 1.5), epsilon = 1e-12);
        assert_relative_eq!(out[1], Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[2], Point3::new(0.5, 0.5, 0.5625), epsilon = 1e-12);
    }
}

// =============================================================================
// Exactness
// =============================================================================

#[test]
fn trilinear_corners_are_exact() {
    let frame = RestFrame::new(Point3::new(-2.0, 1.0, 0.0), Point3::new(2.0, 3.0, 1.0)).unwrap();
    let mut grid = ControlGrid::from_corners(&frame).unwrap();
    grid.set(0, 0, 0, Point3::new(-3.0, 0.0, -1.0)).unwrap();
    grid.set(1, 1, 1, Point3::new(5.0, 5.0, 5.0)).unwrap();

    let out = deform(&[frame.min(), frame.max()], &frame, &grid).unwrap();
    assert_relative_eq!(out[0], Point3::new(-3.0, 0.0, -1.0), epsilon = 1e-12);
    assert_relative_eq!(out[1], Point3::new(5.0, 5.0, 5.0), epsilon = 1e-12);
}

#[test]
fn trilinear_matches_hand_formula() {
    let (frame, mut grid) = unit_corners();
    let offsets = [
        Vector3::new(0.1, 0.0, 0.0),
        Vector3::new(0.0, -0.2, 0.0),
        Vector3::new(0.0, 0.0, 0.3),
        Vector3::new(0.05, 0.05, 0.0),
        Vector3::new(-0.1, 0.0, 0.1),
        Vector3::new(0.0, 0.2, -0.2),
        Vector3::new(0.3, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 0.0),
    ];
    grid = grid.with_displacements(&offsets).unwrap();

    let trilinear = |p: &Point3<f64>| {
        let (u, v, w) = (p.x, p.y, p.z);
        let mut acc = Vector3::zeros();
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    let wu = if i == 0 { 1.0 - u } else { u };
                    let wv = if j == 0 { 1.0 - v } else { v };
                    let wt = if k == 0 { 1.0 - w } else { w };
                    acc += grid.get(i, j, k).unwrap().coords * (wu * wv * wt);
                }
            }
        }
        Point3::from(acc)
    };

    let points = sample_points();
    let out = deform(&points, &frame, &grid).unwrap();
    for (p, q) in points.iter().zip(&out) {
        assert_relative_eq!(*q, trilinear(p), epsilon = 1e-12);
    }
}

#[test]
fn rest_grid_is_identity_at_any_resolution() {
    let frame = RestFrame::new(Point3::new(-1.0, -2.0, 0.5), Point3::new(3.0, 2.0, 1.5)).unwrap();
    let points: Vec<_> = sample_points().iter().map(|p| frame.to_world(p)).collect();

    for dims in [[2, 2, 2], [3, 3, 3], [4, 2, 3], [5, 6, 7], [9, 4, 2]] {
        let grid = ControlGrid::rest(&frame, GridShape::from_array(dims).unwrap()).unwrap();
        for backend in backends() {
            let out = deform_with(backend.as_ref(), &points, &frame, &grid).unwrap();
            for (p, q) in points.iter().zip(&out) {
                assert_relative_eq!(*p, *q, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn translation_of_all_controls_translates_points() {
    let frame = RestFrame::unit();
    let shape = GridShape::new(5, 4, 3).unwrap();
    let offset = Vector3::new(0.3, -1.0, 2.5);
    let grid = ControlGrid::rest(&frame, shape)
        .unwrap()
        .with_displacements(&vec![offset; shape.count()])
        .unwrap();

    let points = sample_points();
    let out = deform(&points, &frame, &grid).unwrap();
    for (p, q) in points.iter().zip(&out) {
        assert_relative_eq!(*q, p + offset, epsilon = 1e-9);
    }
}

#[test]
fn backends_agree_on_warped_cubic_grid() {
    let frame = RestFrame::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)).unwrap();
    let shape = GridShape::new(6, 4, 3).unwrap();
    let mut lattice = Lattice::new(frame, ControlGrid::rest(&frame, shape).unwrap()).unwrap();
    for flat in 0..shape.count() {
        let [i, j, k] = shape.unflatten(flat);
        #[allow(clippy::cast_precision_loss)]
        let phase = flat as f64 * 0.37;
        lattice
            .displace_control_point(i, j, k, Vector3::new(phase.sin(), phase.cos(), 0.1 * phase) * 0.1)
            .unwrap();
    }

    let points: Vec<_> = sample_points().iter().map(|p| frame.to_world(p)).collect();
    let a = lattice.deform_with(&ArrayBackend, &points).unwrap();
    let b = lattice.deform_with(&ScalarBackend, &points).unwrap();
    for (pa, pb) in a.iter().zip(&b) {
        assert_relative_eq!(*pa, *pb, epsilon = 1e-10);
    }
}

#[test]
fn order_and_cardinality_preserved() {
    let (frame, grid) = unit_corners();
    let points = sample_points();
    let out = deform(&points, &frame, &grid).unwrap();
    assert_eq!(out.len(), points.len());
    assert!(deform(&[], &frame, &grid).unwrap().is_empty());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn degenerate_frame_is_rejected() {
    let err = RestFrame::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)).unwrap_err();
    assert!(matches!(err, FfdError::DegenerateFrame { axis: Axis::Z, .. }));
    assert!(err.is_configuration());
}

#[test]
fn single_control_point_axis_is_rejected() {
    let err = GridShape::new(2, 2, 1).unwrap_err();
    assert_eq!(
        err,
        FfdError::InsufficientControlPoints {
            axis: Axis::Z,
            count: 1
        }
    );
}

#[test]
fn non_finite_inputs_are_numeric_errors() {
    let (frame, mut grid) = unit_corners();

    let err = deform(&[Point3::new(0.0, f64::NAN, 0.0)], &frame, &grid).unwrap_err();
    assert!(err.is_numeric_instability());

    grid.set(1, 0, 0, Point3::new(0.0, 0.0, f64::INFINITY)).unwrap();
    let err = deform(&[Point3::origin()], &frame, &grid).unwrap_err();
    assert_eq!(
        err,
        FfdError::NonFiniteControlPoint {
            index: [1, 0, 0],
            axis: Axis::Z
        }
    );
}
