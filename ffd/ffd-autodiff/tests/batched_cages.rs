//! Multi-cage tensor deformation against the CPU engine.
//!
//! Run with: cargo test -p ffd-autodiff

#![allow(clippy::unwrap_used)]

use burn::tensor::Tensor;
use ffd_autodiff::{CpuBackend, TensorDeformer, grid_to_tensor, points_to_tensor, tensor_to_points};
use ffd_deform::deform;
use ffd_types::{ControlGrid, Extrapolation, GridShape, Point3, RestFrame, Vector3};

fn cage(frame: RestFrame, shape: GridShape, lift: f64) -> ControlGrid {
    let mut grid = ControlGrid::rest(&frame, shape).unwrap();
    let [r, s, t] = shape.as_array();
    grid.displace(r - 1, s / 2, t - 1, Vector3::new(0.0, lift, lift)).unwrap();
    grid.displace(0, 0, 0, Vector3::new(-lift, 0.0, 0.0)).unwrap();
    grid
}

fn samples(frame: &RestFrame) -> Vec<Point3<f64>> {
    [
        Point3::new(0.1, 0.2, 0.3),
        Point3::new(0.9, 0.4, 0.6),
        Point3::new(0.5, 0.5, 0.5),
        Point3::new(1.2, -0.1, 0.8),
    ]
    .iter()
    .map(|l| frame.to_world(l))
    .collect()
}

#[test]
fn two_cages_with_separate_frames() {
    let device = Default::default();
    let shape = GridShape::new(5, 3, 4).unwrap();
    let frames = [
        RestFrame::unit(),
        RestFrame::new(Point3::new(-2.0, 0.0, 1.0), Point3::new(2.0, 3.0, 2.0)).unwrap(),
    ];
    let grids = [cage(frames[0], shape, 0.3), cage(frames[1], shape, -0.6)];
    let points = [samples(&frames[0]), samples(&frames[1])];

    let deformer = TensorDeformer::<CpuBackend>::new(shape, Extrapolation::Polynomial, &device).unwrap();
    let point_tensor = Tensor::cat(
        points.iter().map(|p| points_to_tensor::<CpuBackend>(p, &device)).collect(),
        0,
    );
    let control_tensor = Tensor::cat(
        grids.iter().map(|g| grid_to_tensor::<CpuBackend>(g, &device)).collect(),
        0,
    );

    let out = deformer.forward(point_tensor, control_tensor, &frames).unwrap();
    assert_eq!(out.dims(), [2, 4, 3]);
    let out = tensor_to_points(&out).unwrap();

    for cage_idx in 0..2 {
        let expected = deform(&points[cage_idx], &frames[cage_idx], &grids[cage_idx]).unwrap();
        for (n, want) in expected.iter().enumerate() {
            let got = out[cage_idx * 4 + n];
            assert!((got - want).norm() < 1e-4, "cage {cage_idx} point {n}: {got} vs {want}");
        }
    }
}

#[test]
fn shared_frame_broadcasts_over_cages() {
    let device = Default::default();
    let shape = GridShape::TRILINEAR;
    let frame = RestFrame::unit();
    let grids = [cage(frame, shape, 0.5), cage(frame, shape, 0.1)];
    let points = samples(&frame);

    let deformer = TensorDeformer::<CpuBackend>::new(shape, Extrapolation::Clamp, &device).unwrap();
    let single = points_to_tensor::<CpuBackend>(&points, &device);
    let point_tensor = Tensor::cat(vec![single.clone(), single], 0);
    let control_tensor = Tensor::cat(
        grids.iter().map(|g| grid_to_tensor::<CpuBackend>(g, &device)).collect(),
        0,
    );

    let out = deformer.forward(point_tensor, control_tensor, &[frame]).unwrap();
    let out = tensor_to_points(&out).unwrap();

    for (cage_idx, grid) in grids.iter().enumerate() {
        let lattice = ffd_deform::Lattice::new(frame, grid.clone())
            .unwrap()
            .with_extrapolation(Extrapolation::Clamp);
        let expected = lattice.deform(&points).unwrap();
        for (n, want) in expected.iter().enumerate() {
            assert!((out[cage_idx * points.len() + n] - want).norm() < 1e-4);
        }
    }
}

#[test]
fn control_batch_must_match_point_batch() {
    let device = Default::default();
    let frame = RestFrame::unit();
    let grid = ControlGrid::from_corners(&frame).unwrap();
    let deformer =
        TensorDeformer::<CpuBackend>::new(GridShape::TRILINEAR, Extrapolation::Polynomial, &device).unwrap();

    let single = points_to_tensor::<CpuBackend>(&samples(&frame), &device);
    let points = Tensor::cat(vec![single.clone(), single.clone(), single], 0);
    let err = deformer
        .forward(points, grid_to_tensor(&grid, &device), &[frame])
        .unwrap_err();
    assert!(err.is_configuration());
}
