//! Tensor execution behind the common backend trait.

use burn::prelude::Backend;
use ffd_deform::{DeformationBackend, Lattice};
use ffd_types::{FfdResult, Point3};

use crate::TensorDeformer;
use crate::convert::{grid_to_tensor, points_to_tensor, tensor_to_points};

/// Runs lattice deformation on a `burn` backend.
///
/// Results are read back into `f64`; precision follows the backend's float
/// element type.
#[derive(Debug, Clone, Default)]
pub struct TensorBackend<B: Backend> {
    device: B::Device,
}

impl<B: Backend> TensorBackend<B> {
    /// Creates a backend on `device`.
    #[must_use]
    pub const fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Target device.
    #[must_use]
    pub const fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> DeformationBackend for TensorBackend<B> {
    fn name(&self) -> &'static str {
        "tensor"
    }

    fn deform(&self, lattice: &Lattice, points: &[Point3<f64>]) -> FfdResult<Vec<Point3<f64>>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        let deformer =
            TensorDeformer::<B>::new(lattice.shape(), lattice.extrapolation(), &self.device)?;
        let out = deformer.forward(
            points_to_tensor::<B>(points, &self.device),
            grid_to_tensor::<B>(lattice.grid(), &self.device),
            std::slice::from_ref(lattice.frame()),
        )?;
        tensor_to_points(&out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use ffd_deform::{ArrayBackend, ScalarBackend};
    use ffd_types::{ControlGrid, Extrapolation, GridShape, RestFrame, Vector3};

    fn lattice(extrapolation: Extrapolation) -> Lattice {
        let frame = RestFrame::new(Point3::new(0.0, -1.0, 0.0), Point3::new(2.0, 1.0, 1.0)).unwrap();
        let shape = GridShape::new(4, 6, 3).unwrap();
        let mut lattice = Lattice::new(frame, ControlGrid::rest(&frame, shape).unwrap())
            .unwrap()
            .with_extrapolation(extrapolation);
        lattice
            .displace_control_point(2, 3, 1, Vector3::new(0.2, -0.1, 0.3))
            .unwrap();
        lattice
            .displace_control_point(0, 5, 2, Vector3::new(0.0, 0.4, 0.0))
            .unwrap();
        lattice
    }

    fn points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.3, -0.7, 0.2),
            Point3::new(1.1, 0.1, 0.6),
            Point3::new(1.9, 0.9, 0.95),
            Point3::new(2.5, 1.4, -0.2),
            Point3::new(-0.4, 0.0, 0.5),
        ]
    }

    #[test]
    fn all_backends_agree() {
        for extrapolation in [Extrapolation::Polynomial, Extrapolation::Clamp] {
            let lattice = lattice(extrapolation);
            let points = points();

            let tensor = lattice
                .deform_with(&TensorBackend::<CpuBackend>::default(), &points)
                .unwrap();
            let array = lattice.deform_with(&ArrayBackend, &points).unwrap();
            let scalar = lattice.deform_with(&ScalarBackend, &points).unwrap();

            for ((t, a), s) in tensor.iter().zip(&array).zip(&scalar) {
                assert!((t - a).norm() < 1e-4, "tensor {t} vs array {a}");
                assert!((a - s).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn empty_batch_gives_empty_result() {
        let lattice = lattice(Extrapolation::Polynomial);
        let out = lattice
            .deform_with(&TensorBackend::<CpuBackend>::default(), &[])
            .unwrap();
        assert!(out.is_empty());
        assert!(lattice.deform_with(&ArrayBackend, &[]).unwrap().is_empty());
    }

    #[test]
    fn tensor_backend_name() {
        assert_eq!(TensorBackend::<CpuBackend>::default().name(), "tensor");
    }
}
