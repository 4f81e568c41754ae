//! Moving points and control grids between host memory and tensors.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use ffd_types::{ControlGrid, FfdError, FfdResult, Point3, Vector3};

/// Builds a `[1, N, 3]` tensor from a point batch.
#[must_use]
pub fn points_to_tensor<B: Backend>(points: &[Point3<f64>], device: &B::Device) -> Tensor<B, 3> {
    let data: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    Tensor::from_data(
        TensorData::new(data, [1, points.len(), 3]).convert::<B::FloatElem>(),
        device,
    )
}

/// Builds a `[1, N, 3]` tensor from a vector batch.
#[must_use]
pub fn vectors_to_tensor<B: Backend>(vectors: &[Vector3<f64>], device: &B::Device) -> Tensor<B, 3> {
    let data: Vec<f64> = vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
    Tensor::from_data(
        TensorData::new(data, [1, vectors.len(), 3]).convert::<B::FloatElem>(),
        device,
    )
}

/// Builds a `[1, R, S, T, 3]` tensor from a control grid.
#[must_use]
pub fn grid_to_tensor<B: Backend>(grid: &ControlGrid, device: &B::Device) -> Tensor<B, 5> {
    let [r, s, t] = grid.shape().as_array();
    let data: Vec<f64> = grid.points().iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    Tensor::from_data(
        TensorData::new(data, [1, r, s, t, 3]).convert::<B::FloatElem>(),
        device,
    )
}

/// Reads any float tensor back to host memory as `f64`, row-major.
///
/// # Errors
///
/// Returns [`FfdError::Tensor`] if the backend cannot provide the data.
pub fn read_values<B: Backend, const D: usize>(tensor: &Tensor<B, D>) -> FfdResult<Vec<f64>> {
    tensor
        .to_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| FfdError::tensor(format!("{e:?}")))
}

/// Reads a `[.., 3]` tensor back as points.
///
/// # Errors
///
/// Returns [`FfdError::Tensor`] if the backend cannot provide the data.
pub fn tensor_to_points<B: Backend, const D: usize>(
    tensor: &Tensor<B, D>,
) -> FfdResult<Vec<Point3<f64>>> {
    Ok(read_values(tensor)?
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Reads a `[.., 3]` tensor back as vectors.
///
/// # Errors
///
/// Returns [`FfdError::Tensor`] if the backend cannot provide the data.
pub fn tensor_to_vectors<B: Backend, const D: usize>(
    tensor: &Tensor<B, D>,
) -> FfdResult<Vec<Vector3<f64>>> {
    Ok(read_values(tensor)?
        .chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ffd_types::{GridShape, RestFrame};

    type TestBackend = NdArray<f32>;

    #[test]
    fn points_round_trip_through_tensor() {
        let device = <TestBackend as Backend>::Device::default();
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-0.5, 0.25, 8.0)];

        let tensor = points_to_tensor::<TestBackend>(&points, &device);
        assert_eq!(tensor.dims(), [1, 2, 3]);
        assert_eq!(tensor_to_points(&tensor).unwrap(), points);
    }

    #[test]
    fn grid_tensor_layout() {
        let device = <TestBackend as Backend>::Device::default();
        let shape = GridShape::new(3, 2, 2).unwrap();
        let grid = ControlGrid::rest(&RestFrame::unit(), shape).unwrap();

        let tensor = grid_to_tensor::<TestBackend>(&grid, &device);
        assert_eq!(tensor.dims(), [1, 3, 2, 2, 3]);

        let values = read_values(&tensor).unwrap();
        let p = grid.get(2, 1, 0).unwrap();
        let base = shape.index(2, 1, 0) * 3;
        assert!((values[base] - p.x).abs() < 1e-6);
        assert!((values[base + 1] - p.y).abs() < 1e-6);
        assert!((values[base + 2] - p.z).abs() < 1e-6);
    }
}
