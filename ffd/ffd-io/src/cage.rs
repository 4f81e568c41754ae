//! JSON cage descriptions.
//!
//! A cage description lists control point displacements in a normalised
//! form that does not depend on the mesh being deformed:
//!
//! ```json
//! {
//!   "resolution": [2, 2, 2],
//!   "lattice_deformations": {
//!     "0": { "original": [0.5, -0.5, -0.5], "deformation": [0.0, 0.1, 0.0] }
//!   }
//! }
//! ```
//!
//! `original` locates a control point in the centred unit cage
//! `[-0.5, 0.5]³`; `deformation` is its displacement as a fraction of the
//! rest frame extent. `resolution` defaults to `[2, 2, 2]`.

use std::collections::BTreeMap;
use std::path::Path;

use ffd_types::{Axis, ControlGrid, GridShape, RestFrame, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{IoError, IoResult};

/// Distance from a lattice node below which an `original` entry snaps to it.
const NODE_TOLERANCE: f64 = 1e-6;

/// One displaced control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CageDeformation {
    /// Position in the centred unit cage.
    pub original: [f64; 3],
    /// Displacement as a fraction of the frame extent.
    pub deformation: [f64; 3],
}

/// A cage description document.
///
/// # Example
///
/// ```
/// use ffd_io::CageDescription;
/// use ffd_types::{Point3, RestFrame};
///
/// let cage = CageDescription::from_json_str(r#"{
///     "lattice_deformations": {
///         "0": { "original": [0.5, 0.5, 0.5], "deformation": [0.0, 0.0, 0.5] }
///     }
/// }"#).unwrap();
///
/// let grid = cage.to_control_grid(&RestFrame::unit()).unwrap();
/// assert_eq!(grid.get(1, 1, 1), Some(Point3::new(1.0, 1.0, 1.5)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CageDescription {
    /// Control points per axis.
    #[serde(default = "default_resolution")]
    pub resolution: [usize; 3],
    /// Displaced control points, keyed by an arbitrary label.
    #[serde(default)]
    pub lattice_deformations: BTreeMap<String, CageDeformation>,
}

const fn default_resolution() -> [usize; 3] {
    [2, 2, 2]
}

impl Default for CageDescription {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            lattice_deformations: BTreeMap::new(),
        }
    }
}

impl CageDescription {
    /// Parses a description from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] for malformed JSON.
    pub fn from_json_str(json: &str) -> IoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialises the description as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] if serialisation fails.
    pub fn to_json_string(&self) -> IoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Grid shape described by `resolution`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Ffd`] if an axis has fewer than two control points.
    pub fn shape(&self) -> IoResult<GridShape> {
        Ok(GridShape::from_array(self.resolution)?)
    }

    /// Builds the control grid for `frame`.
    ///
    /// Starts from the rest grid and moves every listed control point by
    /// `deformation ⊙ extent`. A later entry for the same node replaces an
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidContent`] for an entry that does not sit on
    /// a lattice node or has non-finite values, and [`IoError::Ffd`] for an
    /// invalid resolution.
    pub fn to_control_grid(&self, frame: &RestFrame) -> IoResult<ControlGrid> {
        let shape = self.shape()?;
        let rest = ControlGrid::rest(frame, shape)?;
        let mut grid = rest.clone();
        let extent = frame.extent();

        for (key, entry) in &self.lattice_deformations {
            let [i, j, k] = node_index(key, &entry.original, shape)?;
            let deformation = Vector3::from(entry.deformation);
            if deformation.iter().any(|d| !d.is_finite()) {
                return Err(IoError::invalid_content(
                    0,
                    format!("deformation of entry {key:?} is not finite"),
                ));
            }

            let offset = deformation.component_mul(&extent);
            let base = rest.points()[shape.index(i, j, k)];
            grid.set(i, j, k, base + offset)?;
            debug!(key = %key, index = ?[i, j, k], offset = ?offset, "control point displaced");
        }

        Ok(grid)
    }

    /// Describes the displaced control points of `grid` relative to the rest
    /// grid of `frame`.
    ///
    /// Control points that have not moved are omitted. Entries are keyed
    /// `"0"`, `"1"`, ... in grid storage order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Ffd`] if the rest grid cannot be built.
    pub fn from_control_grid(grid: &ControlGrid, frame: &RestFrame) -> IoResult<Self> {
        let shape = grid.shape();
        let rest = ControlGrid::rest(frame, shape)?;
        let extent = frame.extent();

        let mut lattice_deformations = BTreeMap::new();
        for ((index, point), base) in grid.iter_indexed().zip(rest.points()) {
            let offset = point - base;
            if offset == Vector3::zeros() {
                continue;
            }

            let mut original = [0.0; 3];
            for axis in Axis::ALL {
                let a = axis.index();
                #[allow(clippy::cast_precision_loss)]
                let span = (shape.dim(axis) - 1) as f64;
                #[allow(clippy::cast_precision_loss)]
                let position = index[a] as f64 / span;
                original[a] = position - 0.5;
            }
            let deformation = offset.component_div(&extent);

            lattice_deformations.insert(
                lattice_deformations.len().to_string(),
                CageDeformation {
                    original,
                    deformation: [deformation.x, deformation.y, deformation.z],
                },
            );
        }

        Ok(Self {
            resolution: shape.as_array(),
            lattice_deformations,
        })
    }
}

/// Maps a centred unit-cage position to lattice indices.
fn node_index(key: &str, original: &[f64; 3], shape: GridShape) -> IoResult<[usize; 3]> {
    let mut index = [0; 3];
    for axis in Axis::ALL {
        let a = axis.index();
        #[allow(clippy::cast_precision_loss)]
        let span = (shape.dim(axis) - 1) as f64;
        let position = (original[a] + 0.5) * span;
        let node = position.round();

        if !position.is_finite() || (position - node).abs() > NODE_TOLERANCE * span.max(1.0) {
            return Err(IoError::invalid_content(
                0,
                format!("entry {key:?}: original {original:?} is not on a lattice node along {axis}"),
            ));
        }
        if node < 0.0 || node > span {
            return Err(IoError::invalid_content(
                0,
                format!("entry {key:?}: original {original:?} lies outside the cage along {axis}"),
            ));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            index[a] = node as usize;
        }
    }
    Ok(index)
}

/// Loads a cage description from a JSON file.
///
/// # Errors
///
/// Returns [`IoError::FileNotFound`] if the file does not exist, or a read
/// or parse error.
pub fn load_cage_description<P: AsRef<Path>>(path: P) -> IoResult<CageDescription> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    CageDescription::from_json_str(&text)
}

/// Saves a cage description as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_cage_description<P: AsRef<Path>>(cage: &CageDescription, path: P) -> IoResult<()> {
    std::fs::write(path, cage.to_json_string()?)?;
    Ok(())
}
