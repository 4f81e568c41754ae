//! Cage descriptions and point-set files for lattice free-form deformation.
//!
//! - **Cages** are JSON documents listing normalised control point
//!   displacements (see [`CageDescription`])
//! - **OBJ** files keep every non-vertex line untouched, so faces and
//!   materials survive a deformation
//! - **XYZ** point clouds hold one `x y z` triple per line (`.xyz`, `.txt`,
//!   `.pts`)
//!
//! # Example
//!
//! ```no_run
//! use ffd_io::{load_cage_description, load_points, save_points, PointContainer};
//! use ffd_types::RestFrame;
//!
//! let cage = load_cage_description("cage.json").unwrap();
//! let mesh = load_points("model.obj").unwrap();
//!
//! let frame = RestFrame::from_points(&mesh.positions()).unwrap();
//! let grid = cage.to_control_grid(&frame).unwrap();
//! # let _ = grid;
//! save_points(&mesh, "deformed.obj").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod cage;
mod error;
mod obj;
mod xyz;

pub use cage::{
    CageDeformation, CageDescription, load_cage_description, save_cage_description,
};
pub use error::{IoError, IoResult};
pub use obj::ObjDocument;
pub use xyz::PointCloud;

use std::path::Path;

use ffd_types::Point3;
use tracing::debug;

/// Anything whose point positions can be read and rewritten in place.
pub trait PointContainer {
    /// Number of points.
    fn len(&self) -> usize;

    /// Whether the container holds no points.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the point positions out, in file order.
    fn positions(&self) -> Vec<Point3<f64>>;

    /// Overwrites the point positions, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Ffd`] wrapping a shape mismatch if `positions`
    /// does not have [`len`](Self::len) entries.
    fn replace_positions(&mut self, positions: &[Point3<f64>]) -> IoResult<()>;
}

/// Supported point-set file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointFormat {
    /// Wavefront OBJ; only `v` lines are points.
    Obj,
    /// Plain-text point cloud.
    Xyz,
}

impl PointFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "xyz" | "txt" | "pts" => Some(Self::Xyz),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Xyz => "xyz",
        }
    }
}

/// A loaded point-set file.
#[derive(Debug, Clone, PartialEq)]
pub enum PointDocument {
    /// An OBJ file.
    Obj(ObjDocument),
    /// A plain-text point cloud.
    Cloud(PointCloud),
}

impl PointDocument {
    /// The format this document was read as.
    #[must_use]
    pub const fn format(&self) -> PointFormat {
        match self {
            Self::Obj(_) => PointFormat::Obj,
            Self::Cloud(_) => PointFormat::Xyz,
        }
    }

    /// Renders the document in `format`.
    ///
    /// Converting an OBJ document to XYZ keeps only its vertices.
    #[must_use]
    pub fn render(&self, format: PointFormat) -> String {
        match (self, format) {
            (Self::Obj(doc), PointFormat::Obj) => doc.to_obj_string(),
            (Self::Cloud(cloud), PointFormat::Xyz) => cloud.to_xyz_string(),
            (Self::Obj(doc), PointFormat::Xyz) => {
                PointCloud::new(doc.positions()).to_xyz_string()
            }
            (Self::Cloud(cloud), PointFormat::Obj) => {
                ObjDocument::from_points(cloud.points()).to_obj_string()
            }
        }
    }
}

impl PointContainer for PointDocument {
    fn len(&self) -> usize {
        match self {
            Self::Obj(doc) => doc.len(),
            Self::Cloud(cloud) => cloud.len(),
        }
    }

    fn positions(&self) -> Vec<Point3<f64>> {
        match self {
            Self::Obj(doc) => doc.positions(),
            Self::Cloud(cloud) => cloud.positions(),
        }
    }

    fn replace_positions(&mut self, positions: &[Point3<f64>]) -> IoResult<()> {
        match self {
            Self::Obj(doc) => doc.replace_positions(positions),
            Self::Cloud(cloud) => cloud.replace_positions(positions),
        }
    }
}

fn format_for(path: &Path) -> IoResult<PointFormat> {
    PointFormat::from_path(path).ok_or_else(|| IoError::UnknownFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a point set, detecting format from extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file does not exist or cannot be read
/// - The file content is invalid for the detected format
pub fn load_points<P: AsRef<Path>>(path: P) -> IoResult<PointDocument> {
    let path = path.as_ref();
    let format = format_for(path)?;
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = std::fs::read_to_string(path)?;
    let doc = match format {
        PointFormat::Obj => PointDocument::Obj(ObjDocument::parse(&text)?),
        PointFormat::Xyz => PointDocument::Cloud(PointCloud::parse(&text)?),
    };
    debug!(path = %path.display(), ?format, points = doc.len(), "loaded point set");
    Ok(doc)
}

/// Save a point set, choosing the format from the extension of `path`.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file cannot be written
pub fn save_points<P: AsRef<Path>>(doc: &PointDocument, path: P) -> IoResult<()> {
    let path = path.as_ref();
    let format = format_for(path)?;
    std::fs::write(path, doc.render(format))?;
    debug!(path = %path.display(), ?format, points = doc.len(), "saved point set");
    Ok(())
}
