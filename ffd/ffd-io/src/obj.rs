//! Wavefront OBJ documents with vertex pass-through.
//!
//! Only geometric vertex lines (`v x y z [w]`) are interpreted. Faces,
//! normals, texture coordinates, groups, materials and comments are kept
//! verbatim so a deformed document differs from its source only in the
//! vertex positions.

use std::fmt::Write as _;

use ffd_types::{FfdError, Point3};

use crate::{IoError, IoResult, PointContainer};

#[derive(Debug, Clone, PartialEq)]
enum ObjLine {
    Vertex {
        position: Point3<f64>,
        /// Tokens after `x y z`, such as `w` or vertex colours.
        extra: Vec<String>,
    },
    Other(String),
}

/// An OBJ file held as lines.
///
/// # Example
///
/// ```
/// use ffd_io::{ObjDocument, PointContainer};
/// use ffd_types::Point3;
///
/// let mut doc = ObjDocument::parse("# tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
/// assert_eq!(doc.len(), 3);
///
/// let lifted: Vec<_> = doc.positions().iter().map(|p| p + nalgebra::Vector3::z()).collect();
/// doc.replace_positions(&lifted).unwrap();
/// assert_eq!(doc.to_obj_string(), "# tri\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 1 2 3\n");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjDocument {
    lines: Vec<ObjLine>,
}

impl ObjDocument {
    /// Parses OBJ text.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidContent`] with the 1-based line number for
    /// a vertex line with fewer than three numeric coordinates.
    pub fn parse(text: &str) -> IoResult<Self> {
        let mut lines = Vec::new();

        for (n, raw) in text.lines().enumerate() {
            let mut tokens = raw.split_whitespace();
            if tokens.next() != Some("v") {
                lines.push(ObjLine::Other(raw.to_string()));
                continue;
            }

            let mut coords = [0.0; 3];
            for (axis, slot) in coords.iter_mut().enumerate() {
                let token = tokens.next().ok_or_else(|| {
                    IoError::invalid_content(n + 1, "vertex needs at least 3 coordinates")
                })?;
                *slot = token.parse().map_err(|_| {
                    IoError::invalid_content(
                        n + 1,
                        format!("vertex coordinate {axis} is not a number: {token:?}"),
                    )
                })?;
            }

            lines.push(ObjLine::Vertex {
                position: Point3::from(coords),
                extra: tokens.map(str::to_string).collect(),
            });
        }

        Ok(Self { lines })
    }

    /// Creates a document holding only vertex lines.
    #[must_use]
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        Self {
            lines: points
                .iter()
                .map(|p| ObjLine::Vertex {
                    position: *p,
                    extra: Vec::new(),
                })
                .collect(),
        }
    }

    /// Number of lines that are not vertices.
    #[must_use]
    pub fn passthrough_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, ObjLine::Other(_)))
            .count()
    }

    /// Renders the document as OBJ text.
    #[must_use]
    pub fn to_obj_string(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                ObjLine::Vertex { position, extra } => {
                    let _ = write!(out, "v {} {} {}", position.x, position.y, position.z);
                    for token in extra {
                        out.push(' ');
                        out.push_str(token);
                    }
                }
                ObjLine::Other(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }
}

impl PointContainer for ObjDocument {
    fn len(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, ObjLine::Vertex { .. }))
            .count()
    }

    fn positions(&self) -> Vec<Point3<f64>> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                ObjLine::Vertex { position, .. } => Some(*position),
                ObjLine::Other(_) => None,
            })
            .collect()
    }

    fn replace_positions(&mut self, positions: &[Point3<f64>]) -> IoResult<()> {
        let count = self.len();
        if positions.len() != count {
            return Err(FfdError::shape_mismatch(
                "replacement positions",
                format!("{count} points"),
                format!("{} points", positions.len()),
            )
            .into());
        }

        let vertices = self.lines.iter_mut().filter_map(|l| match l {
            ObjLine::Vertex { position, .. } => Some(position),
            ObjLine::Other(_) => None,
        });
        for (slot, p) in vertices.zip(positions) {
            *slot = *p;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CUBE_CORNER: &str = "\
# corner of a cube
mtllib cube.mtl
o Corner
v 0.0 0.0 0.0
v 1.0 0.0 0.0 1.0
vt 0.5 0.5
vn 0 0 1
v 0.0 1.0 0.0 0.2 0.3 0.4
usemtl steel
f 1/1/1 2/1/1 3/1/1
";

    #[test]
    fn only_vertex_lines_are_points() {
        let doc = ObjDocument::parse(CUBE_CORNER).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.passthrough_lines(), 7);
        assert_eq!(doc.positions()[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn non_vertex_lines_survive_unchanged() {
        let mut doc = ObjDocument::parse(CUBE_CORNER).unwrap();
        let moved: Vec<_> = doc
            .positions()
            .iter()
            .map(|p| Point3::new(p.x + 2.0, p.y, p.z))
            .collect();
        doc.replace_positions(&moved).unwrap();

        let text = doc.to_obj_string();
        let original: Vec<_> = CUBE_CORNER.lines().collect();
        let written: Vec<_> = text.lines().collect();
        assert_eq!(original.len(), written.len());

        for (a, b) in original.iter().zip(&written) {
            if a.starts_with("v ") {
                assert!(b.starts_with("v "), "{b}");
                assert_ne!(a, b);
            } else {
                assert_eq!(a, b);
            }
        }
        assert!(text.contains("v 3 0 0 1.0\n"));
        assert!(text.contains("v 2 1 0 0.2 0.3 0.4\n"));
    }

    #[test]
    fn replace_checks_count() {
        let mut doc = ObjDocument::parse(CUBE_CORNER).unwrap();
        let err = doc.replace_positions(&[Point3::origin()]).unwrap_err();
        assert!(matches!(err, IoError::Ffd(FfdError::ShapeMismatch { .. })));
    }

    #[test]
    fn bad_vertex_reports_line() {
        let err = ObjDocument::parse("o x\nv 1 2\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { line: 2, .. }));

        let err = ObjDocument::parse("v 1 two 3\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { line: 1, .. }));
    }

    #[test]
    fn from_points_writes_vertices() {
        let doc = ObjDocument::from_points(&[Point3::new(0.5, -1.0, 2.25)]);
        assert_eq!(doc.to_obj_string(), "v 0.5 -1 2.25\n");
    }
}
