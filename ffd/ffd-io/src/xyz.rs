//! Plain-text point clouds, one `x y z` triple per line.

use std::fmt::Write as _;

use ffd_types::{FfdError, Point3};

use crate::{IoError, IoResult, PointContainer};

/// A point cloud read from whitespace- or comma-separated text.
///
/// Blank lines and lines starting with `#` are ignored. Values after the
/// third on a line are dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    points: Vec<Point3<f64>>,
}

impl PointCloud {
    /// Wraps existing points.
    #[must_use]
    pub const fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Parses point-cloud text.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidContent`] with the 1-based line number for a
    /// line with fewer than three numbers.
    pub fn parse(text: &str) -> IoResult<Self> {
        let mut points = Vec::new();

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut values = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .take(3)
                .map(|s| {
                    s.parse::<f64>().map_err(|_| {
                        IoError::invalid_content(n + 1, format!("not a number: {s:?}"))
                    })
                });

            let mut coords = [0.0; 3];
            for slot in &mut coords {
                *slot = values.next().ok_or_else(|| {
                    IoError::invalid_content(n + 1, "expected 3 coordinates")
                })??;
            }
            points.push(Point3::from(coords));
        }

        Ok(Self { points })
    }

    /// Borrow the points.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Renders the cloud, one space-separated triple per line.
    #[must_use]
    pub fn to_xyz_string(&self) -> String {
        let mut out = String::with_capacity(self.points.len() * 24);
        for p in &self.points {
            let _ = writeln!(out, "{} {} {}", p.x, p.y, p.z);
        }
        out
    }
}

impl PointContainer for PointCloud {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn positions(&self) -> Vec<Point3<f64>> {
        self.points.clone()
    }

    fn replace_positions(&mut self, positions: &[Point3<f64>]) -> IoResult<()> {
        if positions.len() != self.points.len() {
            return Err(FfdError::shape_mismatch(
                "replacement positions",
                format!("{} points", self.points.len()),
                format!("{} points", positions.len()),
            )
            .into());
        }
        self.points.copy_from_slice(positions);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let cloud = PointCloud::parse("# scan\n\n0 0 0\n  1.5 2 -3  \n# end\n").unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[1], Point3::new(1.5, 2.0, -3.0));
    }

    #[test]
    fn accepts_commas_and_extra_columns() {
        let cloud = PointCloud::parse("1,2,3\n4, 5, 6, 255, 0, 0\n").unwrap();
        assert_eq!(cloud.points()[1], Point3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn short_line_reports_line_number() {
        let err = PointCloud::parse("0 0 0\n1 2\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { line: 2, .. }));
    }

    #[test]
    fn bad_number_reports_line_number() {
        let err = PointCloud::parse("# header\n1 x 3\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { line: 2, .. }));
    }

    #[test]
    fn text_round_trip() {
        let cloud = PointCloud::new(vec![Point3::new(0.25, -1.0, 3.0), Point3::origin()]);
        let text = cloud.to_xyz_string();
        assert_eq!(text, "0.25 -1 3\n0 0 0\n");
        assert_eq!(PointCloud::parse(&text).unwrap(), cloud);
    }

    #[test]
    fn replace_checks_count() {
        let mut cloud = PointCloud::new(vec![Point3::origin()]);
        assert!(cloud.replace_positions(&[]).is_err());
        cloud.replace_positions(&[Point3::new(1.0, 1.0, 1.0)]).unwrap();
        assert_eq!(cloud.points()[0], Point3::new(1.0, 1.0, 1.0));
    }
}
