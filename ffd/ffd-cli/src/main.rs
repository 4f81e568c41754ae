//! Applies a lattice cage to a point set.
//!
//! ```text
//! ffd --cage cage.json --mesh model.obj --output deformed.obj
//! ffd --cage cage.json --mesh scan.xyz --output out.xyz --backend tensor --extrapolation clamp
//! ```
//!
//! Built with the `wgpu` feature, `--backend gpu` runs the tensor path on
//! the default wgpu device.
//!
//! The rest frame is the bounding box of the input points, optionally
//! padded by `--padding` times its extent on each side.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ffd_autodiff::{CpuBackend, TensorBackend};
use ffd_deform::{ArrayBackend, DeformOutput, DeformationBackend, Lattice, ScalarBackend};
use ffd_io::{PointContainer, load_cage_description, load_points, save_points};
use ffd_types::{ControlGrid, Extrapolation, GridShape, RestFrame};
use owo_colors::OwoColorize;

/// Lattice free-form deformation
#[derive(Parser, Debug)]
#[command(name = "ffd")]
#[command(about = "Deform a point set with a lattice cage", long_about = None)]
#[command(version)]
struct Cli {
    /// Cage description (JSON)
    #[arg(long, alias = "json")]
    cage: PathBuf,

    /// Input points (.obj, .xyz, .txt, .pts)
    #[arg(long)]
    mesh: PathBuf,

    /// Output file; format follows the extension
    #[arg(long)]
    output: PathBuf,

    /// Evaluation backend
    #[arg(long, value_enum, default_value_t = BackendChoice::Array)]
    backend: BackendChoice,

    /// Behaviour for points outside the cage
    #[arg(long, value_enum, default_value_t = ExtrapolationChoice::Polynomial)]
    extrapolation: ExtrapolationChoice,

    /// Fraction of the bounding box extent added on each side of the frame
    #[arg(long, default_value_t = 0.0)]
    padding: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    /// Batched weight matrices (ndarray)
    Array,
    /// Per-point summation
    Scalar,
    /// burn tensors on the CPU
    Tensor,
    /// burn tensors on the GPU (wgpu)
    #[cfg(feature = "wgpu")]
    Gpu,
}

impl BackendChoice {
    fn build(self) -> Box<dyn DeformationBackend> {
        match self {
            Self::Array => Box::new(ArrayBackend),
            Self::Scalar => Box::new(ScalarBackend),
            Self::Tensor => Box::new(TensorBackend::<CpuBackend>::default()),
            #[cfg(feature = "wgpu")]
            Self::Gpu => Box::new(TensorBackend::<ffd_autodiff::GpuBackend>::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExtrapolationChoice {
    /// Continue the boundary polynomial
    Polynomial,
    /// Clamp local coordinates to the cage
    Clamp,
}

impl From<ExtrapolationChoice> for Extrapolation {
    fn from(choice: ExtrapolationChoice) -> Self {
        match choice {
            ExtrapolationChoice::Polynomial => Self::Polynomial,
            ExtrapolationChoice::Clamp => Self::Clamp,
        }
    }
}

/// What a run did, for the report.
struct Summary {
    frame: RestFrame,
    shape: GridShape,
    displaced_controls: usize,
    backend: &'static str,
    output: DeformOutput,
}

fn displaced_controls(grid: &ControlGrid, frame: &RestFrame) -> Result<usize> {
    let rest = ControlGrid::rest(frame, grid.shape())?;
    let scale = frame.extent().norm();
    Ok(grid
        .points()
        .iter()
        .zip(rest.points())
        .filter(|(p, q)| (*p - *q).norm() > 1e-12 * scale)
        .count())
}

fn run(cli: &Cli) -> Result<Summary> {
    let cage = load_cage_description(&cli.cage)
        .with_context(|| format!("reading cage {}", cli.cage.display()))?;
    let mut doc = load_points(&cli.mesh)
        .with_context(|| format!("reading points {}", cli.mesh.display()))?;
    let positions = doc.positions();

    let frame = RestFrame::from_points(&positions)?.with_padding(cli.padding)?;
    let grid = cage.to_control_grid(&frame)?;
    let shape = grid.shape();
    let displaced = displaced_controls(&grid, &frame)?;

    let lattice = Lattice::new(frame, grid)?.with_extrapolation(cli.extrapolation.into());
    let backend = cli.backend.build();
    let output = lattice.deform_with_stats(backend.as_ref(), &positions)?;

    doc.replace_positions(&output.points)?;
    save_points(&doc, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    Ok(Summary {
        frame,
        shape,
        displaced_controls: displaced,
        backend: backend.name(),
        output,
    })
}

fn report(cli: &Cli, summary: &Summary) {
    println!("{}", "Lattice Deformation".bold());
    println!("{}", "===================".bold());
    println!();

    let min = summary.frame.min();
    let max = summary.frame.max();
    println!(
        "  Frame:      [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}]",
        min.x, min.y, min.z, max.x, max.y, max.z
    );
    println!(
        "  Lattice:    {} ({} of {} control points displaced)",
        summary.shape,
        summary.displaced_controls,
        summary.shape.count()
    );
    println!("  Backend:    {}", summary.backend);
    println!("  Points:     {}", summary.output.points.len());
    if summary.output.points_outside > 0 {
        println!(
            "  {} {} points outside the frame",
            "!".yellow(),
            summary.output.points_outside
        );
    }
    println!(
        "  Max moved:  {:.6}   Mean moved: {:.6}",
        summary.output.max_displacement, summary.output.mean_displacement
    );
    println!();
    println!("  {} Wrote {}", "✓".green(), cli.output.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(summary) => {
            report(&cli, &summary);
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {err:#}", "✗".red().bold());
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ffd_types::Point3;
    use tempfile::tempdir;

    const CUBE: &str = "v 0 0 0\nv 1 1 1\nv 0.5 0.5 0.5\nf 1 2 3\n";
    const CAGE: &str = r#"{"lattice_deformations": {
        "0": {"original": [0.5, 0.5, 0.5], "deformation": [0.0, 0.0, 0.5]}
    }}"#;

    fn cli_for(dir: &std::path::Path, backend: &str) -> Cli {
        std::fs::write(dir.join("cube.obj"), CUBE).unwrap();
        std::fs::write(dir.join("cage.json"), CAGE).unwrap();
        Cli::parse_from([
            "ffd",
            "--json",
            dir.join("cage.json").to_str().unwrap(),
            "--mesh",
            dir.join("cube.obj").to_str().unwrap(),
            "--output",
            dir.join("out.obj").to_str().unwrap(),
            "--backend",
            backend,
        ])
    }

    #[test]
    fn parses_defaults() {
        let cli = Cli::parse_from(["ffd", "--cage", "c.json", "--mesh", "m.obj", "--output", "o.xyz"]);
        assert_eq!(cli.backend, BackendChoice::Array);
        assert_eq!(cli.extrapolation, ExtrapolationChoice::Polynomial);
        assert_relative_eq!(cli.padding, 0.0);
    }

    #[test]
    fn every_backend_lifts_the_far_corner() {
        for backend in ["array", "scalar", "tensor"] {
            let dir = tempdir().unwrap();
            let cli = cli_for(dir.path(), backend);
            let summary = run(&cli).unwrap();
            assert_eq!(summary.backend, backend);
            assert_eq!(summary.displaced_controls, 1);

            let out = load_points(dir.path().join("out.obj")).unwrap().positions();
            let tol = if backend == "tensor" { 1e-5 } else { 1e-9 };
            assert_relative_eq!(out[1], Point3::new(1.0, 1.0, 1.5), epsilon = tol);
            assert_relative_eq!(out[2], Point3::new(0.5, 0.5, 0.5625), epsilon = tol);

            let text = std::fs::read_to_string(dir.path().join("out.obj")).unwrap();
            assert!(text.ends_with("f 1 2 3\n"));
        }
    }

    #[test]
    fn gpu_backend_follows_feature() {
        let parsed = BackendChoice::from_str("gpu", true);
        #[cfg(feature = "wgpu")]
        assert_eq!(parsed, Ok(BackendChoice::Gpu));
        #[cfg(not(feature = "wgpu"))]
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_padding_is_an_error() {
        let dir = tempdir().unwrap();
        let mut cli = cli_for(dir.path(), "array");
        cli.padding = -0.5;
        assert!(run(&cli).is_err());
    }
}
