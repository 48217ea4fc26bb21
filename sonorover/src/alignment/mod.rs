mod axis;
mod params;

use std::path::Path;

use serde::Serialize;

use sonorover_core::{
    device::{Digitizer, DrivingSystem, MotionSystem},
    geometry::{Point3, Vector3},
    sleep::Sleep,
};

use crate::{
    error::{AlignmentError, OutputError, ScanError},
    grid::{write_table, Grid, GridShape, RegularGrid, Traversal},
    output::{MemorySink, OutputFiles},
    phasor::ReferenceSignal,
    scanner::GridScanner,
    sequence::Axis,
};

pub use axis::AcousticAxis;
pub use params::AlignmentParameters;

/// Converged beam center in one plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneCenter {
    /// Beam center relative to the coordinate zero \[㎜\].
    pub center: Point3,
    /// Iterations until convergence.
    pub iterations: usize,
}

/// Result of [`AlignmentSearch::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    /// Centers of the two planes, in search order.
    pub planes: Vec<PlaneCenter>,
    /// Axis fitted through the centers.
    pub axis: AcousticAxis,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct LineSample {
    #[serde(rename = "Position [mm]")]
    position: f32,
    #[serde(rename = "Peak voltage [V]")]
    peak_voltage: f32,
}

/// Position at which the cumulative energy of the line first reaches half of its total.
fn energy_median(samples: &[LineSample]) -> Option<f32> {
    let total: f32 = samples.iter().map(|s| s.peak_voltage).sum();
    if !(total > 0.) {
        return None;
    }
    let mut acc = 0.;
    samples
        .iter()
        .find(|s| {
            acc += s.peak_voltage;
            acc >= total / 2.
        })
        .map(|s| s.position)
}

fn write_diagnostics(path: &Path, samples: &[LineSample]) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_path(path)?;
    samples.iter().try_for_each(|s| writer.serialize(s))?;
    writer.flush()?;
    Ok(())
}

/// Searches the beam center in two planes around the focus and fits the acoustic axis.
///
/// In each plane, a line along X and then along Y is scanned around the current estimate. The
/// new estimate is the energy median of the line, using the peak voltage of each waveform. The
/// line length and step shrink every `max_reduction_iterations - 1` iterations, and the search
/// stops when both estimates move less than `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentSearch<'a> {
    params: &'a AlignmentParameters,
    focus: f32,
    coord_zero: Point3,
    files: Option<&'a OutputFiles>,
}

impl<'a> AlignmentSearch<'a> {
    /// Creates a search around the focal depth `focus` \[㎜\].
    #[must_use]
    pub const fn new(params: &'a AlignmentParameters, focus: f32, coord_zero: Point3) -> Self {
        Self {
            params,
            focus,
            coord_zero,
            files: None,
        }
    }

    /// Writes the diagnostic and axis tables next to `files`.
    #[must_use]
    pub const fn with_output(self, files: &'a OutputFiles) -> Self {
        Self {
            files: Some(files),
            ..self
        }
    }

    /// Runs the search.
    #[tracing::instrument(level = "info", skip_all, fields(focus = self.focus))]
    pub fn run<M: MotionSystem, D: Digitizer, T: DrivingSystem, S: Sleep>(
        &self,
        scanner: &mut GridScanner<'_, M, D, T, S>,
    ) -> Result<AlignmentReport, ScanError> {
        self.params.validate()?;
        let reference = scanner.capture().reference();

        let d = self.params.distance_from_focus;
        let planes = [self.focus - d, self.focus + d]
            .into_iter()
            .enumerate()
            .map(|(i, z)| self.search_plane(scanner, &reference, i + 1, z))
            .collect::<Result<Vec<_>, _>>()?;

        let axis = AcousticAxis::fit(&planes.iter().map(|p| p.center).collect::<Vec<_>>())?;
        tracing::info!(
            "Acoustic axis: origin = ({:.3}, {:.3}, {:.3}), direction = ({:.4}, {:.4}, {:.4})",
            axis.origin.x,
            axis.origin.y,
            axis.origin.z,
            axis.direction.x,
            axis.direction.y,
            axis.direction.z
        );

        if let Some(files) = self.files.filter(|_| self.params.emit_axis_table) {
            let records = axis.table(
                self.params.axis_length,
                self.params.axis_step,
                self.coord_zero,
            );
            write_table(&files.axis_table(), &records)?;
        }

        Ok(AlignmentReport { planes, axis })
    }

    fn search_plane<M: MotionSystem, D: Digitizer, T: DrivingSystem, S: Sleep>(
        &self,
        scanner: &mut GridScanner<'_, M, D, T, S>,
        reference: &ReferenceSignal,
        plane: usize,
        z: f32,
    ) -> Result<PlaneCenter, ScanError> {
        tracing::info!("Searching beam center in plane {} at z = {:.3} mm", plane, z);
        let mut center = Point3::new(0., 0., z);
        let mut length = self.params.line_length;
        let mut step = self.params.step;

        for iteration in 1..=self.params.max_iterations {
            let previous = center;
            [Axis::X, Axis::Y].into_iter().try_for_each(|axis| {
                let samples = self.line(scanner, reference, axis, center, length, step)?;
                if let Some(files) = self.files.filter(|_| self.params.emit_diagnostics) {
                    write_diagnostics(
                        &files.diagnostics(plane, iteration, axis.name()),
                        &samples,
                    )?;
                }
                center[axis.index()] =
                    energy_median(&samples).ok_or(AlignmentError::NoSignal(axis.name(), z))?;
                Ok::<_, ScanError>(())
            })?;

            let (dx, dy) = (center.x - previous.x, center.y - previous.y);
            tracing::debug!(
                "plane {}, iteration {}: x = {:.3}, y = {:.3}, dx = {:.4}, dy = {:.4}, length = {:.3}, step = {:.3}",
                plane,
                iteration,
                center.x,
                center.y,
                dx,
                dy,
                length,
                step
            );
            if dx.abs() < self.params.threshold && dy.abs() < self.params.threshold {
                tracing::info!(
                    "Plane {} converged at ({:.3}, {:.3}) after {} iterations",
                    plane,
                    center.x,
                    center.y,
                    iteration
                );
                return Ok(PlaneCenter {
                    center,
                    iterations: iteration,
                });
            }

            if iteration % (self.params.max_reduction_iterations - 1) == 0 {
                length *= self.params.reduction_factor;
                step *= self.params.reduction_factor;
                tracing::debug!("Search line reduced to {:.3} mm, step {:.3} mm", length, step);
            }
        }

        tracing::error!(
            "Plane {} did not converge within {} iterations",
            plane,
            self.params.max_iterations
        );
        Err(AlignmentError::NotConverged(plane, self.params.max_iterations).into())
    }

    fn line<M: MotionSystem, D: Digitizer, T: DrivingSystem, S: Sleep>(
        &self,
        scanner: &mut GridScanner<'_, M, D, T, S>,
        reference: &ReferenceSignal,
        axis: Axis,
        center: Point3,
        length: f32,
        step: f32,
    ) -> Result<Vec<LineSample>, ScanError> {
        let n = (length / step + 1e-3).floor() as usize + 1;
        let start = center[axis.index()] - length / 2.;
        let mut origin = center;
        origin[axis.index()] = start;
        let mut vect_col = Vector3::zeros();
        vect_col[axis.index()] = step;

        let grid = Grid::Regular {
            grid: RegularGrid {
                origin: self.coord_zero + origin.coords,
                vect_slice: Vector3::z(),
                vect_row: Vector3::y(),
                vect_col,
                shape: GridShape::new(1, 1, n),
                traversal: Traversal::Direct,
            },
            coord_zero: self.coord_zero,
        };
        tracing::debug!(
            "Line scan along {} from {:.3} mm, {} points",
            axis.name(),
            start,
            n
        );

        Ok(scanner
            .line_scan(&grid, reference, &mut MemorySink::default())?
            .iter()
            .enumerate()
            .map(|(k, s)| LineSample {
                position: start + k as f32 * step,
                peak_voltage: s.peak_voltage,
            })
            .collect())
    }
}
