use std::time::{Duration, Instant};

use sonorover_core::{
    device::{Digitizer, DrivingSystem, MotionSystem},
    medium::Medium,
    sleep::Sleep,
};

use crate::{
    acquisition::{AcquisitionOption, AcquisitionSequencer, Capture, PointSummary},
    error::ScanError,
    grid::{Grid, GridPoint},
    output::Sink,
    phasor::{ProcessingWindow, ReferenceSignal, SampleWindow},
    volume::FieldVolume,
};

/// The option of [`GridScanner::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanOption {
    /// Processing window of the phasor extraction.
    pub window: ProcessingWindow,
    /// Medium for the time of flight correction.
    pub medium: Medium,
}

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// The field volume.
    pub volume: FieldVolume,
    /// Every point in visiting order.
    pub points: Vec<PointSummary>,
}

impl ScanReport {
    /// Measurement numbers of the degraded points.
    #[must_use]
    pub fn degraded_points(&self) -> Vec<usize> {
        self.points
            .iter()
            .filter(|p| p.degraded)
            .map(|p| p.point.measurement)
            .collect()
    }
}

/// Drives the acquisition across every point of a grid.
pub struct GridScanner<'a, M: MotionSystem, D: Digitizer, T: DrivingSystem, S: Sleep> {
    pub(crate) motion: &'a mut M,
    pub(crate) digitizer: &'a mut D,
    pub(crate) driving: &'a mut T,
    pub(crate) capture: Capture,
    pub(crate) option: AcquisitionOption<S>,
}

impl<M: MotionSystem, D: Digitizer, T: DrivingSystem, S: Sleep> GridScanner<'_, M, D, T, S> {
    /// Digitizer settings in use.
    #[must_use]
    pub const fn capture(&self) -> &Capture {
        &self.capture
    }

    /// Scans every point of `grid` and writes the field volume to `sink`.
    ///
    /// Motion errors abort the scan. Everything appended to `sink` before the error stays there.
    #[tracing::instrument(level = "info", skip_all, fields(points = grid.len()))]
    pub fn scan(
        &mut self,
        grid: &Grid,
        option: &ScanOption,
        sink: &mut impl Sink,
    ) -> Result<ScanReport, ScanError> {
        let shape = grid.shape();
        let window = option.window.resolve(
            &self.capture.timebase,
            self.capture.sample_count,
            grid.column_step(),
            shape.cols,
            &option.medium,
        )?;
        let reference = self.capture.reference();

        let mut volume = FieldVolume::new(shape);
        let points = grid
            .points()
            .map(|p| self.scan_point(&p, &window, &reference, Some(&mut volume), sink))
            .collect::<Result<Vec<_>, _>>()?;

        sink.write_volume(&volume)?;
        tracing::info!(
            "Scan of {} points finished ({} of {} volume points written)",
            points.len(),
            volume.visited_count(),
            shape.len()
        );
        Ok(ScanReport { volume, points })
    }

    /// Scans the points of `grid` without building a field volume.
    pub(crate) fn line_scan(
        &mut self,
        grid: &Grid,
        reference: &ReferenceSignal,
        sink: &mut impl Sink,
    ) -> Result<Vec<PointSummary>, ScanError> {
        let window = SampleWindow::whole(self.capture.sample_count);
        grid.points()
            .map(|p| self.scan_point(&p, &window, reference, None, sink))
            .collect()
    }

    fn move_to(&mut self, point: &GridPoint) -> Result<(), ScanError> {
        let p = point.absolute;
        tracing::info!("Moving to position: {:.3}, {:.3}, {:.3}", p.x, p.y, p.z);
        self.motion.move_to(p).map_err(|e| {
            tracing::error!(
                "Failed to move to ({:.3}, {:.3}, {:.3}) for point {}: {}",
                p.x,
                p.y,
                p.z,
                point.index,
                e
            );
            e
        })?;
        Ok(())
    }

    fn scan_point(
        &mut self,
        point: &GridPoint,
        window: &SampleWindow,
        reference: &ReferenceSignal,
        volume: Option<&mut FieldVolume>,
        sink: &mut impl Sink,
    ) -> Result<PointSummary, ScanError> {
        tracing::debug!("measurement: {}, index: {}", point.measurement, point.index);
        self.move_to(point)?;

        let summary = AcquisitionSequencer {
            digitizer: &mut *self.digitizer,
            driving: &mut *self.driving,
            option: &self.option,
            capture: self.capture,
        }
        .measure(point, window, reference, volume, sink)?;

        self.option.sleeper.sleep(self.option.point_settle);
        Ok(summary)
    }

    /// Moves through every point of `grid` without acquiring, waiting `delay` at each point.
    ///
    /// Returns the elapsed time.
    #[tracing::instrument(level = "info", skip(self, grid))]
    pub fn scan_only(&mut self, grid: &Grid, delay: Duration) -> Result<Duration, ScanError> {
        let start = Instant::now();
        grid.points().try_for_each(|p| {
            self.move_to(&p)?;
            self.option.sleeper.sleep(delay);
            Ok::<_, ScanError>(())
        })?;
        let elapsed = start.elapsed();
        tracing::info!("Scan of {} points took {:?}", grid.len(), elapsed);
        Ok(elapsed)
    }

    /// Executes the pulse sequence `repetitions` times, `delay` apart, without moving or acquiring.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn pulse_only(&mut self, repetitions: usize, delay: Duration) -> Result<(), ScanError> {
        (0..repetitions).try_for_each(|i| {
            tracing::info!("Executing pulse sequence {}/{}", i + 1, repetitions);
            self.driving.execute_sequence()?;
            if i + 1 < repetitions {
                self.option.sleeper.sleep(delay);
            }
            Ok(())
        })
    }
}
