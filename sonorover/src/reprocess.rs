use std::{fs::File, path::Path};

use sonorover_core::{device::Timebase, medium::Medium};

use crate::{
    error::{OutputError, ScanError, SequenceError},
    grid::{CoordinateRecord, GridIndex},
    output::{OutputFiles, RunParameters},
    phasor::{extract, ProcessingWindow, ReferenceSignal},
    sequence::GridSpec,
    volume::{samples_from_bytes, FieldVolume},
};

fn read_points(path: &Path) -> Result<Vec<CoordinateRecord>, OutputError> {
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?)
        .deserialize()
        .collect::<csv::Result<Vec<_>>>()?)
}

/// Rebuilds the field volume of a finished sequence from its raw waveform log.
///
/// The run parameters and the coordinate table are read from the siblings of `raw`. `window`
/// replaces the processing window of the run, if given.
#[tracing::instrument(level = "info", skip(window))]
pub fn reprocess(raw: &Path, window: Option<ProcessingWindow>) -> Result<FieldVolume, ScanError> {
    let files = OutputFiles::from_raw(raw.to_path_buf());
    let parameters = RunParameters::load(&files.parameters())?;
    let window = window.unwrap_or(parameters.processing.window);

    let sample_count = parameters.digitizer.sample_count;
    let bytes = std::fs::read(raw).map_err(OutputError::from)?;
    let waveform_bytes = sample_count * std::mem::size_of::<f32>();
    if waveform_bytes == 0 || bytes.len() % waveform_bytes != 0 {
        return Err(OutputError::TruncatedLog(
            raw.to_path_buf(),
            bytes.len() as u64,
            sample_count,
        )
        .into());
    }
    let samples = samples_from_bytes(&bytes);
    let points = read_points(&files.coordinates())?;
    let waveforms = samples.len() / sample_count;
    if waveforms != points.len() {
        tracing::warn!(
            "{} waveforms but {} coordinate rows; reprocessing the first {}",
            waveforms,
            points.len(),
            waveforms.min(points.len())
        );
    }

    let timebase = Timebase {
        index: parameters.digitizer.timebase,
        sampling_frequency: parameters.digitizer.sampling_frequency,
    };
    let shape = parameters.grid.shape;
    let sample_window = window.resolve(
        &timebase,
        sample_count,
        parameters.grid.column_step,
        shape.cols,
        &Medium {
            sound_speed: parameters.processing.sound_speed,
        },
    )?;
    let reference = ReferenceSignal::new(
        parameters.sequence.program.operating_frequency,
        &timebase,
        sample_count,
    );

    let offset = usize::from(matches!(parameters.grid.spec, GridSpec::Table { .. }));
    let mut volume = FieldVolume::new(shape);
    samples
        .chunks_exact(sample_count)
        .zip(points.iter().enumerate())
        .try_for_each(|(waveform, (i, p))| {
            let index = match (
                p.slice.checked_sub(offset),
                p.row.checked_sub(offset),
                p.col.checked_sub(offset),
            ) {
                (Some(slice), Some(row), Some(col)) => GridIndex::new(slice, row, col),
                _ => return Err(ScanError::from(SequenceError::ZeroTableIndex(i + 1))),
            };
            let (begin, end) = sample_window.for_column(index.col);
            let phasor = extract(waveform, begin, end, &reference)?;
            tracing::debug!(
                "{}: amplitude: {:.3}, phase: {:.3} deg",
                index,
                phasor.amplitude,
                phasor.phase.to_degrees()
            );
            volume.set(index, phasor)?;
            Ok(())
        })?;

    tracing::info!(
        "Reprocessed {} of {} points",
        volume.visited_count(),
        shape.len()
    );
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_abs_diff_eq;
    use sonorover_core::{
        defined::MHz,
        geometry::{Point3, Vector3},
        program::Power,
    };

    use super::*;
    use crate::{
        acquisition::TimeoutPolicy,
        grid::{GridPoint, GridShape, Traversal},
        output::{
            AcquisitionSection, DigitizerSection, EquipmentSection, FileSink, GeneralSection,
            GridSection, ProcessingSection, SequenceSection, Sink,
        },
        sequence::tests::program,
    };

    const FS: f32 = 12.5e6;
    const N: usize = 1000;

    // The burst of column `col` starts 20 µs later per column.
    fn waveform(col: usize, amplitude: f32) -> Vec<f32> {
        let start = 500 + col * 250;
        (0..N)
            .map(|n| {
                if (start..start + 250).contains(&n) {
                    amplitude * (2. * PI * 250e3 * n as f32 / FS).cos()
                } else {
                    0.
                }
            })
            .collect()
    }

    fn record(files: &OutputFiles, spec: GridSpec, window: ProcessingWindow) -> anyhow::Result<()> {
        let shape = GridShape::new(1, 1, 2);
        let parameters = RunParameters {
            general: GeneralSection::now(files.raw().parent().unwrap().to_path_buf()),
            equipment: EquipmentSection {
                manufacturer: sonorover_core::device::Manufacturer::Igt,
            },
            sequence: SequenceSection {
                number: 1,
                tag: String::new(),
                program: program(Power::Voltage(1.)),
            },
            grid: GridSection {
                coord_zero: Point3::origin(),
                column_step: Some(Vector3::x() * 30.),
                shape,
                spec,
            },
            digitizer: DigitizerSection {
                sampling_multiplier: 50.,
                sampling_frequency: 12.5 * MHz,
                timebase: 0,
                acquisition_time_us: 80.,
                sample_count: N,
            },
            processing: ProcessingSection {
                window,
                sound_speed: 1.5,
            },
            acquisition: AcquisitionSection {
                max_attempts: 6,
                timeout_policy: TimeoutPolicy::Lenient,
                degraded_points: vec![],
            },
        };
        let mut sink = FileSink::create(files.clone())?;
        sink.write_parameters(&parameters)?;
        let offset = usize::from(matches!(parameters.grid.spec, GridSpec::Table { .. }));
        (0..2).try_for_each(|col| {
            sink.append_waveform(&waveform(col, 0.5 + col as f32))?;
            sink.append_point(&CoordinateRecord::from(&GridPoint {
                measurement: col + 1,
                cluster: 1,
                indices: col + 1,
                index: GridIndex::new(0, 0, col),
                numbers: GridIndex::new(offset, offset, col + offset),
                relative: Point3::new(30. * col as f32, 0., 0.),
                absolute: Point3::new(30. * col as f32, 0., 0.),
            }))?;
            anyhow::Ok(())
        })?;
        Ok(())
    }

    fn regular() -> GridSpec {
        GridSpec::Regular {
            origin: Point3::origin(),
            vect_slice: Vector3::z(),
            vect_row: Vector3::y(),
            vect_col: Vector3::x() * 30.,
            shape: GridShape::new(1, 1, 2),
            traversal: Traversal::Direct,
        }
    }

    #[test]
    fn follows_wavefront() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let files = OutputFiles::from_raw(dir.path().join("scan.raw"));
        record(&files, regular(), ProcessingWindow::default())?;

        // whole capture
        let volume = reprocess(files.raw(), None)?;
        assert!(volume.is_complete());
        assert_abs_diff_eq!(0.125, volume.get(GridIndex::new(0, 0, 0))?.amplitude, epsilon = 1e-3);
        assert_abs_diff_eq!(0.375, volume.get(GridIndex::new(0, 0, 1))?.amplitude, epsilon = 1e-3);

        // 40-60 µs, moving 20 µs per column
        let window = ProcessingWindow {
            begin_us: 40.,
            end_us: Some(60.),
            adjust: 1,
        };
        let volume = reprocess(files.raw(), Some(window))?;
        assert_abs_diff_eq!(0.5, volume.get(GridIndex::new(0, 0, 0))?.amplitude, epsilon = 1e-3);
        assert_abs_diff_eq!(1.5, volume.get(GridIndex::new(0, 0, 1))?.amplitude, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn table_numbers() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let files = OutputFiles::from_raw(dir.path().join("scan.raw"));
        record(
            &files,
            GridSpec::Table {
                path: dir.path().join("points.csv"),
            },
            ProcessingWindow::default(),
        )?;
        let volume = reprocess(files.raw(), None)?;
        assert!(volume.is_complete());
        Ok(())
    }

    #[test]
    fn truncated() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let files = OutputFiles::from_raw(dir.path().join("scan.raw"));
        record(&files, regular(), ProcessingWindow::default())?;
        let mut bytes = std::fs::read(files.raw())?;
        bytes.truncate(bytes.len() - 2);
        std::fs::write(files.raw(), &bytes)?;

        assert!(matches!(
            reprocess(files.raw(), None),
            Err(ScanError::Output(OutputError::TruncatedLog(_, len, N))) if len == 8 * N as u64 - 2
        ));
        Ok(())
    }

    #[test]
    fn missing_parameters() {
        assert!(matches!(
            reprocess(Path::new("not_exists.raw"), None),
            Err(ScanError::Output(OutputError::Io(_)))
        ));
    }
}
