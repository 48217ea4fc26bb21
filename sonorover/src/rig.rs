use sonorover_core::{
    defined::Freq,
    device::{Digitizer, DrivingSystem, Manufacturer, MotionSystem},
    program::PulseProgram,
    sleep::Sleep,
};

use crate::{
    acquisition::{AcquisitionOption, Capture},
    alignment::{AlignmentReport, AlignmentSearch},
    error::{ScanError, SequenceError},
    output::{
        AcquisitionSection, DigitizerSection, EquipmentSection, FileSink, GeneralSection,
        GridSection, OutputFiles, ProcessingSection, RunParameters, SequenceSection, Sink,
    },
    protocol::Protocol,
    scanner::{GridScanner, ScanOption, ScanReport},
    sequence::Sequence,
};

/// What a sequence produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    /// A grid scan.
    Scan(ScanReport),
    /// An alignment search.
    Alignment(AlignmentReport),
}

/// Result of [`Rig::run_sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    /// Sequence number.
    pub number: usize,
    /// Files written by the sequence.
    pub files: OutputFiles,
    /// What the sequence produced.
    pub outcome: SequenceOutcome,
}

/// Owner of the positioning system, the digitizer and the driving system.
///
/// The driving system is connected on [`Rig::open`] and disconnected on [`Rig::close`] or drop.
pub struct Rig<M: MotionSystem, D: Digitizer, T: DrivingSystem> {
    motion: M,
    digitizer: D,
    driving: T,
}

impl<M: MotionSystem, D: Digitizer, T: DrivingSystem> Rig<M, D, T> {
    /// Takes ownership of the devices and connects the driving system.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn open(motion: M, digitizer: D, mut driving: T) -> Result<Self, ScanError> {
        if !driving.is_connected() {
            driving.connect()?;
        }
        tracing::info!("Connected to {} driving system", driving.manufacturer());
        Ok(Self {
            motion,
            digitizer,
            driving,
        })
    }

    /// Manufacturer of the driving system.
    #[must_use]
    pub fn manufacturer(&self) -> Manufacturer {
        self.driving.manufacturer()
    }

    /// The positioning system.
    #[must_use]
    pub const fn motion(&self) -> &M {
        &self.motion
    }

    /// The positioning system.
    #[must_use]
    pub fn motion_mut(&mut self) -> &mut M {
        &mut self.motion
    }

    /// The digitizer.
    #[must_use]
    pub const fn digitizer(&self) -> &D {
        &self.digitizer
    }

    /// The driving system.
    #[must_use]
    pub const fn driving(&self) -> &T {
        &self.driving
    }

    /// Uploads `program` to the driving system.
    pub fn send_program(&mut self, program: &PulseProgram) -> Result<(), ScanError> {
        program.validate()?;
        self.driving.send_sequence(program)?;
        tracing::info!(
            "Pulse program sent: {:?}, {:?}",
            program.operating_frequency,
            program.power
        );
        Ok(())
    }

    /// Configures the digitizer to sample at `sampling_multiplier` times the operating frequency
    /// for `acquisition_time_us`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn configure_digitizer(
        &mut self,
        operating_frequency: Freq<f32>,
        sampling_multiplier: f32,
        acquisition_time_us: f32,
    ) -> Result<Capture, ScanError> {
        if !(sampling_multiplier >= 2.) {
            return Err(SequenceError::InvalidSamplingMultiplier(sampling_multiplier).into());
        }
        let requested = operating_frequency * sampling_multiplier;
        let timebase = self.digitizer.configure(requested)?;
        let sample_count = timebase.samples_in(acquisition_time_us);
        tracing::debug!(
            "timebase: {}, sampling frequency: {:?}, samples: {}",
            timebase.index,
            timebase.sampling_frequency,
            sample_count
        );
        Ok(Capture {
            operating_frequency,
            timebase,
            sample_count,
        })
    }

    /// Borrows the devices for a scan with the digitizer configured as `capture`.
    #[must_use]
    pub fn scanner<S: Sleep>(
        &mut self,
        capture: Capture,
        option: AcquisitionOption<S>,
    ) -> GridScanner<'_, M, D, T, S> {
        GridScanner {
            motion: &mut self.motion,
            digitizer: &mut self.digitizer,
            driving: &mut self.driving,
            capture,
            option,
        }
    }

    /// Runs one sequence of `protocol`: selects the output files, sends the pulse program,
    /// writes the run parameters and then scans the grid or runs the alignment search.
    #[tracing::instrument(level = "info", skip_all, fields(sequence = sequence.number()))]
    pub fn run_sequence<S: Sleep>(
        &mut self,
        protocol: &Protocol,
        sequence: &Sequence,
        option: AcquisitionOption<S>,
    ) -> Result<SequenceReport, ScanError> {
        let rig = &protocol.rig;
        sequence.validate(self.manufacturer())?;
        tracing::info!("{}", sequence);

        let files = OutputFiles::select(
            &rig.output_dir
                .join(format!("sequence_{}_output_data.raw", sequence.number())),
        )?;
        tracing::info!("Output file: {}", files.raw().display());
        let grid = sequence.grid().build(rig.coord_zero)?;

        self.send_program(sequence.program())?;
        let capture = self.configure_digitizer(
            sequence.program().operating_frequency,
            rig.sampling_multiplier,
            rig.acquisition_time_us,
        )?;

        let mut parameters = RunParameters {
            general: GeneralSection {
                protocol: protocol.path.clone(),
                perform_all: rig.perform_all,
                temperature: rig.temperature,
                dissolved_oxygen: rig.dissolved_oxygen,
                ..GeneralSection::now(rig.output_dir.clone())
            },
            equipment: EquipmentSection {
                manufacturer: self.manufacturer(),
            },
            sequence: SequenceSection {
                number: sequence.number(),
                tag: sequence.tag().clone(),
                program: sequence.program().clone(),
            },
            grid: GridSection {
                coord_zero: rig.coord_zero,
                column_step: grid.as_ref().and_then(|g| g.column_step()),
                shape: grid.as_ref().map(|g| g.shape()).unwrap_or_default(),
                spec: sequence.grid().clone(),
            },
            digitizer: DigitizerSection {
                sampling_multiplier: rig.sampling_multiplier,
                sampling_frequency: capture.timebase.sampling_frequency,
                timebase: capture.timebase.index,
                acquisition_time_us: rig.acquisition_time_us,
                sample_count: capture.sample_count,
            },
            processing: ProcessingSection {
                window: sequence.window(),
                sound_speed: rig.medium.sound_speed,
            },
            acquisition: AcquisitionSection {
                max_attempts: option.max_attempts,
                timeout_policy: option.timeout_policy,
                degraded_points: Vec::new(),
            },
        };
        let mut sink = FileSink::create(files.clone())?;
        sink.write_parameters(&parameters)?;

        let mut scanner = self.scanner(capture, option);
        let outcome = match (&grid, sequence.alignment()) {
            (Some(grid), _) => {
                let report = scanner.scan(
                    grid,
                    &ScanOption {
                        window: sequence.window(),
                        medium: rig.medium,
                    },
                    &mut sink,
                )?;
                let degraded = report.degraded_points();
                if !degraded.is_empty() {
                    tracing::warn!(
                        "{} degraded points in sequence {}: {:?}",
                        degraded.len(),
                        sequence.number(),
                        degraded
                    );
                    parameters.acquisition.degraded_points = degraded;
                    sink.write_parameters(&parameters)?;
                }
                SequenceOutcome::Scan(report)
            }
            (None, Some(params)) => SequenceOutcome::Alignment(
                AlignmentSearch::new(params, sequence.program().focus, rig.coord_zero)
                    .with_output(&files)
                    .run(&mut scanner)?,
            ),
            (None, None) => {
                return Err(SequenceError::InvalidAlignment(
                    "alignment sequence without alignment parameters".to_string(),
                )
                .into())
            }
        };

        tracing::info!("Sequence {} finished", sequence.number());
        Ok(SequenceReport {
            number: sequence.number(),
            files,
            outcome,
        })
    }

    /// Runs every sequence of `protocol` in order.
    ///
    /// Unless `perform_all` is set, `confirm` is asked before each sequence; declining cancels
    /// the remaining protocol with [`ScanError::CancelledByUser`].
    pub fn run_protocol<S: Sleep + Clone>(
        &mut self,
        protocol: &Protocol,
        option: AcquisitionOption<S>,
        mut confirm: impl FnMut(&Sequence) -> bool,
    ) -> Result<Vec<SequenceReport>, ScanError> {
        protocol
            .sequences
            .iter()
            .map(|sequence| {
                if !protocol.rig.perform_all && !confirm(sequence) {
                    tracing::info!("Sequence {} declined", sequence.number());
                    return Err(ScanError::CancelledByUser);
                }
                self.run_sequence(protocol, sequence, option.clone())
            })
            .collect()
    }

    /// Disconnects the driving system.
    pub fn close(&mut self) -> Result<(), ScanError> {
        if !self.driving.is_connected() {
            return Ok(());
        }
        self.driving.disconnect()?;
        tracing::info!("Driving system disconnected");
        Ok(())
    }
}

impl<M: MotionSystem, D: Digitizer, T: DrivingSystem> Drop for Rig<M, D, T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close the rig: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use sonorover_core::{
        defined::{kHz, MHz},
        device::{DeviceError, Timebase},
        geometry::Point3,
    };

    use super::*;
    use crate::acquisition::tests::{MockDigitizer, MockDriving};

    #[derive(Debug, Default)]
    struct Fixed;

    impl MotionSystem for Fixed {
        fn move_to(&mut self, _: Point3) -> Result<(), DeviceError> {
            Ok(())
        }

        fn position(&mut self) -> Result<Point3, DeviceError> {
            Ok(Point3::origin())
        }
    }

    #[test]
    fn open_close() -> anyhow::Result<()> {
        let mut rig = Rig::open(Fixed, MockDigitizer::default(), MockDriving::default())?;
        assert!(rig.driving().is_connected());
        rig.close()?;
        assert!(!rig.driving().is_connected());
        rig.close()?;
        Ok(())
    }

    #[test]
    fn configure_digitizer() -> anyhow::Result<()> {
        let mut rig = Rig::open(Fixed, MockDigitizer::default(), MockDriving::default())?;
        let capture = rig.configure_digitizer(250. * kHz, 50., 250.)?;
        assert_eq!(
            Timebase {
                index: 0,
                sampling_frequency: 12.5 * MHz,
            },
            capture.timebase
        );
        assert_eq!(3125, capture.sample_count);
        assert_eq!(250. * kHz, capture.operating_frequency);
        Ok(())
    }

    #[rstest::rstest]
    #[case(1.5)]
    #[case(0.)]
    #[case(f32::NAN)]
    #[test]
    fn invalid_sampling_multiplier(#[case] m: f32) -> anyhow::Result<()> {
        let mut rig = Rig::open(Fixed, MockDigitizer::default(), MockDriving::default())?;
        assert!(matches!(
            rig.configure_digitizer(250. * kHz, m, 250.),
            Err(ScanError::Sequence(SequenceError::InvalidSamplingMultiplier(_)))
        ));
        Ok(())
    }
}
