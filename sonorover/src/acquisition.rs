use std::{fmt::Debug, time::Duration};

use serde::{Deserialize, Serialize};

use sonorover_core::{
    defined::{Freq, ARM_SETTLE_DELAY, MAX_ACQUISITION_ATTEMPTS, POINT_SETTLE_DELAY},
    device::{DeviceError, Digitizer, DrivingSystem, Timebase},
    sleep::Sleep,
};

use crate::{
    error::ScanError,
    grid::{CoordinateRecord, GridIndex, GridPoint},
    output::Sink,
    phasor::{extract, Phasor, ReferenceSignal, SampleWindow},
    volume::FieldVolume,
};

/// Handling of a point whose every acquisition attempt timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Use the last waveform anyway and flag the point as degraded.
    #[default]
    Lenient,
    /// Abort with [`ScanError::AcquisitionTimedOut`].
    Strict,
}

/// The option of the acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionOption<S: Debug> {
    /// Arm/trigger/wait cycles per point, including the first one.
    pub max_attempts: usize,
    /// Delay between arming the digitizer and executing the pulse sequence.
    pub arm_settle: Duration,
    /// Delay after each point.
    pub point_settle: Duration,
    /// Handling of exhausted retries.
    pub timeout_policy: TimeoutPolicy,
    /// The sleeper for the settle delays.
    pub sleeper: S,
}

impl<S: Default + Debug> Default for AcquisitionOption<S> {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ACQUISITION_ATTEMPTS,
            arm_settle: ARM_SETTLE_DELAY,
            point_settle: POINT_SETTLE_DELAY,
            timeout_policy: TimeoutPolicy::Lenient,
            sleeper: S::default(),
        }
    }
}

/// Digitizer settings of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capture {
    /// Operating frequency of the pulse program.
    pub operating_frequency: Freq<f32>,
    /// Timebase chosen by the digitizer.
    pub timebase: Timebase,
    /// Samples per acquisition.
    pub sample_count: usize,
}

impl Capture {
    /// Reference signal covering a whole acquisition.
    #[must_use]
    pub fn reference(&self) -> ReferenceSignal {
        ReferenceSignal::new(self.operating_frequency, &self.timebase, self.sample_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Armed,
    Triggered,
    Waiting,
    Complete,
    TimedOut,
    Read,
}

/// One acquired waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Calibrated samples \[V\].
    pub samples: Vec<f32>,
    /// Sampling period \[s\].
    pub sampling_period: f32,
}

impl Waveform {
    /// Largest absolute voltage.
    #[must_use]
    pub fn peak_voltage(&self) -> f32 {
        self.samples.iter().fold(0f32, |acc, v| acc.max(v.abs()))
    }
}

/// Outcome of [`AcquisitionSequencer::acquire`].
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    /// The waveform.
    pub waveform: Waveform,
    /// Number of arm/trigger/wait cycles performed.
    pub attempts: usize,
    /// Every attempt timed out and the waveform may be incomplete.
    pub degraded: bool,
}

/// Result of one measured point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSummary {
    /// The point.
    pub point: GridPoint,
    /// Extracted phasor.
    pub phasor: Phasor,
    /// Largest absolute voltage of the waveform.
    pub peak_voltage: f32,
    /// Number of acquisition attempts.
    pub attempts: usize,
    /// Every attempt timed out.
    pub degraded: bool,
}

/// Arms, triggers and reads one point.
pub struct AcquisitionSequencer<'a, D: Digitizer, T: DrivingSystem, S: Sleep> {
    pub(crate) digitizer: &'a mut D,
    pub(crate) driving: &'a mut T,
    pub(crate) option: &'a AcquisitionOption<S>,
    pub(crate) capture: Capture,
}

impl<D: Digitizer, T: DrivingSystem, S: Sleep> AcquisitionSequencer<'_, D, T, S> {
    fn transition(&self, state: &mut State, next: State) {
        tracing::trace!("{:?} -> {:?}", state, next);
        *state = next;
    }

    /// Acquires one waveform.
    ///
    /// A timed out capture is retried up to `max_attempts` cycles in total. What happens after
    /// the last one depends on [`TimeoutPolicy`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn acquire(&mut self, index: GridIndex) -> Result<Acquisition, ScanError> {
        let mut state = State::Idle;
        let mut attempts = 0;
        let max_attempts = self.option.max_attempts.max(1);
        while attempts < max_attempts {
            attempts += 1;
            self.digitizer
                .arm(self.capture.sample_count, self.capture.timebase)?;
            self.transition(&mut state, State::Armed);
            self.option.sleeper.sleep(self.option.arm_settle);

            self.driving.execute_sequence()?;
            self.transition(&mut state, State::Triggered);

            self.transition(&mut state, State::Waiting);
            if self.digitizer.wait_for_completion()? {
                self.transition(&mut state, State::Complete);
                break;
            }
            self.transition(&mut state, State::TimedOut);
            tracing::warn!(
                "Acquisition at {} timed out (attempt {}/{})",
                index,
                attempts,
                max_attempts
            );
        }

        let degraded = state == State::TimedOut;
        if degraded && self.option.timeout_policy == TimeoutPolicy::Strict {
            tracing::error!("Acquisition at {} failed after {} attempts", index, attempts);
            return Err(ScanError::AcquisitionTimedOut(index, attempts));
        }

        let mut samples = self.digitizer.read_calibrated_waveform()?;
        self.transition(&mut state, State::Read);
        tracing::debug!("waveform size: {}", samples.len());
        let expected = self.capture.sample_count;
        if samples.len() < expected && !degraded {
            tracing::error!(
                "Short waveform at {}: {} of {} samples",
                index,
                samples.len(),
                expected
            );
            return Err(DeviceError::new(format!(
                "short waveform: {} of {} samples",
                samples.len(),
                expected
            ))
            .into());
        }
        if degraded {
            tracing::warn!(
                "Using possibly incomplete waveform at {} ({} of {} samples) after {} timed out attempts",
                index,
                samples.len(),
                expected,
                attempts
            );
        }
        // every logged waveform has the same stride
        samples.resize(expected, 0.);

        Ok(Acquisition {
            waveform: Waveform {
                samples,
                sampling_period: self.capture.timebase.sampling_period(),
            },
            attempts,
            degraded,
        })
    }

    /// Acquires `point`, logs the waveform and the coordinates, and stores the phasor in `volume`.
    pub fn measure(
        &mut self,
        point: &GridPoint,
        window: &SampleWindow,
        reference: &ReferenceSignal,
        volume: Option<&mut FieldVolume>,
        sink: &mut impl Sink,
    ) -> Result<PointSummary, ScanError> {
        let acquisition = self.acquire(point.index)?;

        let (begin, end) = window.for_column(point.index.col);
        let phasor = extract(&acquisition.waveform.samples, begin, end, reference)?;
        tracing::debug!(
            "reduced col: {}, begin: {}, end: {}, amplitude: {:.3}, phase: {:.3} deg",
            point.index.col,
            begin,
            end,
            phasor.amplitude,
            phasor.phase.to_degrees()
        );

        if let Some(volume) = volume {
            volume.set(point.index, phasor)?;
        }
        sink.append_waveform(&acquisition.waveform.samples)?;
        sink.append_point(&CoordinateRecord::from(point))?;

        Ok(PointSummary {
            point: *point,
            phasor,
            peak_voltage: acquisition.waveform.peak_voltage(),
            attempts: acquisition.attempts,
            degraded: acquisition.degraded,
        })
    }
}
