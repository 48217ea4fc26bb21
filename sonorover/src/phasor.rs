use serde::{Deserialize, Serialize};

use sonorover_core::{
    defined::{Freq, PI},
    device::Timebase,
    geometry::{Complex, Vector3},
    medium::Medium,
};

use crate::error::{PhasorError, SequenceError};

/// Samples of `exp(i·2π·f·t)` at the sampling instants of a capture.
///
/// Depends only on the operating frequency and the timebase, so one instance serves every point of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSignal {
    samples: Vec<Complex>,
}

impl ReferenceSignal {
    /// Creates `len` samples at the sampling period of `timebase`.
    #[must_use]
    pub fn new(frequency: Freq<f32>, timebase: &Timebase, len: usize) -> Self {
        let omega_dt = 2.0 * std::f64::consts::PI * frequency.hz() as f64
            / timebase.sampling_frequency.hz() as f64;
        Self {
            samples: (0..len)
                .map(|n| {
                    let theta = (omega_dt * n as f64).rem_euclid(2.0 * std::f64::consts::PI);
                    Complex::cis(theta as f32)
                })
                .collect(),
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Checks if the reference is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples.
    #[must_use]
    pub fn samples(&self) -> &[Complex] {
        &self.samples
    }
}

/// Amplitude and phase of the single-frequency component of a waveform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Phasor {
    /// Amplitude \[V\]. Never negative.
    pub amplitude: f32,
    /// Phase \[rad\] in (−π, π].
    pub phase: f32,
}

impl Phasor {
    /// Creates a phasor from a complex value.
    #[must_use]
    pub fn from_complex(c: Complex) -> Self {
        Self {
            amplitude: c.norm(),
            phase: normalize_phase(c.arg()),
        }
    }

    /// The phasor as a complex value.
    #[must_use]
    pub fn to_complex(&self) -> Complex {
        Complex::from_polar(self.amplitude, self.phase)
    }
}

fn normalize_phase(phase: f32) -> f32 {
    let p = (phase + PI).rem_euclid(2.0 * PI) - PI;
    if p <= -PI {
        PI
    } else {
        p
    }
}

/// Lock-in extraction of the phasor of `waveform[begin..end]` against `reference`.
///
/// `amplitude = 2·|Σ w[n]·r[n]| / (end − begin)`, `phase = arg(Σ w[n]·r[n])`.
pub fn extract(
    waveform: &[f32],
    begin: usize,
    end: usize,
    reference: &ReferenceSignal,
) -> Result<Phasor, PhasorError> {
    if end <= begin {
        return Err(PhasorError::EmptyWindow(begin, end));
    }
    if end > waveform.len() {
        return Err(PhasorError::OutOfWaveform(begin, end, waveform.len()));
    }
    if end > reference.len() {
        return Err(PhasorError::ReferenceTooShort(reference.len(), end));
    }

    let (re, im) = waveform[begin..end]
        .iter()
        .zip(reference.samples()[begin..end].iter())
        .fold((0f64, 0f64), |(re, im), (&w, r)| {
            (re + (w * r.re) as f64, im + (w * r.im) as f64)
        });
    let sum = Complex::new(re as f32, im as f32);
    let n = (end - begin) as f32;
    Ok(Phasor {
        amplitude: 2.0 * sum.norm() / n,
        phase: normalize_phase(sum.arg()),
    })
}

/// Processing window in time, relative to the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingWindow {
    /// Start of the window \[㎲\].
    pub begin_us: f32,
    /// End of the window \[㎲\]. `None` uses the whole capture.
    pub end_us: Option<f32>,
    /// Time of flight correction per column.
    ///
    /// * `+1` if the first column is close to the transducer (the window moves later)
    /// * `-1` if the first column is far from the transducer (the window moves earlier)
    /// * `0` for no correction
    pub adjust: i8,
}

impl Default for ProcessingWindow {
    fn default() -> Self {
        Self {
            begin_us: 0.,
            end_us: None,
            adjust: 0,
        }
    }
}

impl ProcessingWindow {
    /// Converts the window to samples.
    ///
    /// The shifted window of both the first and the last column is checked against the
    /// capture, so a misconfigured window fails before the first point is acquired.
    pub fn resolve(
        &self,
        timebase: &Timebase,
        sample_count: usize,
        column_step: Option<Vector3>,
        cols: usize,
        medium: &Medium,
    ) -> Result<SampleWindow, SequenceError> {
        if !matches!(self.adjust, -1..=1) {
            return Err(SequenceError::InvalidAdjust(self.adjust));
        }
        if self.begin_us < 0.0 || self.end_us.is_some_and(|e| e <= self.begin_us) {
            return Err(SequenceError::InvalidWindow(
                self.begin_us,
                self.end_us.unwrap_or(f32::NAN),
            ));
        }

        let begin = timebase.samples_in(self.begin_us);
        let end = self
            .end_us
            .map_or(sample_count, |e| timebase.samples_in(e));
        if end <= begin {
            return Err(SequenceError::InvalidWindow(
                self.begin_us,
                self.end_us.unwrap_or(f32::NAN),
            ));
        }

        let pixel_time_us = column_step.map_or(0.0, |v| medium.propagation_time(v.norm()));
        let window = SampleWindow {
            begin_us: self.begin_us,
            begin,
            len: end - begin,
            adjust: self.adjust,
            pixel_time_us,
            sampling_frequency: timebase.sampling_frequency.hz(),
        };
        tracing::debug!(
            "begin_us: {}, end_us: {:?}, begin: {}, end: {}, pixel_time_us: {}",
            self.begin_us,
            self.end_us,
            begin,
            end,
            pixel_time_us
        );

        [0, cols.saturating_sub(1)].into_iter().try_for_each(|k| {
            let shifted = window.shifted_begin_us(k);
            let (b, e) = window.for_column(k);
            if shifted < 0.0 || e > sample_count {
                Err(SequenceError::WindowOutOfAcquisition(b, e, sample_count))
            } else {
                Ok(())
            }
        })?;

        Ok(window)
    }
}

/// A processing window in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    begin_us: f32,
    begin: usize,
    len: usize,
    adjust: i8,
    pixel_time_us: f32,
    sampling_frequency: f32,
}

impl SampleWindow {
    /// Window `[0, len)` without time of flight correction.
    #[must_use]
    pub const fn whole(len: usize) -> Self {
        Self {
            begin_us: 0.,
            begin: 0,
            len,
            adjust: 0,
            pixel_time_us: 0.,
            sampling_frequency: 0.,
        }
    }

    /// Number of samples in the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the window has no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Time for the wave to travel one column step \[㎲\].
    #[must_use]
    pub const fn pixel_time_us(&self) -> f32 {
        self.pixel_time_us
    }

    fn shifted_begin_us(&self, col: usize) -> f32 {
        self.begin_us + self.adjust as f32 * col as f32 * self.pixel_time_us
    }

    /// `[begin, end)` for column `col`. The width never changes.
    #[must_use]
    pub fn for_column(&self, col: usize) -> (usize, usize) {
        if self.adjust == 0 {
            return (self.begin, self.begin + self.len);
        }
        let begin = (self.shifted_begin_us(col) as f64 * self.sampling_frequency as f64 / 1e6).max(0.0)
            as usize;
        (begin, begin + self.len)
    }
}
