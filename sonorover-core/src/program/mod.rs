mod ramp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defined::Freq;

pub use ramp::{Ramp, RampShape};

/// An error produced by an inconsistent [`PulseProgram`].
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProgramError {
    /// A timing parameter is not strictly positive.
    #[error("{0} ({1} us) must be positive")]
    NonPositive(&'static str, f32),
    /// Pulse duration exceeds the repetition interval.
    #[error("Pulse duration ({0} us) exceeds the pulse repetition interval ({1} us)")]
    PulseLongerThanInterval(f32, f32),
    /// Repetition interval exceeds the pulse train duration.
    #[error("Pulse repetition interval ({0} us) exceeds the pulse train duration ({1} us)")]
    IntervalLongerThanTrain(f32, f32),
    /// Ramp up and ramp down do not fit in one pulse.
    #[error("Ramp duration ({0} us) exceeds half of the pulse duration ({1} us)")]
    RampTooLong(f32, f32),
    /// Power value is negative or not finite.
    #[error("Invalid power setting: {0:?}")]
    InvalidPower(Power),
}

/// Timing of a pulse train. All durations are in \[㎲\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseTiming {
    /// Duration of one pulse.
    pub pulse_duration: f32,
    /// Time between the starts of two consecutive pulses.
    pub repetition_interval: f32,
    /// Duration of the whole train.
    pub train_duration: f32,
}

impl PulseTiming {
    /// Number of pulses in one train.
    #[must_use]
    pub fn pulse_count(&self) -> usize {
        (self.train_duration / self.repetition_interval).floor() as usize
    }

    /// Duty cycle of the train.
    #[must_use]
    pub fn duty_cycle(&self) -> f32 {
        self.pulse_duration / self.repetition_interval
    }
}

/// Output power setting. Which variant a driving system accepts depends on its manufacturer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum Power {
    /// Global power \[W\].
    GlobalPower(f32),
    /// Amplitude \[%\].
    Amplitude(f32),
    /// Maximum pressure in free water \[㎫\].
    Pressure(f32),
    /// Voltage \[V\].
    Voltage(f32),
}

impl Power {
    /// The raw number regardless of the unit.
    #[must_use]
    pub const fn value(&self) -> f32 {
        match *self {
            Power::GlobalPower(v) | Power::Amplitude(v) | Power::Pressure(v) | Power::Voltage(v) => v,
        }
    }
}

/// Everything a driving system needs to emit one pulse train.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseProgram {
    /// Operating frequency.
    pub operating_frequency: Freq<f32>,
    /// Pulse timing.
    pub timing: PulseTiming,
    /// Amplitude modulation at the start and the end of each pulse.
    pub ramp: Ramp,
    /// Output power.
    pub power: Power,
    /// Focal depth \[㎜\].
    pub focus: f32,
}

impl PulseProgram {
    /// Checks that the timing and power parameters are consistent.
    pub fn validate(&self) -> Result<(), ProgramError> {
        let t = &self.timing;
        [
            ("Pulse duration", t.pulse_duration),
            ("Pulse repetition interval", t.repetition_interval),
            ("Pulse train duration", t.train_duration),
        ]
        .into_iter()
        .try_for_each(|(name, v)| {
            if v > 0.0 {
                Ok(())
            } else {
                Err(ProgramError::NonPositive(name, v))
            }
        })?;
        if t.pulse_duration > t.repetition_interval {
            return Err(ProgramError::PulseLongerThanInterval(
                t.pulse_duration,
                t.repetition_interval,
            ));
        }
        if t.repetition_interval > t.train_duration {
            return Err(ProgramError::IntervalLongerThanTrain(
                t.repetition_interval,
                t.train_duration,
            ));
        }
        if self.ramp.shape != RampShape::Rectangular && 2.0 * self.ramp.duration > t.pulse_duration
        {
            return Err(ProgramError::RampTooLong(
                self.ramp.duration,
                t.pulse_duration,
            ));
        }
        if !self.power.value().is_finite() || self.power.value() < 0.0 {
            return Err(ProgramError::InvalidPower(self.power));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::defined::kHz;

    pub fn program() -> PulseProgram {
        PulseProgram {
            operating_frequency: 250. * kHz,
            timing: PulseTiming {
                pulse_duration: 20_000.,
                repetition_interval: 200_000.,
                train_duration: 2_000_000.,
            },
            ramp: Ramp {
                shape: RampShape::Rectangular,
                duration: 0.,
            },
            power: Power::GlobalPower(0.05),
            focus: 40.,
        }
    }

    #[test]
    fn valid() {
        assert_eq!(Ok(()), program().validate());
        assert_eq!(10, program().timing.pulse_count());
        approx::assert_abs_diff_eq!(0.1, program().timing.duty_cycle());
    }

    #[rstest::rstest]
    #[case(ProgramError::NonPositive("Pulse duration", 0.), 0., 200_000., 2_000_000.)]
    #[case(ProgramError::PulseLongerThanInterval(300_000., 200_000.), 300_000., 200_000., 2_000_000.)]
    #[case(ProgramError::IntervalLongerThanTrain(200_000., 100_000.), 20_000., 200_000., 100_000.)]
    #[test]
    fn invalid_timing(
        #[case] expect: ProgramError,
        #[case] pulse_duration: f32,
        #[case] repetition_interval: f32,
        #[case] train_duration: f32,
    ) {
        let mut p = program();
        p.timing = PulseTiming {
            pulse_duration,
            repetition_interval,
            train_duration,
        };
        assert_eq!(Err(expect), p.validate());
    }

    #[test]
    fn ramp_too_long() {
        let mut p = program();
        p.ramp = Ramp {
            shape: RampShape::Tukey,
            duration: 15_000.,
        };
        assert_eq!(Err(ProgramError::RampTooLong(15_000., 20_000.)), p.validate());
    }

    #[test]
    fn negative_power() {
        let mut p = program();
        p.power = Power::Amplitude(-1.);
        assert_eq!(
            Err(ProgramError::InvalidPower(Power::Amplitude(-1.))),
            p.validate()
        );
    }
}
