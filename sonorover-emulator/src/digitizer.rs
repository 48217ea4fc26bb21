use std::f64::consts::PI;

use rand::Rng;

use sonorover_core::{
    defined::{Freq, Hz},
    device::{DeviceError, Digitizer, Timebase},
};

use crate::{RigState, Shared};

// 8-bit timebases of a PicoScope 5000 series: 1 GS/s / 2^n for n < 3, 125 MS/s / (n - 2) above.
fn sampling_frequency(index: u32) -> f64 {
    if index < 3 {
        1e9 / f64::from(1u32 << index)
    } else {
        125e6 / f64::from(index - 2)
    }
}

fn closest_timebase(requested: f64) -> u32 {
    let n = (125e6 / requested).max(1.);
    [0, 1, 2, n.floor() as u32 + 2, n.ceil() as u32 + 2]
        .into_iter()
        .min_by(|&a, &b| {
            (sampling_frequency(a) - requested)
                .abs()
                .total_cmp(&(sampling_frequency(b) - requested).abs())
        })
        .unwrap_or(0)
}

/// Synthesizes the waveform at the current position.
pub(crate) fn synthesize(state: &mut RigState, sample_count: usize, timebase: Timebase) -> Vec<f32> {
    let Some(program) = &state.program else {
        return vec![0.; sample_count];
    };
    let frequency = program.operating_frequency;
    let beam = state.option.beam;
    let amplitude = beam.amplitude_at(&state.position);
    let phase = f64::from(beam.phase_at(&state.position, frequency, &state.option.medium));
    let step = 2. * PI * f64::from(frequency.hz()) / f64::from(timebase.sampling_frequency.hz());
    let noise = state.option.noise;
    (0..sample_count)
        .map(|k| {
            let v = amplitude * ((step * k as f64 + phase) % (2. * PI)).cos() as f32;
            if noise > 0. {
                v + state.rng.random_range(-noise..noise)
            } else {
                v
            }
        })
        .collect()
}

/// Emulated digitizer recording the hydrophone of the emulated rig.
#[derive(Debug, Clone)]
pub struct EmulatedDigitizer {
    pub(crate) state: Shared,
}

impl Digitizer for EmulatedDigitizer {
    fn configure(&mut self, sampling_frequency: Freq<f32>) -> Result<Timebase, DeviceError> {
        self.state.lock().check()?;
        let requested = f64::from(sampling_frequency.hz());
        if !(requested > 0.) {
            return Err(DeviceError::Unsupported(format!(
                "sampling frequency {:?}",
                sampling_frequency
            )));
        }
        let index = closest_timebase(requested);
        let timebase = Timebase {
            index,
            sampling_frequency: self::sampling_frequency(index) as f32 * Hz,
        };
        tracing::debug!(
            "requested {:?}, timebase {} ({:?})",
            sampling_frequency,
            index,
            timebase.sampling_frequency
        );
        Ok(timebase)
    }

    fn arm(&mut self, sample_count: usize, timebase: Timebase) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.check()?;
        state.armed = Some((sample_count, timebase));
        state.capture = None;
        Ok(())
    }

    fn wait_for_completion(&mut self) -> Result<bool, DeviceError> {
        let mut state = self.state.lock();
        state.check()?;
        if state.pending_timeouts > 0 {
            state.pending_timeouts -= 1;
            tracing::trace!("injected timeout, {} left", state.pending_timeouts);
            return Ok(false);
        }
        Ok(state.capture.is_some())
    }

    fn read_calibrated_waveform(&mut self) -> Result<Vec<f32>, DeviceError> {
        let state = self.state.lock();
        state.check()?;
        state.capture.clone().ok_or(DeviceError::NotArmed)
    }
}

#[cfg(test)]
mod tests {
    use sonorover_core::defined::{kHz, MHz};

    use super::*;
    use crate::Emulator;

    #[rstest::rstest]
    #[case(0, 1e9)]
    #[case(2, 250e6)]
    #[case(3, 125e6)]
    #[case(12, 12.5e6)]
    #[case(27, 5e6)]
    #[case(12, 12.3e6)]
    #[test]
    fn timebase(#[case] expect: u32, #[case] requested: f64) {
        assert_eq!(expect, closest_timebase(requested));
    }

    #[test]
    fn configure() -> anyhow::Result<()> {
        let mut digitizer = Emulator::default().digitizer();
        let tb = digitizer.configure(250. * kHz * 50.)?;
        assert_eq!(12, tb.index);
        assert_eq!(12.5 * MHz, tb.sampling_frequency);
        assert!(matches!(
            digitizer.configure(0. * Hz),
            Err(DeviceError::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn read_before_trigger() -> anyhow::Result<()> {
        let mut digitizer = Emulator::default().digitizer();
        let tb = digitizer.configure(12.5 * MHz)?;
        digitizer.arm(10, tb)?;
        assert!(!digitizer.wait_for_completion()?);
        assert_eq!(Err(DeviceError::NotArmed), digitizer.read_calibrated_waveform());
        Ok(())
    }
}
