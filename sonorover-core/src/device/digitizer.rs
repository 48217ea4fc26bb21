use crate::defined::Freq;

use super::DeviceError;

/// The sampling configuration the digitizer settled on.
///
/// Digitizers only support a discrete set of sampling rates, so the requested frequency is
/// rounded to the closest available timebase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timebase {
    /// Vendor timebase index.
    pub index: u32,
    /// Actual sampling frequency of this timebase.
    pub sampling_frequency: Freq<f32>,
}

impl Timebase {
    /// Sampling period in seconds.
    #[must_use]
    pub fn sampling_period(&self) -> f32 {
        self.sampling_frequency.period_s()
    }

    /// Number of samples covering `duration` \[㎲\].
    #[must_use]
    pub fn samples_in(&self, duration: f32) -> usize {
        (duration as f64 * self.sampling_frequency.hz() as f64 / 1e6).max(0.0) as usize
    }
}

/// A trait that provides the interface with the digitizer recording the hydrophone signal.
pub trait Digitizer: Send {
    /// Selects the timebase closest to `sampling_frequency`.
    fn configure(&mut self, sampling_frequency: Freq<f32>) -> Result<Timebase, DeviceError>;

    /// Prepares a capture of `sample_count` samples starting at the next external trigger edge.
    fn arm(&mut self, sample_count: usize, timebase: Timebase) -> Result<(), DeviceError>;

    /// Blocks until the capture completes or the vendor timeout elapses.
    ///
    /// Returns `false` on timeout.
    fn wait_for_completion(&mut self) -> Result<bool, DeviceError>;

    /// Transfers the last capture, converted to volts.
    fn read_calibrated_waveform(&mut self) -> Result<Vec<f32>, DeviceError>;
}

impl Digitizer for Box<dyn Digitizer> {
    fn configure(&mut self, sampling_frequency: Freq<f32>) -> Result<Timebase, DeviceError> {
        self.as_mut().configure(sampling_frequency)
    }

    fn arm(&mut self, sample_count: usize, timebase: Timebase) -> Result<(), DeviceError> {
        self.as_mut().arm(sample_count, timebase)
    }

    fn wait_for_completion(&mut self) -> Result<bool, DeviceError> {
        self.as_mut().wait_for_completion()
    }

    fn read_calibrated_waveform(&mut self) -> Result<Vec<f32>, DeviceError> {
        self.as_mut().read_calibrated_waveform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defined::MHz;

    #[rstest::rstest]
    #[case(1250, 250.)]
    #[case(0, 0.)]
    #[case(0, -3.)]
    #[test]
    fn samples_in(#[case] expect: usize, #[case] duration: f32) {
        let tb = Timebase {
            index: 3,
            sampling_frequency: 5. * MHz,
        };
        assert_eq!(expect, tb.samples_in(duration));
    }
}
