use serde::{Deserialize, Serialize};

use crate::defined::{Freq, DEFAULT_SOUND_SPEED};

/// The medium the ultrasound propagates through.
///
/// Only the sound speed matters to the pipeline: it converts grid distances into
/// time-of-flight when the processing window follows the wavefront.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Sound speed in \[㎜/㎲\].
    pub sound_speed: f32,
}

impl Medium {
    /// Creates a new medium with the default sound speed of water (1.5 ㎜/㎲).
    pub const fn new() -> Self {
        Self {
            sound_speed: DEFAULT_SOUND_SPEED,
        }
    }

    /// Creates a medium of pure water at temperature `t` \[℃\].
    ///
    /// Uses the fifth-order polynomial of Marczak (1997), valid from 0 to 95 ℃.
    #[must_use]
    pub fn water(t: f32) -> Self {
        let c = 1.402_385e3 + 5.038_813 * t - 5.799_136e-2 * t.powi(2) + 3.287_156e-4 * t.powi(3)
            - 1.398_845e-6 * t.powi(4)
            + 2.787_86e-9 * t.powi(5);
        Self {
            sound_speed: c / 1000.0,
        }
    }

    /// Time \[㎲\] the wave needs to travel `distance` \[㎜\].
    #[must_use]
    pub fn propagation_time(&self, distance: f32) -> f32 {
        distance / self.sound_speed
    }

    /// Wavelength \[㎜\] at frequency `freq`.
    #[must_use]
    pub fn wavelength(&self, freq: Freq<f32>) -> f32 {
        self.sound_speed * 1e6 / freq.hz()
    }
}

impl Default for Medium {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defined::kHz;

    #[rstest::rstest]
    #[case(1.447_289, 10.)]
    #[case(1.482_380, 20.)]
    #[case(1.523_653, 37.)]
    #[test]
    fn water(#[case] expect: f32, #[case] t: f32) {
        approx::assert_abs_diff_eq!(expect, Medium::water(t).sound_speed, epsilon = 1e-4);
    }

    #[rstest::rstest]
    #[case(2.0, 3.0)]
    #[case(0.0, 0.0)]
    #[test]
    fn propagation_time(#[case] expect: f32, #[case] distance: f32) {
        approx::assert_abs_diff_eq!(expect, Medium::new().propagation_time(distance));
    }

    #[test]
    fn wavelength() {
        approx::assert_abs_diff_eq!(6.0, Medium::new().wavelength(250. * kHz), epsilon = 1e-5);
    }
}
