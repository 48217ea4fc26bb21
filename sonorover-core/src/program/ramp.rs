use serde::{Deserialize, Serialize};

/// Shape of the amplitude ramp at the start and end of each pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampShape {
    /// No ramp.
    #[default]
    Rectangular,
    /// Linear ramp.
    Linear,
    /// Tukey (cosine tapered) ramp.
    Tukey,
}

/// Pulse ramp.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ramp {
    /// Ramp shape.
    pub shape: RampShape,
    /// Duration of the ramp up (equal to the ramp down) \[㎲\].
    pub duration: f32,
}

impl Ramp {
    /// Amplitude factors of the ramp up, one per `step` \[㎲\].
    ///
    /// The ramp down is the same sequence reversed. A rectangular ramp has no samples.
    #[must_use]
    pub fn envelope(&self, step: f32) -> Vec<f32> {
        if step <= 0.0 {
            return Vec::new();
        }
        let n = (self.duration / step).floor() as usize;
        match self.shape {
            RampShape::Rectangular => Vec::new(),
            RampShape::Linear => linspace(0.0, 1.0, n).collect(),
            RampShape::Tukey => {
                const ALPHA: f32 = 1.0;
                linspace(0.0, ALPHA / 2.0, n)
                    .map(|x| {
                        0.5 * (1.0 + ((2.0 * std::f32::consts::PI / ALPHA) * (x - ALPHA / 2.0)).cos())
                    })
                    .collect()
            }
        }
    }

    /// Amplitude factor at time `t` \[㎲\] after the pulse start for a pulse of length `pulse_duration`.
    #[must_use]
    pub fn gain_at(&self, t: f32, pulse_duration: f32) -> f32 {
        if t < 0.0 || t > pulse_duration {
            return 0.0;
        }
        if self.shape == RampShape::Rectangular || self.duration <= 0.0 {
            return 1.0;
        }
        let edge = t.min(pulse_duration - t);
        if edge >= self.duration {
            return 1.0;
        }
        let x = edge / self.duration;
        match self.shape {
            RampShape::Linear => x,
            _ => 0.5 * (1.0 - (std::f32::consts::PI * x).cos()),
        }
    }
}

fn linspace(start: f32, stop: f32, n: usize) -> impl Iterator<Item = f32> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as f32
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(vec![], RampShape::Rectangular, 4.)]
    #[case(vec![0., 1. / 3., 2. / 3., 1.], RampShape::Linear, 4.)]
    #[case(vec![0., 0.5, 1.], RampShape::Tukey, 3.)]
    #[case(vec![0.], RampShape::Linear, 1.5)]
    #[test]
    fn envelope(#[case] expect: Vec<f32>, #[case] shape: RampShape, #[case] duration: f32) {
        let env = Ramp { shape, duration }.envelope(1.);
        assert_eq!(expect.len(), env.len());
        expect.iter().zip(env.iter()).for_each(|(e, a)| {
            approx::assert_abs_diff_eq!(e, a, epsilon = 1e-6);
        });
    }

    #[test]
    fn envelope_zero_step() {
        let ramp = Ramp {
            shape: RampShape::Linear,
            duration: 10.,
        };
        assert!(ramp.envelope(0.).is_empty());
    }

    #[rstest::rstest]
    #[case(0.0, RampShape::Linear, -1.)]
    #[case(0.5, RampShape::Linear, 5.)]
    #[case(1.0, RampShape::Linear, 50.)]
    #[case(0.5, RampShape::Linear, 95.)]
    #[case(0.5, RampShape::Tukey, 5.)]
    #[case(1.0, RampShape::Rectangular, 5.)]
    #[case(0.0, RampShape::Rectangular, 101.)]
    #[test]
    fn gain_at(#[case] expect: f32, #[case] shape: RampShape, #[case] t: f32) {
        let ramp = Ramp {
            shape,
            duration: 10.,
        };
        approx::assert_abs_diff_eq!(expect, ramp.gain_at(t, 100.), epsilon = 1e-6);
    }
}
