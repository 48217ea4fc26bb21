use serde::{Deserialize, Serialize};

use sonorover_core::{
    defined::{Freq, PI},
    geometry::{Point3, UnitVector3, Vector3},
    medium::Medium,
};

/// A continuous wave beam with a Gaussian cross section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualBeam {
    /// Absolute coordinate of a point on the beam axis \[㎜\].
    pub origin: Point3,
    /// Direction of propagation.
    pub direction: UnitVector3,
    /// Standard deviation of the cross section \[㎜\].
    pub width: f32,
    /// Amplitude on the axis \[V\].
    pub amplitude: f32,
}

impl Default for VirtualBeam {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            direction: Vector3::z_axis(),
            width: 2.,
            amplitude: 1.,
        }
    }
}

impl VirtualBeam {
    /// Distance of `p` along the axis from the origin \[㎜\].
    #[must_use]
    pub fn axial_distance(&self, p: &Point3) -> f32 {
        (p - self.origin).dot(&self.direction.into_inner())
    }

    /// Distance of `p` from the axis \[㎜\].
    #[must_use]
    pub fn radial_distance(&self, p: &Point3) -> f32 {
        let r = p - self.origin;
        let d = self.direction.into_inner();
        (r - d * r.dot(&d)).norm()
    }

    /// Amplitude at `p` \[V\].
    #[must_use]
    pub fn amplitude_at(&self, p: &Point3) -> f32 {
        let r = self.radial_distance(p);
        self.amplitude * (-r * r / (2. * self.width * self.width)).exp()
    }

    /// Phase at `p` relative to the origin, from the time of flight along the axis.
    #[must_use]
    pub fn phase_at(&self, p: &Point3, frequency: Freq<f32>, medium: &Medium) -> f32 {
        let wavelength = medium.wavelength(frequency);
        (-2. * PI * self.axial_distance(p) / wavelength).rem_euclid(2. * PI)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use sonorover_core::defined::kHz;

    use super::*;

    #[rstest::rstest]
    #[case(1., Point3::new(0., 0., 10.))]
    #[case((-0.5f32).exp(), Point3::new(2., 0., 30.))]
    #[case((-0.5f32).exp(), Point3::new(0., -2., -5.))]
    #[case((-2f32).exp(), Point3::new(0., 4., 0.))]
    #[test]
    fn amplitude(#[case] expect: f32, #[case] p: Point3) {
        assert_abs_diff_eq!(expect, VirtualBeam::default().amplitude_at(&p), epsilon = 1e-6);
    }

    #[test]
    fn tilted() {
        let beam = VirtualBeam {
            origin: Point3::new(5., 0., 0.),
            direction: UnitVector3::new_normalize(Vector3::new(1., 0., 1.)),
            ..Default::default()
        };
        assert_abs_diff_eq!(0., beam.radial_distance(&Point3::new(15., 0., 10.)), epsilon = 1e-5);
        assert_abs_diff_eq!(
            200f32.sqrt(),
            beam.axial_distance(&Point3::new(15., 0., 10.)),
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(
            2f32.sqrt() * 2.5,
            beam.radial_distance(&Point3::new(10., 0., 0.)),
            epsilon = 1e-5
        );
    }

    #[rstest::rstest]
    #[case(0., 0.)]
    #[case(1.5 * PI, 1.5)]
    #[case(PI, 3.)]
    #[case(0., 6.)]
    #[test]
    fn phase(#[case] expect: f32, #[case] z: f32) {
        // 6 mm wavelength at 250 kHz
        let phase =
            VirtualBeam::default().phase_at(&Point3::new(0., 0., z), 250. * kHz, &Medium::new());
        assert_abs_diff_eq!(expect, phase, epsilon = 1e-4);
    }
}
