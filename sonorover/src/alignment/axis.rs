use serde::{Deserialize, Serialize};

use sonorover_core::geometry::{Point3, UnitVector3};

use crate::{
    error::AlignmentError,
    grid::{CoordinateRecord, GridIndex, GridPoint},
};

/// The acoustic axis of the transducer, relative to the coordinate zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcousticAxis {
    /// Where the axis crosses the plane `z = 0`.
    pub origin: Point3,
    /// Unit direction, pointing from the first towards the second plane center.
    pub direction: UnitVector3,
}

impl AcousticAxis {
    /// Fits the axis through the two plane centers.
    pub fn fit(centers: &[Point3]) -> Result<Self, AlignmentError> {
        let [p1, p2] = centers else {
            return Err(AlignmentError::InsufficientPlanes(centers.len()));
        };
        let d = *p2 - *p1;
        if d.z.abs() < f32::EPSILON {
            return Err(AlignmentError::DegenerateAxis(p1.z));
        }
        let t = -p1.z / d.z;
        Ok(Self {
            origin: p1 + d * t,
            direction: UnitVector3::new_normalize(d),
        })
    }

    /// The point at distance `t` \[㎜\] from the origin along the axis.
    #[must_use]
    pub fn point_at(&self, t: f32) -> Point3 {
        self.origin + self.direction.into_inner() * t
    }

    /// Samples the axis every `step` over `length` as a coordinate table.
    ///
    /// Slice numbers run from 1, with row and column numbers fixed to 1, so the table can be
    /// scanned again as an external coordinate table.
    #[must_use]
    pub fn table(&self, length: f32, step: f32, coord_zero: Point3) -> Vec<CoordinateRecord> {
        let n = if step > 0. {
            (length / step + 1e-3).floor() as usize + 1
        } else {
            1
        };
        (0..n)
            .map(|k| {
                let relative = self.point_at(k as f32 * step);
                CoordinateRecord::from(&GridPoint {
                    measurement: k + 1,
                    cluster: 1,
                    indices: k + 1,
                    index: GridIndex::new(k, 0, 0),
                    numbers: GridIndex::new(k + 1, 1, 1),
                    relative,
                    absolute: coord_zero + relative.coords,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use sonorover_core::geometry::Vector3;

    use super::*;

    #[test]
    fn vertical() -> anyhow::Result<()> {
        let axis = AcousticAxis::fit(&[Point3::new(5., 0., 30.), Point3::new(5., 0., 50.)])?;
        assert_abs_diff_eq!(Point3::new(5., 0., 0.), axis.origin);
        assert_abs_diff_eq!(Vector3::z(), axis.direction.into_inner());
        Ok(())
    }

    #[test]
    fn tilted() -> anyhow::Result<()> {
        let axis = AcousticAxis::fit(&[Point3::new(2., 1., 10.), Point3::new(4., 3., 20.)])?;
        assert_abs_diff_eq!(Point3::new(0., -1., 0.), axis.origin, epsilon = 1e-5);
        assert_abs_diff_eq!(
            1. / 27f32.sqrt(),
            axis.direction.into_inner().x,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            Point3::new(4., 3., 20.),
            axis.point_at(12. * 3f32.sqrt()),
            epsilon = 1e-4
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    #[test]
    fn insufficient(#[case] n: usize) {
        let centers = vec![Point3::origin(); n];
        assert_eq!(
            Err(AlignmentError::InsufficientPlanes(n)),
            AcousticAxis::fit(&centers)
        );
    }

    #[test]
    fn degenerate() {
        assert_eq!(
            Err(AlignmentError::DegenerateAxis(10.)),
            AcousticAxis::fit(&[Point3::new(0., 0., 10.), Point3::new(1., 0., 10.)])
        );
    }

    #[test]
    fn table() -> anyhow::Result<()> {
        let axis = AcousticAxis::fit(&[Point3::new(5., 0., 30.), Point3::new(5., 0., 50.)])?;
        let records = axis.table(2., 0.5, Point3::new(100., 50., 0.));
        assert_eq!(5, records.len());
        assert_eq!(
            vec![1, 2, 3, 4, 5],
            records.iter().map(|r| r.slice).collect::<Vec<_>>()
        );
        assert!(records.iter().all(|r| r.row == 1 && r.col == 1));
        assert_abs_diff_eq!(1.5, records[3].z);
        assert_abs_diff_eq!(105., records[3].abs_x);
        assert_abs_diff_eq!(50., records[3].abs_y);
        Ok(())
    }
}
