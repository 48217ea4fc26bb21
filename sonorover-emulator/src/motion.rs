use sonorover_core::{
    device::{DeviceError, MotionSystem},
    geometry::Point3,
};

use crate::Shared;

/// Emulated 3-axis positioning system. Moves complete instantly.
#[derive(Debug, Clone)]
pub struct EmulatedMotion {
    pub(crate) state: Shared,
}

impl MotionSystem for EmulatedMotion {
    fn move_to(&mut self, target: Point3) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.check()?;
        if let Some([min, max]) = state.option.travel_range {
            if (0..3).any(|i| target[i] < min[i] || max[i] < target[i]) {
                return Err(DeviceError::OutOfRange(target));
            }
        }
        tracing::trace!("move: {:?} -> {:?}", state.position, target);
        state.position = target;
        state.moves += 1;
        Ok(())
    }

    fn position(&mut self) -> Result<Point3, DeviceError> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emulator;

    #[rstest::rstest]
    #[case(true, Point3::new(10., 10., 10.))]
    #[case(true, Point3::new(100., 0., 50.))]
    #[case(false, Point3::new(100.5, 0., 50.))]
    #[case(false, Point3::new(0., -1., 0.))]
    #[test]
    fn travel_range(#[case] expect: bool, #[case] target: Point3) -> anyhow::Result<()> {
        let emulator = Emulator::default();
        emulator.set_travel_range(Some([Point3::origin(), Point3::new(100., 100., 50.)]));
        let mut motion = emulator.motion();

        let r = motion.move_to(target);
        assert_eq!(expect, r.is_ok());
        if expect {
            assert_eq!(target, motion.position()?);
        } else {
            assert_eq!(Err(DeviceError::OutOfRange(target)), r);
            assert_eq!(Point3::origin(), motion.position()?);
            assert_eq!(0, emulator.moves());
        }
        Ok(())
    }
}
