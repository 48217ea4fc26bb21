use crate::geometry::Point3;

use super::DeviceError;

/// A trait that provides the interface with the 3-axis positioning system.
pub trait MotionSystem: Send {
    /// Moves to the absolute coordinate `target` \[㎜\] and blocks until arrived.
    ///
    /// A destination outside the travel range is rejected with [`DeviceError::OutOfRange`]
    /// without moving.
    fn move_to(&mut self, target: Point3) -> Result<(), DeviceError>;

    /// Reads the current absolute position \[㎜\].
    fn position(&mut self) -> Result<Point3, DeviceError>;
}

impl MotionSystem for Box<dyn MotionSystem> {
    fn move_to(&mut self, target: Point3) -> Result<(), DeviceError> {
        self.as_mut().move_to(target)
    }

    fn position(&mut self) -> Result<Point3, DeviceError> {
        self.as_mut().position()
    }
}
