use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::program::PulseProgram;

use super::DeviceError;

/// Manufacturer of the ultrasound driving system.
///
/// The concrete [`DrivingSystem`] is chosen once from this value; the pipeline never branches
/// on it afterwards.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Manufacturer {
    /// Sonic Concepts (NeuroFUS) generators, driven by global power.
    #[display("Sonic Concepts")]
    SonicConcepts,
    /// Image Guided Therapy generators, driven by amplitude, voltage or pressure.
    #[display("IGT")]
    Igt,
}

/// A trait that provides the interface with the ultrasound driving system.
pub trait DrivingSystem: Send {
    /// Opens the connection.
    fn connect(&mut self) -> Result<(), DeviceError>;

    /// Uploads the pulse program.
    fn send_sequence(&mut self, program: &PulseProgram) -> Result<(), DeviceError>;

    /// Executes the uploaded program. Also fires the digitizer trigger line.
    fn execute_sequence(&mut self) -> Result<(), DeviceError>;

    /// Closes the connection.
    fn disconnect(&mut self) -> Result<(), DeviceError>;

    /// Checks if the connection is open.
    #[must_use]
    fn is_connected(&self) -> bool;

    /// Manufacturer of this system.
    #[must_use]
    fn manufacturer(&self) -> Manufacturer;
}

impl DrivingSystem for Box<dyn DrivingSystem> {
    fn connect(&mut self) -> Result<(), DeviceError> {
        self.as_mut().connect()
    }

    fn send_sequence(&mut self, program: &PulseProgram) -> Result<(), DeviceError> {
        self.as_mut().send_sequence(program)
    }

    fn execute_sequence(&mut self) -> Result<(), DeviceError> {
        self.as_mut().execute_sequence()
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.as_mut().disconnect()
    }

    fn is_connected(&self) -> bool {
        self.as_ref().is_connected()
    }

    fn manufacturer(&self) -> Manufacturer {
        self.as_ref().manufacturer()
    }
}
