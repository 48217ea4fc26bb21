#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Core traits and types for the SonoRover acoustic characterization rig.
//!
//! The acquisition pipeline in the `sonorover` crate talks to the hardware only through the
//! capability traits defined in [`device`]. Everything in this crate is free of I/O.

/// Common constants and units.
pub mod defined;
/// Capability traits of the external equipment.
pub mod device;
/// Geometry types.
pub mod geometry;
/// The propagation medium.
pub mod medium;
/// The pulse program sent to a driving system.
pub mod program;
/// Sleep strategies used for hardware settle delays.
pub mod sleep;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        defined::{mm, us, Freq, Hz, MHz, kHz},
        device::{
            DeviceError, Digitizer, DrivingSystem, Manufacturer, MotionSystem, Timebase,
        },
        geometry::{Complex, Point3, UnitVector3, Vector3},
        medium::Medium,
        program::{Power, ProgramError, PulseProgram, PulseTiming, Ramp, RampShape},
        sleep::{Sleep, SpinSleeper, StdSleeper},
    };
}
