#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Acquisition and reduction pipeline of the SonoRover acoustic characterization rig.
//!
//! A [`Rig`] owns the positioning system, the digitizer and the driving system. For every grid
//! point, the [`GridScanner`](scanner::GridScanner) moves the hydrophone, fires the pulse
//! program, acquires the waveform and reduces it to a [`Phasor`](phasor::Phasor) stored in a
//! [`FieldVolume`](volume::FieldVolume).

/// Per-point arm, trigger, wait and read choreography.
pub mod acquisition;
/// Beam center search and acoustic axis fitting.
pub mod alignment;
/// Error types.
pub mod error;
/// Grid indexing and coordinate tables.
pub mod grid;
/// Output files and persistence.
pub mod output;
/// Phasor extraction.
pub mod phasor;
/// Commonly used items.
pub mod prelude;
/// Measurement protocols.
pub mod protocol;
/// Offline re-reduction of raw waveform logs.
pub mod reprocess;
/// Ownership of the devices.
pub mod rig;
/// Grid scans.
pub mod scanner;
/// Measurement sequences.
pub mod sequence;
/// The complex field volume.
pub mod volume;

pub use sonorover_core;

pub use rig::Rig;
