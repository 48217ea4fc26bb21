use std::path::PathBuf;

use sonorover_core::{
    device::{DeviceError, Manufacturer},
    program::{Power, ProgramError},
};
use thiserror::Error;

use crate::grid::{GridIndex, GridShape};

/// An error in a sequence or protocol definition.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum SequenceError {
    /// Direction is not one of `+x`, `-x`, `+y`, `-y`, `+z`, `-z`.
    #[error("Invalid direction '{0}': expected one of +x, -x, +y, -y, +z, -z")]
    InvalidDirection(String),
    /// Two directions share an axis.
    #[error("Directions ({0}, {1}, {2}) do not span three different axes")]
    DuplicateAxis(String, String, String),
    /// Unknown column traversal.
    #[error("Invalid traversal '{0}': expected Dir or Alt")]
    InvalidTraversal(String),
    /// Invalid pulse program.
    #[error("{0}")]
    Program(#[from] ProgramError),
    /// Power setting not supported by the driving system.
    #[error("{0} driving systems do not support power setting {1:?}")]
    UnsupportedPower(Manufacturer, Power),
    /// Empty or negative processing window.
    #[error("Processing window [{0}, {1}) us is empty")]
    InvalidWindow(f32, f32),
    /// Processing window outside the acquisition.
    #[error("Processing window [{0}, {1}) exceeds the acquisition of {2} samples")]
    WindowOutOfAcquisition(usize, usize, usize),
    /// Window adjust factor other than -1, 0 or 1.
    #[error("Window adjust factor must be -1, 0 or 1, but {0} is given")]
    InvalidAdjust(i8),
    /// Invalid alignment parameters.
    #[error("Invalid alignment parameter: {0}")]
    InvalidAlignment(String),
    /// Coordinate table without points.
    #[error("Coordinate table '{0}' contains no points")]
    EmptyTable(String),
    /// Zero row, column or slice number in a coordinate table.
    #[error("Coordinate table row {0} has a zero row, column or slice number")]
    ZeroTableIndex(usize),
    /// Slice, row and column numbers repeated in a coordinate table.
    #[error("Row {0} of the coordinate table repeats the slice, row and column numbers of an earlier row")]
    DuplicateTableIndex(usize),
    /// Sampling frequency multiplier below 2.
    #[error("Sampling frequency multiplier must be at least 2, but {0} is given")]
    InvalidSamplingMultiplier(f32),
}

/// An error in phasor extraction.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum PhasorError {
    /// Window without samples.
    #[error("Processing window [{0}, {1}) contains no samples")]
    EmptyWindow(usize, usize),
    /// Window beyond the end of the waveform.
    #[error("Processing window [{0}, {1}) exceeds the waveform of {2} samples")]
    OutOfWaveform(usize, usize, usize),
    /// Reference signal shorter than the window.
    #[error("Reference signal has {0} samples, but {1} are required")]
    ReferenceTooShort(usize, usize),
}

/// An error in accessing a [`FieldVolume`].
///
/// [`FieldVolume`]: crate::volume::FieldVolume
#[derive(Error, Debug, PartialEq, Clone)]
pub enum VolumeError {
    /// Index outside the volume.
    #[error("Index {0} is out of the volume of shape {1}")]
    OutOfBounds(GridIndex, GridShape),
    /// Point written twice.
    #[error("Point {0} has already been written")]
    Revisited(GridIndex),
    /// Wrong number of values for the shape.
    #[error("Volume of shape {0} requires {1} values, but {2} are given")]
    SizeMismatch(GridShape, usize, usize),
}

/// An error in reading or writing output files.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OutputError {
    /// Output directory does not exist.
    #[error("Directory does not exist: {0}")]
    NoDirectory(PathBuf),
    /// Every suffix up to `_99` is taken.
    #[error("No free file name for {0}")]
    NoFreeName(PathBuf),
    /// Raw log size is not a multiple of the waveform size.
    #[error("Raw log {0} holds {1} bytes, which is not a whole number of {2}-sample waveforms")]
    TruncatedLog(PathBuf, u64, usize),
    /// I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// CSV error.
    #[error("{0}")]
    Csv(#[from] csv::Error),
    /// TOML parse error.
    #[error("{0}")]
    TomlDe(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("{0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// An error in the alignment search.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum AlignmentError {
    /// Every sample of a line scan is zero.
    #[error("No signal detected along the {0} line at z = {1} mm")]
    NoSignal(char, f32),
    /// Plane center did not converge within the iteration ceiling.
    #[error("Plane {0} did not converge within {1} iterations")]
    NotConverged(usize, usize),
    /// Fewer than two plane centers.
    #[error("An acoustic axis requires two plane centers, but {0} were found")]
    InsufficientPlanes(usize),
    /// Plane centers at the same depth.
    #[error("Plane centers share the axial coordinate z = {0} mm")]
    DegenerateAxis(f32),
}

/// The error type of the pipeline.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Device error.
    #[error("{0}")]
    Device(#[from] DeviceError),
    /// Sequence error.
    #[error("{0}")]
    Sequence(#[from] SequenceError),
    /// Phasor extraction error.
    #[error("{0}")]
    Phasor(#[from] PhasorError),
    /// Field volume error.
    #[error("{0}")]
    Volume(#[from] VolumeError),
    /// Output file error.
    #[error("{0}")]
    Output(#[from] OutputError),
    /// Alignment search error.
    #[error("{0}")]
    Alignment(#[from] AlignmentError),
    /// Every acquisition attempt timed out under [`TimeoutPolicy::Strict`](crate::acquisition::TimeoutPolicy::Strict).
    #[error("Acquisition at point {0} timed out {1} times")]
    AcquisitionTimedOut(GridIndex, usize),
    /// A sequence was declined.
    #[error("Pipeline is cancelled by the user")]
    CancelledByUser,
}

impl From<ProgramError> for ScanError {
    fn from(e: ProgramError) -> Self {
        ScanError::Sequence(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "Invalid direction 'x': expected one of +x, -x, +y, -y, +z, -z",
            SequenceError::InvalidDirection("x".to_string()).to_string()
        );
        assert_eq!(
            "Index (1, 0, 3) is out of the volume of shape (1, 1, 3)",
            VolumeError::OutOfBounds(
                GridIndex::new(1, 0, 3),
                GridShape::new(1, 1, 3)
            )
            .to_string()
        );
        assert_eq!(
            "Acquisition at point (0, 2, 1) timed out 6 times",
            ScanError::AcquisitionTimedOut(GridIndex::new(0, 2, 1), 6).to_string()
        );
    }

    #[test]
    fn from_program_error() {
        let e: ScanError = ProgramError::RampTooLong(1., 1.).into();
        assert!(matches!(
            e,
            ScanError::Sequence(SequenceError::Program(ProgramError::RampTooLong(_, _)))
        ));
    }
}
