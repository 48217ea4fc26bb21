use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};

use sonorover_core::{
    defined::Freq,
    device::Manufacturer,
    geometry::{Point3, Vector3},
    program::PulseProgram,
};

use crate::{
    acquisition::TimeoutPolicy, error::OutputError, grid::GridShape, phasor::ProcessingWindow,
    sequence::GridSpec,
};

/// Provenance of one sequence, written next to its raw log.
///
/// Read back by [`reprocess`](crate::reprocess::reprocess).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// `[general]`
    pub general: GeneralSection,
    /// `[equipment]`
    pub equipment: EquipmentSection,
    /// `[sequence]`
    pub sequence: SequenceSection,
    /// `[grid]`
    pub grid: GridSection,
    /// `[digitizer]`
    pub digitizer: DigitizerSection,
    /// `[processing]`
    pub processing: ProcessingSection,
    /// `[acquisition]`
    pub acquisition: AcquisitionSection,
}

/// Date, paths and water conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Version of this library.
    pub version: String,
    /// Local time of the start of the sequence, `YYYY-MM-DD_hh-mm-ss`.
    pub timestamp: String,
    /// Protocol file the sequence was read from.
    pub protocol: Option<PathBuf>,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Sequences were performed without confirmation.
    pub perform_all: bool,
    /// Water temperature \[℃\].
    pub temperature: Option<f32>,
    /// Dissolved oxygen level \[mg/L\].
    pub dissolved_oxygen: Option<f32>,
}

impl GeneralSection {
    /// Creates a section stamped with the current time.
    #[must_use]
    pub fn now(output_dir: PathBuf) -> Self {
        let timestamp = OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .format(format_description!(
                "[year]-[month]-[day]_[hour]-[minute]-[second]"
            ))
            .unwrap_or_default();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            protocol: None,
            output_dir,
            perform_all: false,
            temperature: None,
            dissolved_oxygen: None,
        }
    }
}

/// Equipment in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSection {
    /// Manufacturer of the driving system.
    pub manufacturer: Manufacturer,
}

/// The executed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSection {
    /// Sequence number.
    pub number: usize,
    /// Description.
    pub tag: String,
    /// Pulse program.
    pub program: PulseProgram,
}

/// The scanned grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSection {
    /// Absolute coordinate of the relative zero \[㎜\].
    pub coord_zero: Point3,
    /// Step between two columns \[㎜\], if the grid is regular.
    pub column_step: Option<Vector3>,
    /// Shape of the field volume.
    pub shape: GridShape,
    /// Grid as specified.
    pub spec: GridSpec,
}

/// Digitizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizerSection {
    /// Requested sampling frequency as a multiple of the operating frequency.
    pub sampling_multiplier: f32,
    /// Actual sampling frequency.
    pub sampling_frequency: Freq<f32>,
    /// Vendor timebase index.
    pub timebase: u32,
    /// Acquisition time \[㎲\].
    pub acquisition_time_us: f32,
    /// Number of samples per acquisition.
    pub sample_count: usize,
}

/// Phasor extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSection {
    /// Processing window.
    pub window: ProcessingWindow,
    /// Sound speed used for the time of flight correction \[㎜/㎲\].
    pub sound_speed: f32,
}

/// Retry settings and their outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionSection {
    /// Arm/trigger/wait cycles per point.
    pub max_attempts: usize,
    /// Handling of points whose every attempt timed out.
    pub timeout_policy: TimeoutPolicy,
    /// Measurement numbers of points acquired after every attempt timed out.
    #[serde(default)]
    pub degraded_points: Vec<usize>,
}

impl RunParameters {
    /// Writes the parameters as TOML.
    pub fn save(&self, path: &Path) -> Result<(), OutputError> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Parameters saved to {}", path.display());
        Ok(())
    }

    /// Reads parameters written by [`RunParameters::save`].
    pub fn load(path: &Path) -> Result<Self, OutputError> {
        Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
    }
}
