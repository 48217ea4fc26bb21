use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sonorover_core::{device::Manufacturer, geometry::Point3, medium::Medium};

use crate::{
    acquisition::TimeoutPolicy,
    error::{OutputError, ScanError},
    sequence::{GridSpec, Sequence},
};

const fn default_sampling_multiplier() -> f32 {
    50.
}

/// Travel limits of the positioning system \[㎜\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelRange {
    /// Lower limits of x, y and z.
    pub min: Point3,
    /// Upper limits of x, y and z.
    pub max: Point3,
}

impl TravelRange {
    /// Checks if `p` lies within the limits.
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }
}

/// Settings shared by every sequence of a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    /// Absolute coordinate of the relative zero \[㎜\].
    pub coord_zero: Point3,
    /// Sampling frequency as a multiple of the operating frequency.
    #[serde(default = "default_sampling_multiplier")]
    pub sampling_multiplier: f32,
    /// Acquisition time per point \[㎲\].
    pub acquisition_time_us: f32,
    /// Manufacturer of the driving system.
    pub manufacturer: Manufacturer,
    /// Travel limits of the positioning system.
    #[serde(default)]
    pub travel_range: Option<TravelRange>,
    /// Directory of the output files.
    pub output_dir: PathBuf,
    /// Runs every sequence without asking for confirmation.
    #[serde(default)]
    pub perform_all: bool,
    /// Water temperature \[℃\].
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Dissolved oxygen level \[mg/L\].
    #[serde(default)]
    pub dissolved_oxygen: Option<f32>,
    /// Propagation medium.
    #[serde(default)]
    pub medium: Medium,
    /// Handling of points whose every acquisition attempt timed out.
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

/// A measurement protocol: rig settings and the sequences to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    /// `[rig]`
    pub rig: RigConfig,
    /// `[[sequence]]`
    #[serde(rename = "sequence", default)]
    pub sequences: Vec<Sequence>,
    /// File the protocol was read from.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Protocol {
    /// Parses a protocol.
    ///
    /// Every sequence is validated against the manufacturer of the rig.
    pub fn parse(s: &str) -> Result<Self, ScanError> {
        let protocol: Self = toml::from_str(s).map_err(OutputError::from)?;
        protocol
            .sequences
            .iter()
            .try_for_each(|seq| seq.validate(protocol.rig.manufacturer))?;
        tracing::debug!("{} sequences in protocol", protocol.sequences.len());
        Ok(protocol)
    }

    /// Reads a protocol file.
    ///
    /// Relative paths of the output directory and of coordinate tables are resolved against the
    /// directory of the file.
    #[tracing::instrument(level = "info")]
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let mut protocol = Self::parse(&std::fs::read_to_string(path).map_err(OutputError::from)?)?;
        let base = path.parent().unwrap_or(Path::new(""));
        if protocol.rig.output_dir.is_relative() {
            protocol.rig.output_dir = base.join(&protocol.rig.output_dir);
        }
        protocol.sequences = protocol
            .sequences
            .into_iter()
            .map(|seq| match seq.grid() {
                GridSpec::Table { path } if path.is_relative() => {
                    let path = base.join(path);
                    seq.with_grid(GridSpec::Table { path })
                }
                _ => seq,
            })
            .collect();
        protocol.path = Some(path.to_path_buf());
        Ok(protocol)
    }

    /// Sequence with `number`.
    #[must_use]
    pub fn sequence(&self, number: usize) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.number() == number)
    }
}
