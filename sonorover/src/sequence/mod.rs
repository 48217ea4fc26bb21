mod direction;
mod grid_spec;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use sonorover_core::{
    device::Manufacturer,
    program::{Power, PulseProgram},
};

use crate::{alignment::AlignmentParameters, error::SequenceError, phasor::ProcessingWindow};

pub use direction::{Axis, Direction};
pub use grid_spec::{ExtentSpec, GridSpec};

/// One measurement pass of a protocol.
///
/// A sequence is never modified by the pipeline. The alignment search derives its line
/// grids from it without touching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct Sequence {
    /// Sequence number within the protocol.
    #[getset(get_copy = "pub")]
    number: usize,
    /// Free text description.
    #[serde(default)]
    #[getset(get = "pub")]
    tag: String,
    /// Pulse program sent to the driving system.
    #[getset(get = "pub")]
    program: PulseProgram,
    /// Grid to scan.
    #[getset(get = "pub")]
    grid: GridSpec,
    /// Parameters of the alignment search. Required if `grid` is [`GridSpec::Alignment`].
    #[serde(default)]
    #[getset(get = "pub")]
    alignment: Option<AlignmentParameters>,
    /// Processing window of the phasor extraction.
    #[serde(default)]
    #[getset(get_copy = "pub")]
    window: ProcessingWindow,
}

impl Sequence {
    /// Creates a new [`Sequence`].
    #[must_use]
    pub fn new(number: usize, program: PulseProgram, grid: GridSpec) -> Self {
        Self {
            number,
            tag: String::new(),
            program,
            grid,
            alignment: None,
            window: ProcessingWindow::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..self
        }
    }

    /// Sets the alignment parameters.
    #[must_use]
    pub fn with_alignment(self, alignment: AlignmentParameters) -> Self {
        Self {
            alignment: Some(alignment),
            ..self
        }
    }

    /// Sets the processing window.
    #[must_use]
    pub fn with_window(self, window: ProcessingWindow) -> Self {
        Self { window, ..self }
    }

    /// Replaces the grid.
    #[must_use]
    pub fn with_grid(self, grid: GridSpec) -> Self {
        Self { grid, ..self }
    }

    /// Checks that the sequence can be executed by a driving system of `manufacturer`.
    pub fn validate(&self, manufacturer: Manufacturer) -> Result<(), SequenceError> {
        self.program.validate()?;

        let supported = match (manufacturer, self.program.power) {
            (Manufacturer::SonicConcepts, Power::GlobalPower(_)) => true,
            (Manufacturer::Igt, Power::Amplitude(_) | Power::Pressure(_) | Power::Voltage(_)) => {
                true
            }
            _ => false,
        };
        if !supported {
            return Err(SequenceError::UnsupportedPower(
                manufacturer,
                self.program.power,
            ));
        }

        if !matches!(self.window.adjust, -1..=1) {
            return Err(SequenceError::InvalidAdjust(self.window.adjust));
        }

        match (&self.grid, &self.alignment) {
            (GridSpec::Alignment, None) => Err(SequenceError::InvalidAlignment(
                "alignment sequence without alignment parameters".to_string(),
            )),
            (_, Some(params)) => params.validate(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sequence {} ({}): {:?} at {:?}, {:?}",
            self.number,
            if self.tag.is_empty() { "-" } else { &self.tag },
            self.program.power,
            self.program.operating_frequency,
            self.grid
        )
    }
}
