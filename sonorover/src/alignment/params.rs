use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

const fn default_max_iterations() -> usize {
    50
}

const fn default_axis_length() -> f32 {
    100.
}

const fn default_axis_step() -> f32 {
    1.
}

/// Parameters of the [`AlignmentSearch`](super::AlignmentSearch).
///
/// Lengths are in \[㎜\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParameters {
    /// Axial distance of the two search planes from the focus.
    pub distance_from_focus: f32,
    /// Initial length of a search line.
    pub line_length: f32,
    /// Initial step of a search line.
    pub step: f32,
    /// The search in a plane stops when both estimates move less than this.
    pub threshold: f32,
    /// Factor applied to the line length and step when the window shrinks.
    pub reduction_factor: f32,
    /// The window shrinks every `max_reduction_iterations - 1` iterations.
    pub max_reduction_iterations: usize,
    /// Iteration ceiling per plane.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Writes the peak voltage of every line scan to a diagnostic table.
    #[serde(default)]
    pub emit_diagnostics: bool,
    /// Writes points sampled along the fitted axis as a coordinate table.
    #[serde(default)]
    pub emit_axis_table: bool,
    /// Length of the axis coordinate table.
    #[serde(default = "default_axis_length")]
    pub axis_length: f32,
    /// Step of the axis coordinate table.
    #[serde(default = "default_axis_step")]
    pub axis_step: f32,
}

impl Default for AlignmentParameters {
    fn default() -> Self {
        Self {
            distance_from_focus: 10.,
            line_length: 10.,
            step: 0.5,
            threshold: 0.01,
            reduction_factor: 0.5,
            max_reduction_iterations: 3,
            max_iterations: default_max_iterations(),
            emit_diagnostics: false,
            emit_axis_table: false,
            axis_length: default_axis_length(),
            axis_step: default_axis_step(),
        }
    }
}

impl AlignmentParameters {
    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), SequenceError> {
        let invalid = |msg: String| Err(SequenceError::InvalidAlignment(msg));
        let positive = [
            ("distance_from_focus", self.distance_from_focus),
            ("line_length", self.line_length),
            ("step", self.step),
            ("threshold", self.threshold),
            ("axis_length", self.axis_length),
            ("axis_step", self.axis_step),
        ];
        if let Some((name, v)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.)) {
            return invalid(format!("{} must be positive, but got {}", name, v));
        }
        if self.step > self.line_length {
            return invalid(format!(
                "step ({}) must not exceed line_length ({})",
                self.step, self.line_length
            ));
        }
        if !(self.reduction_factor > 0. && self.reduction_factor < 1.) {
            return invalid(format!(
                "reduction_factor must be in (0, 1), but got {}",
                self.reduction_factor
            ));
        }
        if self.max_reduction_iterations < 2 {
            return invalid(format!(
                "max_reduction_iterations must be at least 2, but got {}",
                self.max_reduction_iterations
            ));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}
