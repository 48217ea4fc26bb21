pub use crate::{
    acquisition::{AcquisitionOption, Capture, PointSummary, TimeoutPolicy},
    alignment::{AcousticAxis, AlignmentParameters, AlignmentReport, AlignmentSearch},
    error::{
        AlignmentError, OutputError, PhasorError, ScanError, SequenceError, VolumeError,
    },
    grid::{CoordinateTable, Grid, GridIndex, GridShape, RegularGrid, Traversal},
    output::{FileSink, MemorySink, OutputFiles, RunParameters, Sink},
    phasor::{Phasor, ProcessingWindow},
    protocol::{Protocol, RigConfig, TravelRange},
    reprocess::reprocess,
    rig::{Rig, SequenceOutcome, SequenceReport},
    scanner::{GridScanner, ScanOption, ScanReport},
    sequence::{Direction, ExtentSpec, GridSpec, Sequence},
    volume::FieldVolume,
};

pub use sonorover_core::prelude::*;
