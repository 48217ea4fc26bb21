mod files;
mod parameters;

use std::{
    fs::{File, OpenOptions},
    io::Write,
};

use zerocopy::IntoBytes;

use crate::{
    error::OutputError,
    grid::{CoordinateRecord, COORDINATE_HEADER},
    volume::FieldVolume,
};

pub use files::OutputFiles;
pub use parameters::{
    AcquisitionSection, DigitizerSection, EquipmentSection, GeneralSection, GridSection,
    ProcessingSection, RunParameters, SequenceSection,
};

/// A trait for the persistence of scan results.
pub trait Sink {
    /// Appends one waveform to the raw log.
    fn append_waveform(&mut self, samples: &[f32]) -> Result<(), OutputError>;

    /// Appends one row to the coordinate table.
    fn append_point(&mut self, record: &CoordinateRecord) -> Result<(), OutputError>;

    /// Writes the complete field volume.
    fn write_volume(&mut self, volume: &FieldVolume) -> Result<(), OutputError>;

    /// Writes the run parameters.
    fn write_parameters(&mut self, parameters: &RunParameters) -> Result<(), OutputError>;
}

// GRCOV_EXCL_START
impl Sink for Box<dyn Sink> {
    fn append_waveform(&mut self, samples: &[f32]) -> Result<(), OutputError> {
        self.as_mut().append_waveform(samples)
    }

    fn append_point(&mut self, record: &CoordinateRecord) -> Result<(), OutputError> {
        self.as_mut().append_point(record)
    }

    fn write_volume(&mut self, volume: &FieldVolume) -> Result<(), OutputError> {
        self.as_mut().write_volume(volume)
    }

    fn write_parameters(&mut self, parameters: &RunParameters) -> Result<(), OutputError> {
        self.as_mut().write_parameters(parameters)
    }
}
// GRCOV_EXCL_STOP

/// A [`Sink`] writing to the files of [`OutputFiles`].
///
/// Every call opens, appends and closes its file, so no handle is held between points.
#[derive(Debug)]
pub struct FileSink {
    files: OutputFiles,
}

impl FileSink {
    /// Creates an empty raw log and writes the header of the coordinate table.
    pub fn create(files: OutputFiles) -> Result<Self, OutputError> {
        File::create(files.raw())?;
        let f = OpenOptions::new()
            .append(true)
            .create(true)
            .open(files.coordinates())?;
        let mut wtr = csv::Writer::from_writer(f);
        wtr.write_record(COORDINATE_HEADER)?;
        wtr.flush()?;
        Ok(Self { files })
    }

    /// The output files.
    #[must_use]
    pub const fn files(&self) -> &OutputFiles {
        &self.files
    }
}

impl Sink for FileSink {
    fn append_waveform(&mut self, samples: &[f32]) -> Result<(), OutputError> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.files.raw())?
            .write_all(samples.as_bytes())?;
        Ok(())
    }

    fn append_point(&mut self, record: &CoordinateRecord) -> Result<(), OutputError> {
        let f = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.files.coordinates())?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(f);
        wtr.serialize(record)?;
        wtr.flush()?;
        Ok(())
    }

    fn write_volume(&mut self, volume: &FieldVolume) -> Result<(), OutputError> {
        File::create(self.files.volume())?.write_all(&volume.to_bytes())?;
        tracing::info!("Field volume saved to {}", self.files.volume().display());
        Ok(())
    }

    fn write_parameters(&mut self, parameters: &RunParameters) -> Result<(), OutputError> {
        parameters.save(&self.files.parameters())
    }
}

/// A [`Sink`] keeping everything in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    /// Waveforms in scan order.
    pub waveforms: Vec<Vec<f32>>,
    /// Coordinate rows in scan order.
    pub points: Vec<CoordinateRecord>,
    /// The last written volume.
    pub volume: Option<FieldVolume>,
    /// The last written parameters.
    pub parameters: Option<RunParameters>,
}

impl Sink for MemorySink {
    fn append_waveform(&mut self, samples: &[f32]) -> Result<(), OutputError> {
        self.waveforms.push(samples.to_vec());
        Ok(())
    }

    fn append_point(&mut self, record: &CoordinateRecord) -> Result<(), OutputError> {
        self.points.push(*record);
        Ok(())
    }

    fn write_volume(&mut self, volume: &FieldVolume) -> Result<(), OutputError> {
        self.volume = Some(volume.clone());
        Ok(())
    }

    fn write_parameters(&mut self, parameters: &RunParameters) -> Result<(), OutputError> {
        self.parameters = Some(parameters.clone());
        Ok(())
    }
}
