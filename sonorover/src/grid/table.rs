use std::{collections::HashSet, fs::File, path::Path};

use serde::{Deserialize, Serialize};

use sonorover_core::geometry::{round_point, Point3};

use crate::{
    error::{OutputError, ScanError, SequenceError},
    grid::{GridIndex, GridPoint, GridShape},
};

/// Column names of a coordinate table.
pub const COORDINATE_HEADER: [&str; 12] = [
    "Measurement number",
    "Cluster number",
    "Indices number",
    "X-coordinate [mm]",
    "Y-coordinate [mm]",
    "Z-coordinate [mm]",
    "Row number",
    "Column number",
    "Slice number",
    "Absolute X-coordinate [mm]",
    "Absolute Y-coordinate [mm]",
    "Absolute Z-coordinate [mm]",
];

/// One row of a coordinate table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateRecord {
    /// Measurement number.
    #[serde(rename = "Measurement number")]
    pub measurement: usize,
    /// Cluster number.
    #[serde(rename = "Cluster number")]
    pub cluster: usize,
    /// Indices number.
    #[serde(rename = "Indices number")]
    pub indices: usize,
    /// Relative X coordinate \[㎜\].
    #[serde(rename = "X-coordinate [mm]")]
    pub x: f32,
    /// Relative Y coordinate \[㎜\].
    #[serde(rename = "Y-coordinate [mm]")]
    pub y: f32,
    /// Relative Z coordinate \[㎜\].
    #[serde(rename = "Z-coordinate [mm]")]
    pub z: f32,
    /// Row number.
    #[serde(rename = "Row number")]
    pub row: usize,
    /// Column number.
    #[serde(rename = "Column number")]
    pub col: usize,
    /// Slice number.
    #[serde(rename = "Slice number")]
    pub slice: usize,
    /// Absolute X coordinate \[㎜\].
    #[serde(rename = "Absolute X-coordinate [mm]", default)]
    pub abs_x: f32,
    /// Absolute Y coordinate \[㎜\].
    #[serde(rename = "Absolute Y-coordinate [mm]", default)]
    pub abs_y: f32,
    /// Absolute Z coordinate \[㎜\].
    #[serde(rename = "Absolute Z-coordinate [mm]", default)]
    pub abs_z: f32,
}

impl From<&GridPoint> for CoordinateRecord {
    fn from(p: &GridPoint) -> Self {
        let relative = round_point(&p.relative, 3);
        let absolute = round_point(&p.absolute, 3);
        Self {
            measurement: p.measurement,
            cluster: p.cluster,
            indices: p.indices,
            x: relative.x,
            y: relative.y,
            z: relative.z,
            row: p.numbers.row,
            col: p.numbers.col,
            slice: p.numbers.slice,
            abs_x: absolute.x,
            abs_y: absolute.y,
            abs_z: absolute.z,
        }
    }
}

/// Grid points read from an external coordinate table.
///
/// Row, column and slice numbers in the table are 1-based. Rows are visited in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTable {
    records: Vec<CoordinateRecord>,
    coord_zero: Point3,
    shape: GridShape,
}

impl CoordinateTable {
    /// Creates a table from records. Absolute coordinates are `coord_zero` plus the relative ones.
    pub fn new(records: Vec<CoordinateRecord>, coord_zero: Point3) -> Result<Self, SequenceError> {
        if let Some(i) = records
            .iter()
            .position(|r| r.row == 0 || r.col == 0 || r.slice == 0)
        {
            return Err(SequenceError::ZeroTableIndex(i + 1));
        }
        let mut seen = HashSet::with_capacity(records.len());
        if let Some(i) = records
            .iter()
            .position(|r| !seen.insert((r.slice, r.row, r.col)))
        {
            return Err(SequenceError::DuplicateTableIndex(i + 1));
        }
        let shape = records.iter().fold(GridShape::default(), |acc, r| GridShape {
            slices: acc.slices.max(r.slice),
            rows: acc.rows.max(r.row),
            cols: acc.cols.max(r.col),
        });
        Ok(Self {
            records,
            coord_zero,
            shape,
        })
    }

    /// Reads a table from a CSV file with the [`COORDINATE_HEADER`] columns.
    #[tracing::instrument(level = "debug", skip(coord_zero))]
    pub fn open(path: &Path, coord_zero: Point3) -> Result<Self, ScanError> {
        tracing::info!("Extract coordinates from {}", path.display());
        let f = File::open(path).map_err(OutputError::from)?;
        let records = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(f)
            .deserialize()
            .collect::<csv::Result<Vec<CoordinateRecord>>>()
            .map_err(OutputError::from)?;
        if records.is_empty() {
            return Err(SequenceError::EmptyTable(path.display().to_string()).into());
        }
        Ok(Self::new(records, coord_zero)?)
    }

    /// Shape derived from the largest slice, row and column numbers.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The raw records.
    #[must_use]
    pub fn records(&self) -> &[CoordinateRecord] {
        &self.records
    }

    /// The `counter`-th row as a grid point.
    #[must_use]
    pub fn point(&self, counter: usize) -> Option<GridPoint> {
        self.records.get(counter).map(|r| {
            let relative = Point3::new(r.x, r.y, r.z);
            GridPoint {
                measurement: r.measurement,
                cluster: r.cluster,
                indices: r.indices,
                index: GridIndex::new(r.slice - 1, r.row - 1, r.col - 1),
                numbers: GridIndex::new(r.slice, r.row, r.col),
                relative,
                absolute: self.coord_zero + relative.coords,
            }
        })
    }
}

/// Writes `records` to `path` with the [`COORDINATE_HEADER`] columns.
pub fn write_table(path: &Path, records: &[CoordinateRecord]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    records.iter().try_for_each(|r| wtr.serialize(r))?;
    wtr.flush()?;
    Ok(())
}
