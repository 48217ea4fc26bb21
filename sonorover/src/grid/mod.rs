mod table;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use sonorover_core::geometry::{Point3, Vector3};

use crate::error::SequenceError;

pub use table::{write_table, CoordinateRecord, CoordinateTable, COORDINATE_HEADER};

/// Number of slices, rows and columns of a grid.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[display("({slices}, {rows}, {cols})")]
pub struct GridShape {
    /// Number of slices.
    pub slices: usize,
    /// Number of rows per slice.
    pub rows: usize,
    /// Number of columns per row.
    pub cols: usize,
}

impl GridShape {
    /// Creates a new [`GridShape`].
    #[must_use]
    pub const fn new(slices: usize, rows: usize, cols: usize) -> Self {
        Self { slices, rows, cols }
    }

    /// Total number of grid points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slices * self.rows * self.cols
    }

    /// Checks if the grid has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if `index` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, index: GridIndex) -> bool {
        index.slice < self.slices && index.row < self.rows && index.col < self.cols
    }

    /// Index of the `counter`-th visited point.
    ///
    /// # Panics
    ///
    /// Panics if the grid is empty.
    #[must_use]
    pub const fn index_of(&self, counter: usize, traversal: Traversal) -> GridIndex {
        let per_slice = self.rows * self.cols;
        let slice = counter / per_slice;
        let rc = counter % per_slice;
        let row = rc / self.cols;
        let rem = rc % self.cols;
        let col = match traversal {
            Traversal::Alternating if row % 2 == 1 => self.cols - rem - 1,
            _ => rem,
        };
        GridIndex { slice, row, col }
    }

    /// Returns the visiting order of this grid.
    #[must_use]
    pub const fn scan_order(&self, traversal: Traversal) -> ScanOrder {
        ScanOrder {
            shape: *self,
            traversal,
            cursor: 0,
        }
    }
}

/// Position of a grid point, 0-based.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display("({slice}, {row}, {col})")]
pub struct GridIndex {
    /// Slice index.
    pub slice: usize,
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl GridIndex {
    /// Creates a new [`GridIndex`].
    #[must_use]
    pub const fn new(slice: usize, row: usize, col: usize) -> Self {
        Self { slice, row, col }
    }
}

/// Order of the columns within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Traversal {
    /// Raster order. Every row is scanned with increasing column index.
    #[default]
    #[serde(rename = "Dir", alias = "direct")]
    Direct,
    /// Boustrophedon order. Odd rows are scanned with decreasing column index.
    #[serde(rename = "Alt", alias = "alternating")]
    Alternating,
}

impl std::str::FromStr for Traversal {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Dir" | "dir" | "direct" => Ok(Traversal::Direct),
            "Alt" | "alt" | "alternating" => Ok(Traversal::Alternating),
            _ => Err(SequenceError::InvalidTraversal(s.to_string())),
        }
    }
}

/// Iterator over the indices of a grid in visiting order.
///
/// Use [`GridShape::scan_order`] again to start over.
#[derive(Debug, Clone)]
pub struct ScanOrder {
    shape: GridShape,
    traversal: Traversal,
    cursor: usize,
}

impl Iterator for ScanOrder {
    type Item = GridIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.shape.len() {
            return None;
        }
        let index = self.shape.index_of(self.cursor, self.traversal);
        self.cursor += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.shape.len() - self.cursor.min(self.shape.len());
        (n, Some(n))
    }
}

impl ExactSizeIterator for ScanOrder {}

/// A grid point with all its bookkeeping numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Measurement number.
    pub measurement: usize,
    /// Cluster number.
    pub cluster: usize,
    /// Indices number.
    pub indices: usize,
    /// Position in the field volume.
    pub index: GridIndex,
    /// Slice, row and column numbers as written to the coordinate table.
    ///
    /// Equal to `index` for regular grids; 1-based for points read from a table.
    pub numbers: GridIndex,
    /// Coordinate relative to the coordinate zero \[㎜\].
    pub relative: Point3,
    /// Absolute coordinate of the positioning system \[㎜\].
    pub absolute: Point3,
}

/// A regular grid spanned by three step vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    /// Absolute coordinate of the first point \[㎜\].
    pub origin: Point3,
    /// Step between two slices.
    pub vect_slice: Vector3,
    /// Step between two rows.
    pub vect_row: Vector3,
    /// Step between two columns.
    pub vect_col: Vector3,
    /// Number of points along each vector.
    pub shape: GridShape,
    /// Column order.
    pub traversal: Traversal,
}

impl RegularGrid {
    /// Absolute coordinate of `index`.
    #[must_use]
    pub fn position(&self, index: GridIndex) -> Point3 {
        self.origin
            + self.vect_slice * index.slice as f32
            + self.vect_row * index.row as f32
            + self.vect_col * index.col as f32
    }
}

/// The set of points visited by a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Grid {
    /// Points computed from a [`RegularGrid`].
    Regular {
        /// The grid.
        grid: RegularGrid,
        /// Absolute coordinate of the relative zero \[㎜\].
        coord_zero: Point3,
    },
    /// Points read from an external coordinate table.
    Table(CoordinateTable),
}

impl Grid {
    /// Shape of the field volume filled by this grid.
    #[must_use]
    pub fn shape(&self) -> GridShape {
        match self {
            Grid::Regular { grid, .. } => grid.shape,
            Grid::Table(table) => table.shape(),
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Grid::Regular { grid, .. } => grid.shape.len(),
            Grid::Table(table) => table.len(),
        }
    }

    /// Checks if the grid has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step between two neighbouring columns, used for the time of flight correction.
    ///
    /// Table grids have no fixed column step.
    #[must_use]
    pub fn column_step(&self) -> Option<Vector3> {
        match self {
            Grid::Regular { grid, .. } => Some(grid.vect_col),
            Grid::Table(_) => None,
        }
    }

    /// The `counter`-th point in visiting order.
    #[must_use]
    pub fn point(&self, counter: usize) -> Option<GridPoint> {
        match self {
            Grid::Regular { grid, coord_zero } => {
                if counter >= grid.shape.len() {
                    return None;
                }
                let index = grid.shape.index_of(counter, grid.traversal);
                let absolute = grid.position(index);
                Some(GridPoint {
                    measurement: counter + 1,
                    cluster: 1,
                    indices: counter + 1,
                    index,
                    numbers: index,
                    relative: Point3::from(absolute - coord_zero),
                    absolute,
                })
            }
            Grid::Table(table) => table.point(counter),
        }
    }

    /// All points in visiting order.
    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (0..self.len()).filter_map(|i| self.point(i))
    }
}
