use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use sonorover_core::geometry::{round_point, Point3, Vector3};

use crate::{
    error::{ScanError, SequenceError},
    grid::{CoordinateTable, Grid, GridShape, RegularGrid, Traversal},
};

use super::Direction;

/// Grid of a sequence as written in a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridSpec {
    /// Explicit origin and step vectors.
    Regular {
        /// Absolute coordinate of the first point \[㎜\].
        origin: Point3,
        /// Step between two slices \[㎜\].
        vect_slice: Vector3,
        /// Step between two rows \[㎜\].
        vect_row: Vector3,
        /// Step between two columns \[㎜\].
        vect_col: Vector3,
        /// Number of slices, rows and columns.
        shape: GridShape,
        /// Column order.
        #[serde(default)]
        traversal: Traversal,
    },
    /// Extents around the coordinate zero.
    Extent(ExtentSpec),
    /// External coordinate table.
    Table {
        /// Path of the CSV file.
        path: PathBuf,
    },
    /// No grid; the sequence runs the alignment search.
    Alignment,
}

impl GridSpec {
    /// Builds the grid. Returns `None` for [`GridSpec::Alignment`].
    pub fn build(&self, coord_zero: Point3) -> Result<Option<Grid>, ScanError> {
        Ok(match self {
            GridSpec::Regular {
                origin,
                vect_slice,
                vect_row,
                vect_col,
                shape,
                traversal,
            } => Some(Grid::Regular {
                grid: RegularGrid {
                    origin: *origin,
                    vect_slice: *vect_slice,
                    vect_row: *vect_row,
                    vect_col: *vect_col,
                    shape: *shape,
                    traversal: *traversal,
                },
                coord_zero,
            }),
            GridSpec::Extent(spec) => Some(Grid::Regular {
                grid: spec.resolve(&coord_zero)?,
                coord_zero,
            }),
            GridSpec::Table { path } => {
                Some(Grid::Table(CoordinateTable::open(path, coord_zero)?))
            }
            GridSpec::Alignment => None,
        })
    }

    /// Checks if the sequence runs the alignment search.
    #[must_use]
    pub const fn is_alignment(&self) -> bool {
        matches!(self, GridSpec::Alignment)
    }
}

/// Grid defined by extents in the plus and minus direction of every axis around the coordinate zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentSpec {
    /// Measuring directions of the slices, rows and columns.
    pub directions: [Direction; 3],
    /// Extent in the positive direction of x, y and z \[㎜\].
    pub extent_plus: Vector3,
    /// Extent in the negative direction of x, y and z \[㎜\].
    pub extent_minus: Vector3,
    /// Step size along x, y and z \[㎜\].
    pub step: Vector3,
    /// Column order.
    #[serde(default)]
    pub traversal: Traversal,
}

impl ExtentSpec {
    /// Resolves the extents into a [`RegularGrid`].
    ///
    /// Scanning in `+a` starts at `zero − extent⁻`, in `−a` at `zero + extent⁺`.
    /// The number of points along an axis is `⌊(extent⁺ + extent⁻) / step⌋ + 1`, or 0 for a zero step.
    pub fn resolve(&self, coord_zero: &Point3) -> Result<RegularGrid, SequenceError> {
        let [d_slice, d_row, d_col] = self.directions;
        if d_slice.axis == d_row.axis || d_row.axis == d_col.axis || d_slice.axis == d_col.axis {
            return Err(SequenceError::DuplicateAxis(
                d_slice.to_string(),
                d_row.to_string(),
                d_col.to_string(),
            ));
        }

        let plus = self.extent_plus.abs();
        let minus = self.extent_minus.abs();
        let step = self.step.abs();

        let mut start = *coord_zero;
        self.directions.iter().for_each(|d| {
            let a = d.axis.index();
            start[a] = if d.negative {
                coord_zero[a] + plus[a]
            } else {
                coord_zero[a] - minus[a]
            };
        });

        let count = |d: Direction| {
            let a = d.axis.index();
            if step[a] == 0.0 {
                0
            } else {
                // absorbs representation error such as 2.0 / 0.1 = 19.999998
                ((plus[a] + minus[a]) / step[a] + 1e-3).floor() as usize + 1
            }
        };
        let vector = |d: Direction| d.unit() * step[d.axis.index()];

        let grid = RegularGrid {
            origin: round_point(&start, 3),
            vect_slice: vector(d_slice),
            vect_row: vector(d_row),
            vect_col: vector(d_col),
            shape: GridShape::new(count(d_slice), count(d_row), count(d_col)),
            traversal: self.traversal,
        };
        tracing::debug!("Resolved grid: {:?}", grid);
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(directions: [&str; 3]) -> anyhow::Result<ExtentSpec> {
        Ok(ExtentSpec {
            directions: [
                directions[0].parse()?,
                directions[1].parse()?,
                directions[2].parse()?,
            ],
            extent_plus: Vector3::new(5., 2., 10.),
            extent_minus: Vector3::new(5., 1., 0.),
            step: Vector3::new(0.5, 1., 2.),
            traversal: Traversal::Alternating,
        })
    }

    #[test]
    fn resolve() -> anyhow::Result<()> {
        let zero = Point3::new(100., 50., 20.);
        let grid = spec(["+z", "-y", "+x"])?.resolve(&zero)?;
        approx::assert_abs_diff_eq!(Point3::new(95., 52., 20.), grid.origin);
        assert_eq!(Vector3::new(0., 0., 2.), grid.vect_slice);
        assert_eq!(Vector3::new(0., -1., 0.), grid.vect_row);
        assert_eq!(Vector3::new(0.5, 0., 0.), grid.vect_col);
        assert_eq!(GridShape::new(6, 4, 21), grid.shape);
        assert_eq!(Traversal::Alternating, grid.traversal);

        let last = grid.position(crate::grid::GridIndex::new(5, 3, 20));
        approx::assert_abs_diff_eq!(Point3::new(105., 49., 30.), last);
        Ok(())
    }

    #[test]
    fn zero_step() -> anyhow::Result<()> {
        let mut s = spec(["+z", "+y", "+x"])?;
        s.step = Vector3::new(0.5, 0., 2.);
        assert_eq!(0, s.resolve(&Point3::origin())?.shape.rows);
        Ok(())
    }

    #[test]
    fn fractional_step() -> anyhow::Result<()> {
        let mut s = spec(["+z", "+y", "+x"])?;
        s.extent_plus = Vector3::new(1., 0., 0.);
        s.extent_minus = Vector3::new(1., 0., 0.);
        s.step = Vector3::new(0.1, 1., 1.);
        assert_eq!(21, s.resolve(&Point3::origin())?.shape.cols);
        Ok(())
    }

    #[test]
    fn duplicate_axis() -> anyhow::Result<()> {
        assert_eq!(
            Err(SequenceError::DuplicateAxis(
                "+z".to_string(),
                "-x".to_string(),
                "+x".to_string()
            )),
            spec(["+z", "-x", "+x"])?.resolve(&Point3::origin())
        );
        Ok(())
    }

    #[test]
    fn deserialize() -> anyhow::Result<()> {
        let spec: GridSpec = toml::from_str(
            r#"
kind = "extent"
directions = ["+z", "+y", "+x"]
extent_plus = [5.0, 5.0, 10.0]
extent_minus = [5.0, 5.0, 0.0]
step = [1.0, 1.0, 1.0]
traversal = "Alt"
"#,
        )?;
        let GridSpec::Extent(extent) = spec else {
            anyhow::bail!("unexpected variant");
        };
        assert_eq!(Traversal::Alternating, extent.traversal);

        let spec: GridSpec = toml::from_str(r#"kind = "alignment""#)?;
        assert!(spec.is_alignment());
        assert!(spec.build(Point3::origin())?.is_none());

        assert!(toml::from_str::<GridSpec>(
            r#"
kind = "extent"
directions = ["+z", "+y", "x"]
extent_plus = [5.0, 5.0, 10.0]
extent_minus = [5.0, 5.0, 0.0]
step = [1.0, 1.0, 1.0]
"#
        )
        .is_err());
        Ok(())
    }

    #[test]
    fn build_regular() -> anyhow::Result<()> {
        let spec: GridSpec = toml::from_str(
            r#"
kind = "regular"
origin = [0.0, 0.0, 0.0]
vect_slice = [0.0, 0.0, 1.0]
vect_row = [0.0, 1.0, 0.0]
vect_col = [1.0, 0.0, 0.0]
shape = { slices = 1, rows = 1, cols = 3 }
"#,
        )?;
        let grid = spec
            .build(Point3::new(0., 0., -10.))?
            .ok_or(anyhow::anyhow!("no grid"))?;
        assert_eq!(GridShape::new(1, 1, 3), grid.shape());
        let p = grid.point(2).ok_or(anyhow::anyhow!("no point"))?;
        approx::assert_abs_diff_eq!(Point3::new(2., 0., 0.), p.absolute);
        approx::assert_abs_diff_eq!(Point3::new(2., 0., 10.), p.relative);
        Ok(())
    }
}
