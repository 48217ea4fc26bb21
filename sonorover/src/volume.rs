use bit_vec::BitVec;
use ndarray::{Array4, ArrayView3, Axis};
use zerocopy::{FromBytes, IntoBytes};

use crate::{
    error::VolumeError,
    grid::{GridIndex, GridShape},
    phasor::Phasor,
};

const AMPLITUDE: usize = 0;
const PHASE: usize = 1;

/// Dense `[2, slices, rows, cols]` array of amplitude (component 0) and phase (component 1).
///
/// Every point is written exactly once. The volume is complete when all points are written.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldVolume {
    shape: GridShape,
    data: Array4<f32>,
    visited: BitVec,
}

impl FieldVolume {
    /// Creates a zero-filled volume.
    #[must_use]
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            data: Array4::zeros((2, shape.slices, shape.rows, shape.cols)),
            visited: BitVec::from_elem(shape.len(), false),
        }
    }

    /// Creates a complete volume from a flat `(component, slice, row, col)` dump.
    pub fn from_raw(shape: GridShape, values: Vec<f32>) -> Result<Self, VolumeError> {
        let len = values.len();
        let data = Array4::from_shape_vec((2, shape.slices, shape.rows, shape.cols), values)
            .map_err(|_| VolumeError::SizeMismatch(shape, 2 * shape.len(), len))?;
        Ok(Self {
            shape,
            data,
            visited: BitVec::from_elem(shape.len(), true),
        })
    }

    /// Creates a complete volume from native-endian float32 bytes.
    pub fn from_bytes(shape: GridShape, bytes: &[u8]) -> Result<Self, VolumeError> {
        if bytes.len() != 2 * shape.len() * std::mem::size_of::<f32>() {
            return Err(VolumeError::SizeMismatch(
                shape,
                2 * shape.len(),
                bytes.len() / std::mem::size_of::<f32>(),
            ));
        }
        let mut values = vec![0f32; 2 * shape.len()];
        values.as_mut_bytes().copy_from_slice(bytes);
        Self::from_raw(shape, values)
    }

    /// Shape of the grid.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    fn flat_index(&self, index: GridIndex) -> Result<usize, VolumeError> {
        if !self.shape.contains(index) {
            return Err(VolumeError::OutOfBounds(index, self.shape));
        }
        Ok((index.slice * self.shape.rows + index.row) * self.shape.cols + index.col)
    }

    /// Writes the phasor of one point.
    pub fn set(&mut self, index: GridIndex, phasor: Phasor) -> Result<(), VolumeError> {
        let i = self.flat_index(index)?;
        if self.visited.get(i).unwrap_or(false) {
            return Err(VolumeError::Revisited(index));
        }
        self.visited.set(i, true);
        self.data[[AMPLITUDE, index.slice, index.row, index.col]] = phasor.amplitude;
        self.data[[PHASE, index.slice, index.row, index.col]] = phasor.phase;
        Ok(())
    }

    /// Reads the phasor of one point.
    pub fn get(&self, index: GridIndex) -> Result<Phasor, VolumeError> {
        self.flat_index(index)?;
        Ok(Phasor {
            amplitude: self.data[[AMPLITUDE, index.slice, index.row, index.col]],
            phase: self.data[[PHASE, index.slice, index.row, index.col]],
        })
    }

    /// Checks if `index` has been written.
    #[must_use]
    pub fn is_visited(&self, index: GridIndex) -> bool {
        self.flat_index(index)
            .ok()
            .and_then(|i| self.visited.get(i))
            .unwrap_or(false)
    }

    /// Number of written points.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|&v| v).count()
    }

    /// Checks if every point has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.visited.all()
    }

    /// Amplitude plane `[slices, rows, cols]`.
    #[must_use]
    pub fn amplitude(&self) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), AMPLITUDE)
    }

    /// Phase plane `[slices, rows, cols]`.
    #[must_use]
    pub fn phase(&self) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), PHASE)
    }

    /// Values in `(component, slice, row, col)` row-major order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Native-endian float32 dump of [`FieldVolume::to_vec`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_vec().as_bytes().to_vec()
    }
}

/// Decodes native-endian float32 samples.
pub(crate) fn samples_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .filter_map(|c| f32::read_from_bytes(c).ok())
        .collect()
}
