//! Reading and writing partitioned arrays as raster bands.
//!
//! A [`RasterBand`] is a rank-2 grid read and written in rectangular blocks;
//! its native block grid need not align with the partition grid of an array.
//! [`read_raster`] dispatches one read task per partition to the partition's
//! locality; [`write_raster`] drains a partitioned array into a band.

use std::sync::Arc;

use thiserror::Error;

use crate::partitioned::{
    to_usize, Partition, PartitionLayout, PartitionedArray, Runtime, TaskError,
};

/// A raster error.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The raster source cannot be opened.
    #[error("cannot open raster {0}")]
    CannotOpen(String),
    /// A block cannot be read.
    #[error("cannot read block at {offset:?} of shape {shape:?}")]
    CannotReadBlock {
        /// The row/column offset of the block.
        offset: [u64; 2],
        /// The shape of the block.
        shape: [u64; 2],
    },
    /// A block cannot be written.
    #[error("cannot write block at {offset:?} of shape {shape:?}")]
    CannotWriteBlock {
        /// The row/column offset of the block.
        offset: [u64; 2],
        /// The shape of the block.
        shape: [u64; 2],
    },
    /// The band shape differs from the array shape.
    #[error("band shape {band:?} does not match array shape {array:?}")]
    ShapeMismatch {
        /// The shape of the band.
        band: [u64; 2],
        /// The shape of the array.
        array: crate::ArrayShape,
    },
    /// A failed task.
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// A rank-2 grid of elements, accessed in rectangular blocks.
///
/// Blocks are addressed in element coordinates; implementations translate to
/// their native block grid, which need not align with the requested windows.
pub trait RasterBand<T>: Send + Sync {
    /// The shape of the band, rows then columns.
    fn shape(&self) -> [u64; 2];

    /// Read the row-major elements of the block at `offset` of `shape`.
    ///
    /// # Errors
    /// Returns a [`RasterError`] if the block exceeds the band bounds or
    /// cannot be read.
    fn read_block(&self, offset: [u64; 2], shape: [u64; 2]) -> Result<Vec<T>, RasterError>;

    /// Write the row-major `elements` to the block at `offset` of `shape`.
    ///
    /// # Errors
    /// Returns a [`RasterError`] if the block exceeds the band bounds or
    /// cannot be written.
    fn write_block(
        &mut self,
        offset: [u64; 2],
        shape: [u64; 2],
        elements: &[T],
    ) -> Result<(), RasterError>;
}

/// An in-memory raster band.
///
/// Stores the full grid; any in-bounds window can be read or written, however
/// it aligns with the band's nominal block grid.
#[derive(Debug)]
pub struct MemoryRasterBand<T> {
    shape: [u64; 2],
    block_shape: [u64; 2],
    elements: Vec<T>,
}

impl<T: Copy + Default + Send + Sync> MemoryRasterBand<T> {
    /// Create a band of `shape` filled with `T::default()`.
    ///
    /// `block_shape` is the band's nominal block grid; it constrains nothing
    /// here but mirrors what a file-backed band would report.
    ///
    /// # Panics
    /// Panics if a block extent is zero.
    #[must_use]
    pub fn new(shape: [u64; 2], block_shape: [u64; 2]) -> Self {
        assert!(block_shape.iter().all(|&extent| extent > 0));
        let nr_elements = to_usize(shape[0] * shape[1]);
        Self {
            shape,
            block_shape,
            elements: vec![T::default(); nr_elements],
        }
    }

    /// Create a band of `shape` from row-major `elements`.
    ///
    /// # Panics
    /// Panics if the length of `elements` does not match `shape` or a block
    /// extent is zero.
    #[must_use]
    pub fn from_elements(shape: [u64; 2], block_shape: [u64; 2], elements: Vec<T>) -> Self {
        assert!(block_shape.iter().all(|&extent| extent > 0));
        assert_eq!(elements.len(), to_usize(shape[0] * shape[1]));
        Self {
            shape,
            block_shape,
            elements,
        }
    }

    /// The nominal block shape of the band.
    #[must_use]
    pub fn block_shape(&self) -> [u64; 2] {
        self.block_shape
    }

    /// The row-major elements of the band.
    #[must_use]
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    fn in_bounds(&self, offset: [u64; 2], shape: [u64; 2]) -> bool {
        offset[0] + shape[0] <= self.shape[0] && offset[1] + shape[1] <= self.shape[1]
    }
}

impl<T: Copy + Default + Send + Sync> RasterBand<T> for MemoryRasterBand<T> {
    fn shape(&self) -> [u64; 2] {
        self.shape
    }

    fn read_block(&self, offset: [u64; 2], shape: [u64; 2]) -> Result<Vec<T>, RasterError> {
        if !self.in_bounds(offset, shape) {
            return Err(RasterError::CannotReadBlock { offset, shape });
        }
        let mut block = Vec::with_capacity(to_usize(shape[0] * shape[1]));
        for row in offset[0]..offset[0] + shape[0] {
            let start = to_usize(row * self.shape[1] + offset[1]);
            block.extend_from_slice(&self.elements[start..start + to_usize(shape[1])]);
        }
        Ok(block)
    }

    fn write_block(
        &mut self,
        offset: [u64; 2],
        shape: [u64; 2],
        elements: &[T],
    ) -> Result<(), RasterError> {
        if !self.in_bounds(offset, shape)
            || elements.len() != to_usize(shape[0] * shape[1])
        {
            return Err(RasterError::CannotWriteBlock { offset, shape });
        }
        let width = to_usize(shape[1]);
        for (block_row, row) in (offset[0]..offset[0] + shape[0]).enumerate() {
            let start = to_usize(row * self.shape[1] + offset[1]);
            self.elements[start..start + width]
                .copy_from_slice(&elements[block_row * width..(block_row + 1) * width]);
        }
        Ok(())
    }
}

/// Read a raster band into a partitioned array tiled by `partition_shape`.
///
/// One read task per partition is dispatched to the partition's locality; the
/// returned array's partitions resolve as the reads finish. A read failure
/// fails the affected partition's data future.
#[must_use]
pub fn read_raster<T: Copy + Default + Send + Sync + 'static>(
    runtime: &Runtime,
    band: Arc<dyn RasterBand<T>>,
    partition_shape: [u64; 2],
) -> PartitionedArray<T> {
    let shape = band.shape();
    tracing::debug!("reading raster band of shape {shape:?}");
    let layout = PartitionLayout::new(shape.to_vec(), partition_shape.to_vec());
    let partitions = (0..layout.nr_partitions())
        .map(|index| {
            let offset = layout.partition_offset(index);
            let shape = layout.partition_shape_at(index);
            let locality = Arc::clone(runtime.locality_for_partition(index));
            let band = Arc::clone(&band);
            let block_offset = [offset[0], offset[1]];
            let block_shape = [shape[0], shape[1]];
            let data = locality.dispatch(async move {
                band.read_block(block_offset, block_shape)
                    .map(Arc::new)
                    .map_err(|error| TaskError::new(error.to_string()))
            });
            Partition::pending(offset, shape, locality, data)
        })
        .collect();
    PartitionedArray::from_partitions(layout, partitions)
}

/// Write a partitioned array to a raster band, partition by partition.
///
/// # Errors
/// Returns a [`RasterError`] if the band shape differs from the array shape,
/// a producing task failed, or a block cannot be written.
pub fn write_raster<T: Copy + Default + Send + Sync + 'static>(
    array: &PartitionedArray<T>,
    band: &mut dyn RasterBand<T>,
) -> Result<(), RasterError> {
    let array_shape = array.layout().array_shape();
    if array_shape.len() != 2 || band.shape() != [array_shape[0], array_shape[1]] {
        return Err(RasterError::ShapeMismatch {
            band: band.shape(),
            array: array_shape.to_vec(),
        });
    }
    tracing::debug!("writing raster band of shape {array_shape:?}");
    for partition in array.partitions() {
        let elements = partition.wait()?;
        let offset = [partition.offset()[0], partition.offset()[1]];
        let shape = [partition.shape()[0], partition.shape()[1]];
        band.write_block(offset, shape, &elements)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_misaligned_blocks() {
        let runtime = Runtime::new(2, 2).unwrap();
        // The band's native 4x4 block grid does not align with the 3x5
        // partition grid.
        let elements: Vec<i32> = (0..8 * 10).collect();
        let band = Arc::new(MemoryRasterBand::from_elements([8, 10], [4, 4], elements.clone()));
        let array = read_raster(&runtime, band, [3, 5]);
        assert_eq!(array.layout().shape_in_partitions(), &[3, 2]);
        assert_eq!(array.to_elements().unwrap(), elements);
    }

    #[test]
    fn write_round_trip() {
        let runtime = Runtime::new(1, 2).unwrap();
        let source: Vec<u16> = (0..6 * 6).collect();
        let band = Arc::new(MemoryRasterBand::from_elements([6, 6], [2, 2], source.clone()));
        let array = read_raster(&runtime, band, [4, 4]);

        let mut target = MemoryRasterBand::<u16>::new([6, 6], [3, 3]);
        write_raster(&array, &mut target).unwrap();
        assert_eq!(target.elements(), &source[..]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let runtime = Runtime::new(1, 1).unwrap();
        let band = Arc::new(MemoryRasterBand::<f64>::new([4, 4], [2, 2]));
        let array = read_raster(&runtime, band, [2, 2]);
        let mut target = MemoryRasterBand::<f64>::new([4, 5], [2, 2]);
        assert!(matches!(
            write_raster(&array, &mut target),
            Err(RasterError::ShapeMismatch { band: [4, 5], .. })
        ));
    }

    #[test]
    fn out_of_bounds_block() {
        let band = MemoryRasterBand::<i32>::new([4, 4], [2, 2]);
        assert!(matches!(
            band.read_block([3, 3], [2, 2]),
            Err(RasterError::CannotReadBlock { .. })
        ));
    }
}
