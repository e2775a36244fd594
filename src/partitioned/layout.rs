//! Partition layouts.

use crate::{ArrayIndices, ArrayShape};

/// The tiling of a logical array into rectangular partitions.
///
/// The array shape is divided by the partition shape, rounding up, so the
/// whole array is covered; partitions in the last row/column of each
/// dimension are clipped to the array bounds. Partitions are numbered
/// row-major.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartitionLayout {
    array_shape: ArrayShape,
    partition_shape: ArrayShape,
    shape_in_partitions: ArrayShape,
}

impl PartitionLayout {
    /// Create a layout tiling `array_shape` by `partition_shape`.
    ///
    /// # Panics
    /// Panics if the shapes have different ranks or a partition extent is
    /// zero.
    #[must_use]
    pub fn new(array_shape: ArrayShape, partition_shape: ArrayShape) -> Self {
        assert_eq!(array_shape.len(), partition_shape.len());
        assert!(partition_shape.iter().all(|&extent| extent > 0));
        let shape_in_partitions = array_shape
            .iter()
            .zip(&partition_shape)
            .map(|(&array, &partition)| array.div_ceil(partition))
            .collect();
        Self {
            array_shape,
            partition_shape,
            shape_in_partitions,
        }
    }

    /// The shape of the logical array.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// The shape of an unclipped partition.
    #[must_use]
    pub fn partition_shape(&self) -> &[u64] {
        &self.partition_shape
    }

    /// The number of partitions per dimension.
    #[must_use]
    pub fn shape_in_partitions(&self) -> &[u64] {
        &self.shape_in_partitions
    }

    /// The number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.array_shape.len()
    }

    /// The total number of partitions.
    #[must_use]
    pub fn nr_partitions(&self) -> u64 {
        self.shape_in_partitions.iter().product()
    }

    /// The total number of elements in the logical array.
    #[must_use]
    pub fn nr_elements(&self) -> u64 {
        self.array_shape.iter().product()
    }

    /// The per-dimension partition coordinates of partition `index`.
    #[must_use]
    pub fn partition_coordinates(&self, index: u64) -> ArrayIndices {
        let mut coordinates = vec![0; self.rank()];
        let mut remainder = index;
        for dimension in (0..self.rank()).rev() {
            coordinates[dimension] = remainder % self.shape_in_partitions[dimension];
            remainder /= self.shape_in_partitions[dimension];
        }
        coordinates
    }

    /// The element offset of partition `index` within the logical array.
    #[must_use]
    pub fn partition_offset(&self, index: u64) -> ArrayIndices {
        self.partition_coordinates(index)
            .iter()
            .zip(&self.partition_shape)
            .map(|(&coordinate, &extent)| coordinate * extent)
            .collect()
    }

    /// The shape of partition `index`, clipped to the array bounds.
    #[must_use]
    pub fn partition_shape_at(&self, index: u64) -> ArrayShape {
        self.partition_offset(index)
            .iter()
            .zip(self.partition_shape.iter().zip(&self.array_shape))
            .map(|(&offset, (&extent, &array))| extent.min(array - offset))
            .collect()
    }

    /// The index of the partition containing the element at `indices`.
    ///
    /// # Panics
    /// Panics if `indices` is out of the array bounds.
    #[must_use]
    pub fn partition_index_of(&self, indices: &[u64]) -> u64 {
        assert_eq!(indices.len(), self.rank());
        let mut index = 0;
        for dimension in 0..self.rank() {
            assert!(indices[dimension] < self.array_shape[dimension]);
            let coordinate = indices[dimension] / self.partition_shape[dimension];
            index = index * self.shape_in_partitions[dimension] + coordinate;
        }
        index
    }
}

/// Copy the row-major hyperslab at `offset` of `shape` out of `elements`
/// (shaped `array_shape`).
pub(crate) fn extract_hyperslab<T: Copy>(
    elements: &[T],
    array_shape: &[u64],
    offset: &[u64],
    shape: &[u64],
) -> Vec<T> {
    let rank = shape.len();
    if rank == 0 {
        return elements.to_vec();
    }
    let row_length = usize::try_from(shape[rank - 1]).unwrap();
    let nr_rows: u64 = shape[..rank - 1].iter().product();
    let strides = row_major_strides(array_shape);
    let mut out =
        Vec::with_capacity(usize::try_from(nr_rows).unwrap() * row_length);
    for row in 0..nr_rows {
        let start = row_start(row, offset, shape, &strides);
        out.extend_from_slice(&elements[start..start + row_length]);
    }
    out
}

/// Copy the row-major hyperslab `sub` (of `shape`) into `elements` (shaped
/// `array_shape`) at `offset`.
pub(crate) fn store_hyperslab<T: Copy>(
    elements: &mut [T],
    array_shape: &[u64],
    offset: &[u64],
    sub: &[T],
    shape: &[u64],
) {
    let rank = shape.len();
    if rank == 0 {
        elements.copy_from_slice(sub);
        return;
    }
    let row_length = usize::try_from(shape[rank - 1]).unwrap();
    let nr_rows: u64 = shape[..rank - 1].iter().product();
    let strides = row_major_strides(array_shape);
    for row in 0..nr_rows {
        let start = row_start(row, offset, shape, &strides);
        let sub_start = usize::try_from(row).unwrap() * row_length;
        elements[start..start + row_length]
            .copy_from_slice(&sub[sub_start..sub_start + row_length]);
    }
}

fn row_major_strides(array_shape: &[u64]) -> Vec<u64> {
    let rank = array_shape.len();
    let mut strides = vec![1; rank];
    for dimension in (0..rank - 1).rev() {
        strides[dimension] = strides[dimension + 1] * array_shape[dimension + 1];
    }
    strides
}

/// The linear start, within the full array, of the `row`-th innermost row of
/// the hyperslab.
fn row_start(row: u64, offset: &[u64], shape: &[u64], strides: &[u64]) -> usize {
    let rank = shape.len();
    let mut start = offset[rank - 1] * strides[rank - 1];
    let mut remainder = row;
    for dimension in (0..rank - 1).rev() {
        let coordinate = remainder % shape[dimension];
        remainder /= shape[dimension];
        start += (offset[dimension] + coordinate) * strides[dimension];
    }
    usize::try_from(start).unwrap()
}
