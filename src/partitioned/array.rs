//! Partitioned arrays.

use std::sync::Arc;

use futures::future::try_join_all;
use rayon::prelude::*;

use super::{
    layout::{extract_hyperslab, store_hyperslab},
    to_usize, Partition, PartitionLayout, Runtime, TaskError,
};

/// A logical array tiled into [`Partition`]s per a [`PartitionLayout`].
///
/// Partition `i` covers the hyperslab at [`PartitionLayout::partition_offset`]
/// of [`PartitionLayout::partition_shape_at`], is pinned to
/// [`Runtime::locality_for_partition`]`(i)`, and holds its elements behind a
/// shareable future. The array itself is cheap to clone.
#[derive(Debug)]
pub struct PartitionedArray<T> {
    layout: PartitionLayout,
    partitions: Vec<Partition<T>>,
}

impl<T> Clone for PartitionedArray<T> {
    fn clone(&self) -> Self {
        Self {
            layout: self.layout.clone(),
            partitions: self.partitions.clone(),
        }
    }
}

impl<T: Copy + Default + Send + Sync + 'static> PartitionedArray<T> {
    /// Partition the row-major `elements` of shape
    /// [`PartitionLayout::array_shape`].
    ///
    /// Every partition is ready upon return; the hyperslabs are extracted in
    /// parallel.
    ///
    /// # Panics
    /// Panics if the length of `elements` does not equal the number of
    /// elements of the layout.
    #[must_use]
    pub fn from_elements(runtime: &Runtime, layout: PartitionLayout, elements: &[T]) -> Self {
        assert_eq!(elements.len(), to_usize(layout.nr_elements()));
        let tiles: Vec<Vec<T>> = (0..layout.nr_partitions())
            .into_par_iter()
            .map(|index| {
                extract_hyperslab(
                    elements,
                    layout.array_shape(),
                    &layout.partition_offset(index),
                    &layout.partition_shape_at(index),
                )
            })
            .collect();
        let partitions = tiles
            .into_iter()
            .enumerate()
            .map(|(index, tile)| {
                let index = index as u64;
                Partition::ready(
                    layout.partition_offset(index),
                    layout.partition_shape_at(index),
                    Arc::clone(runtime.locality_for_partition(index)),
                    tile,
                )
            })
            .collect();
        Self { layout, partitions }
    }

    /// Create an array with every element set to `value`.
    #[must_use]
    pub fn filled(runtime: &Runtime, layout: PartitionLayout, value: T) -> Self {
        let partitions = (0..layout.nr_partitions())
            .map(|index| {
                let nr_elements: u64 = layout.partition_shape_at(index).iter().product();
                Partition::ready(
                    layout.partition_offset(index),
                    layout.partition_shape_at(index),
                    Arc::clone(runtime.locality_for_partition(index)),
                    vec![value; to_usize(nr_elements)],
                )
            })
            .collect();
        Self { layout, partitions }
    }

    /// Assemble an array from per-partition tiles.
    ///
    /// # Panics
    /// Panics if the number of partitions does not match the layout.
    #[must_use]
    pub fn from_partitions(layout: PartitionLayout, partitions: Vec<Partition<T>>) -> Self {
        assert_eq!(partitions.len(), to_usize(layout.nr_partitions()));
        Self { layout, partitions }
    }

    /// The layout of the array.
    #[must_use]
    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// The partitions of the array, in row-major partition order.
    #[must_use]
    pub fn partitions(&self) -> &[Partition<T>] {
        &self.partitions
    }

    /// The partition at `index`.
    #[must_use]
    pub fn partition(&self, index: u64) -> &Partition<T> {
        &self.partitions[to_usize(index)]
    }

    /// Block until every partition is resolved and assemble the row-major
    /// elements of the logical array.
    ///
    /// # Errors
    /// Returns a [`TaskError`] if any producing task failed.
    pub fn to_elements(&self) -> Result<Vec<T>, TaskError> {
        let tiles = futures::executor::block_on(try_join_all(
            self.partitions.iter().map(Partition::data),
        ))?;
        let mut elements =
            vec![T::default(); to_usize(self.layout.nr_elements())];
        for (index, tile) in tiles.iter().enumerate() {
            let index = index as u64;
            store_hyperslab(
                &mut elements,
                self.layout.array_shape(),
                &self.layout.partition_offset(index),
                tile,
                &self.layout.partition_shape_at(index),
            );
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_uneven_tiling() {
        let runtime = Runtime::new(2, 2).unwrap();
        let layout = PartitionLayout::new(vec![5, 7], vec![2, 3]);
        let elements: Vec<i64> = (0..35).collect();
        let array = PartitionedArray::from_elements(&runtime, layout.clone(), &elements);
        assert_eq!(array.layout(), &layout);
        assert_eq!(array.partitions().len(), 9);
        // The first partition is the top-left 2x3 tile.
        assert_eq!(*array.partition(0).wait().unwrap(), vec![0, 1, 2, 7, 8, 9]);
        // The last partition is the clipped bottom-right 1x1 tile.
        assert_eq!(array.partition(8).shape(), &[1, 1]);
        assert_eq!(*array.partition(8).wait().unwrap(), vec![34]);
        assert_eq!(array.to_elements().unwrap(), elements);
    }

    #[test]
    fn filled() {
        let runtime = Runtime::new(1, 1).unwrap();
        let layout = PartitionLayout::new(vec![3, 3], vec![2, 2]);
        let array = PartitionedArray::filled(&runtime, layout, 5.0f64);
        assert_eq!(array.to_elements().unwrap(), vec![5.0; 9]);
    }
}
