//! I/O between partitioned arrays, cell producers and the data model.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    data_model::{value::same_shape, DataModelError},
    data_type::Element,
    ArrayIndices,
};

use super::{
    accumulator::PartitionInputAccumulator, to_usize, Partition, PartitionLayout,
    PartitionPromise, PartitionedArray, Runtime, TaskError,
};

/// An error moving data into or out of a partitioned array.
#[derive(Debug, Error)]
pub enum PartitionedIoError {
    /// A data model error.
    #[error(transparent)]
    DataModel(#[from] DataModelError),
    /// A failed task.
    #[error(transparent)]
    Task(#[from] TaskError),
    /// The data is not two-dimensional.
    #[error("expected a rank-2 value, got rank {0}")]
    NotRank2(usize),
}

/// Routes individually produced cell values into a partitioned array.
///
/// One accumulator and one promise per partition: producers insert values
/// keyed by logical array indices, in any order and from any thread; when a
/// partition's last distinct cell arrives, its tile is drained and its
/// promise fulfilled. The array is available (with pending partitions) from
/// the start, so consumers can chain operations before production finishes.
#[derive(Debug)]
pub struct Scatter<T> {
    layout: PartitionLayout,
    accumulators: Vec<Arc<PartitionInputAccumulator<T>>>,
    promises: Vec<Mutex<Option<PartitionPromise<T>>>>,
    array: PartitionedArray<T>,
}

impl<T: Copy + Default + Send + Sync + 'static> Scatter<T> {
    /// Create a scatter for `layout`.
    #[must_use]
    pub fn new(runtime: &Runtime, layout: PartitionLayout) -> Self {
        let mut accumulators = Vec::new();
        let mut promises = Vec::new();
        let mut partitions = Vec::new();
        for index in 0..layout.nr_partitions() {
            let shape = layout.partition_shape_at(index);
            let nr_cells: u64 = shape.iter().product();
            accumulators.push(Arc::new(PartitionInputAccumulator::new(to_usize(nr_cells))));
            let (promise, data) = PartitionPromise::new();
            promises.push(Mutex::new(Some(promise)));
            partitions.push(Partition::pending(
                layout.partition_offset(index),
                shape,
                Arc::clone(runtime.locality_for_partition(index)),
                data,
            ));
        }
        let array = PartitionedArray::from_partitions(layout.clone(), partitions);
        Self {
            layout,
            accumulators,
            promises,
            array,
        }
    }

    /// The array being filled. Partitions resolve as their cells arrive.
    #[must_use]
    pub fn array(&self) -> PartitionedArray<T> {
        self.array.clone()
    }

    /// Insert the value of the cell at `indices` (logical array indices).
    ///
    /// Re-inserting a cell before its partition completes overwrites the
    /// previous value. The partition whose last distinct cell this is has its
    /// data future fulfilled.
    ///
    /// # Panics
    /// Panics if `indices` is out of the array bounds.
    pub fn insert(&self, indices: ArrayIndices, value: T) {
        let index = self.layout.partition_index_of(&indices);
        let slot = to_usize(index);
        if self.accumulators[slot].insert(indices, value) {
            let offset = self.layout.partition_offset(index);
            let shape = self.layout.partition_shape_at(index);
            if let Some(tile) = self.accumulators[slot].drain(&offset, &shape) {
                if let Some(promise) = self.promises[slot].lock().take() {
                    promise.fulfill(tile);
                }
            }
        }
    }

    /// Fail every partition that is still pending.
    pub fn fail(&self, error: &TaskError) {
        for promise in &self.promises {
            if let Some(promise) = promise.lock().take() {
                promise.fail(error.clone());
            }
        }
    }
}

/// Load a rank-2 same-shape constant property value into a partitioned array
/// tiled by `partition_shape`.
///
/// The logical array shape is `[nr_objects, n]` where `n` is the extent of
/// each object's rank-1 value.
///
/// # Errors
/// Returns a [`PartitionedIoError`] if the value is not rank 1 per object or
/// cannot be read.
pub fn array_from_property<T: Element + Default + Send + Sync>(
    runtime: &Runtime,
    value: &same_shape::Value,
    partition_shape: Vec<u64>,
) -> Result<PartitionedArray<T>, PartitionedIoError> {
    let value_shape = value.value_shape();
    if value_shape.len() != 1 {
        return Err(PartitionedIoError::NotRank2(value_shape.len() + 1));
    }
    let array_shape = vec![value.nr_items(), value_shape[0]];
    let elements: Vec<T> = value.read(0, value.nr_items())?;
    Ok(PartitionedArray::from_elements(
        runtime,
        PartitionLayout::new(array_shape, partition_shape),
        &elements,
    ))
}

/// Append the elements of a rank-2 partitioned array to a same-shape constant
/// property value, one item per row.
///
/// # Errors
/// Returns a [`PartitionedIoError`] if the array is not rank 2, its row
/// extent differs from the value shape, a producing task failed, or the
/// append fails.
pub fn array_to_property<T: Element + Default + Send + Sync>(
    array: &PartitionedArray<T>,
    value: &mut same_shape::Value,
) -> Result<(), PartitionedIoError> {
    let array_shape = array.layout().array_shape();
    if array_shape.len() != 2 {
        return Err(PartitionedIoError::NotRank2(array_shape.len()));
    }
    if value.value_shape() != vec![array_shape[1]] {
        return Err(DataModelError::MismatchedLength {
            expected: value.value_shape().iter().product(),
            got: array_shape[1],
        }
        .into());
    }
    let elements = array.to_elements()?;
    value.append(&elements)?;
    Ok(())
}
