//! Partitions: tiles of a partitioned array.

use std::sync::Arc;

use futures::{
    channel::oneshot,
    future::{self, FutureExt},
};

use crate::{ArrayIndices, ArrayShape};

use super::{Locality, TaskError, TaskResult};

/// A shareable handle to a partition's element data.
pub type PartitionData<T> = TaskResult<Arc<Vec<T>>>;

/// One tile of a partitioned array: a shape, a locality, and a future
/// resolving to the tile's row-major elements.
///
/// The data handle is shareable: cloning the partition (or the handle) never
/// recomputes the elements.
#[derive(Debug)]
pub struct Partition<T> {
    offset: ArrayIndices,
    shape: ArrayShape,
    locality: Arc<Locality>,
    data: PartitionData<T>,
}

impl<T> Clone for Partition<T> {
    fn clone(&self) -> Self {
        Self {
            offset: self.offset.clone(),
            shape: self.shape.clone(),
            locality: Arc::clone(&self.locality),
            data: self.data.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Partition<T> {
    /// Create a partition whose elements are already available.
    #[must_use]
    pub fn ready(
        offset: ArrayIndices,
        shape: ArrayShape,
        locality: Arc<Locality>,
        elements: Vec<T>,
    ) -> Self {
        Self {
            offset,
            shape,
            locality,
            data: future::ready(Ok(Arc::new(elements))).boxed().shared(),
        }
    }

    /// Create a partition whose elements a dispatched task will produce.
    #[must_use]
    pub fn pending(
        offset: ArrayIndices,
        shape: ArrayShape,
        locality: Arc<Locality>,
        data: PartitionData<T>,
    ) -> Self {
        Self {
            offset,
            shape,
            locality,
            data,
        }
    }

    /// The element offset of the partition within the logical array.
    #[must_use]
    pub fn offset(&self) -> &[u64] {
        &self.offset
    }

    /// The shape of the partition.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of elements in the partition.
    #[must_use]
    pub fn nr_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The locality the partition is pinned to.
    #[must_use]
    pub fn locality(&self) -> &Arc<Locality> {
        &self.locality
    }

    /// A handle to the partition's element data.
    #[must_use]
    pub fn data(&self) -> PartitionData<T> {
        self.data.clone()
    }

    /// Block until the partition's elements are available.
    ///
    /// # Errors
    /// Returns a [`TaskError`] if the producing task failed.
    pub fn wait(&self) -> Result<Arc<Vec<T>>, TaskError> {
        futures::executor::block_on(self.data.clone())
    }
}

/// The producer side of a pending partition's data.
///
/// Fulfilled (or failed) exactly once; dropping an unfulfilled promise fails
/// the partition.
#[derive(Debug)]
pub struct PartitionPromise<T> {
    sender: oneshot::Sender<Result<Arc<Vec<T>>, TaskError>>,
}

impl<T: Send + Sync + 'static> PartitionPromise<T> {
    /// Create a promise and the data handle it fulfills.
    #[must_use]
    pub fn new() -> (Self, PartitionData<T>) {
        let (sender, receiver) = oneshot::channel();
        let data = receiver
            .map(|result| result.unwrap_or_else(|canceled| Err(TaskError::from(canceled))))
            .boxed()
            .shared();
        (Self { sender }, data)
    }

    /// Fulfill the promise with the partition's elements.
    pub fn fulfill(self, elements: Vec<T>) {
        let _ = self.sender.send(Ok(Arc::new(elements)));
    }

    /// Fail the promise.
    pub fn fail(self, error: TaskError) {
        let _ = self.sender.send(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use crate::partitioned::Runtime;

    use super::*;

    #[test]
    fn ready_partition() {
        let runtime = Runtime::new(1, 1).unwrap();
        let partition = Partition::ready(
            vec![0, 0],
            vec![2, 3],
            Arc::clone(runtime.locality(0)),
            vec![1i32, 2, 3, 4, 5, 6],
        );
        assert_eq!(partition.nr_elements(), 6);
        assert_eq!(*partition.wait().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        // A clone shares the same data.
        assert_eq!(*partition.clone().wait().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn promise_fulfillment_and_failure() {
        let runtime = Runtime::new(1, 1).unwrap();
        let (promise, data) = PartitionPromise::new();
        let partition = Partition::pending(
            vec![0],
            vec![2],
            Arc::clone(runtime.locality(0)),
            data,
        );
        promise.fulfill(vec![1u8, 2]);
        assert_eq!(*partition.wait().unwrap(), vec![1, 2]);

        let (promise, data) = PartitionPromise::<u8>::new();
        promise.fail(TaskError::new("source unavailable"));
        assert!(futures::executor::block_on(data).is_err());

        // Dropping an unfulfilled promise fails the partition.
        let (promise, data) = PartitionPromise::<u8>::new();
        drop(promise);
        assert!(futures::executor::block_on(data).is_err());
    }
}
