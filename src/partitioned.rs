//! Partitioned in-memory arrays and asynchronous elementwise operations.
//!
//! A [`PartitionedArray`] tiles a logical array into rectangular partitions
//! per a [`PartitionLayout`]. Each partition's data is a shareable future
//! pinned to a [`Locality`] (a worker pool); operations dispatch one task per
//! partition to the partition's locality and return immediately with a new
//! array of pending partitions. Work thus overlaps across partitions and
//! chains across operations without intermediate synchronization.

mod array;
mod layout;
mod partition;
mod runtime;

pub mod accumulator;
pub mod io;
pub mod ops;

pub use array::PartitionedArray;
pub use layout::PartitionLayout;
pub use partition::{Partition, PartitionData, PartitionPromise};
pub use runtime::{Locality, Runtime};

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use thiserror::Error;

/// A failed task.
///
/// Cloneable so that a shared partition future can hand the failure to every
/// downstream consumer.
#[derive(Clone, Debug, Error)]
#[error("task failed: {0}")]
pub struct TaskError(Arc<String>);

impl TaskError {
    /// Create a new task error from `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(Arc::new(message.into()))
    }
}

impl From<futures::channel::oneshot::Canceled> for TaskError {
    fn from(_: futures::channel::oneshot::Canceled) -> Self {
        Self::new("task dropped its result promise")
    }
}

/// A shareable handle to the result of a dispatched task.
pub type TaskResult<T> = Shared<BoxFuture<'static, Result<T, TaskError>>>;

/// Element counts always fit `usize` on the 64-bit targets this crate
/// supports.
pub(crate) fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap()
}
