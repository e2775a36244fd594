//! The task runtime: localities and their worker pools.

use std::sync::Arc;

use futures::{channel::oneshot, future::FutureExt, Future};

use super::{to_usize, TaskError, TaskResult};

/// A locality: one worker pool of the runtime.
///
/// Tasks dispatched to a locality run on its pool. A partition is pinned to a
/// locality for its lifetime, so chained operations on the partition stay on
/// the same pool.
pub struct Locality {
    index: usize,
    pool: futures::executor::ThreadPool,
}

impl std::fmt::Debug for Locality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locality").field("index", &self.index).finish()
    }
}

impl Locality {
    /// The index of the locality within the runtime.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Dispatch `task` to the locality's pool.
    ///
    /// The returned handle is shareable; every clone resolves to the same
    /// result. If the task panics, the handle resolves to a [`TaskError`].
    pub fn dispatch<T, Fut>(&self, task: Fut) -> TaskResult<T>
    where
        T: Clone + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        tracing::trace!("dispatching task to locality {}", self.index);
        let (sender, receiver) = oneshot::channel();
        self.pool.spawn_ok(async move {
            let _ = sender.send(task.await);
        });
        receiver
            .map(|result| result.unwrap_or_else(|canceled| Err(canceled.into())))
            .boxed()
            .shared()
    }
}

/// A set of localities over which partitions are distributed.
#[derive(Debug)]
pub struct Runtime {
    localities: Vec<Arc<Locality>>,
}

impl Runtime {
    /// Create a runtime of `nr_localities` localities with
    /// `nr_threads_per_locality` worker threads each.
    ///
    /// # Panics
    /// Panics if either count is zero.
    ///
    /// # Errors
    /// Returns an [`std::io::Error`] if a worker pool cannot be created.
    pub fn new(
        nr_localities: usize,
        nr_threads_per_locality: usize,
    ) -> Result<Self, std::io::Error> {
        assert!(nr_localities > 0);
        assert!(nr_threads_per_locality > 0);
        let localities = (0..nr_localities)
            .map(|index| {
                Ok(Arc::new(Locality {
                    index,
                    pool: futures::executor::ThreadPool::builder()
                        .pool_size(nr_threads_per_locality)
                        .name_prefix(format!("locality-{index}-"))
                        .create()?,
                }))
            })
            .collect::<Result<_, std::io::Error>>()?;
        Ok(Self { localities })
    }

    /// The number of localities.
    #[must_use]
    pub fn nr_localities(&self) -> usize {
        self.localities.len()
    }

    /// The locality at `index`.
    #[must_use]
    pub fn locality(&self, index: usize) -> &Arc<Locality> {
        &self.localities[index]
    }

    /// The locality that partition `partition_index` is assigned to.
    ///
    /// Partitions are distributed round-robin over the localities.
    #[must_use]
    pub fn locality_for_partition(&self, partition_index: u64) -> &Arc<Locality> {
        let index = to_usize(partition_index) % self.localities.len();
        &self.localities[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_assignment() {
        let runtime = Runtime::new(3, 1).unwrap();
        assert_eq!(runtime.nr_localities(), 3);
        assert_eq!(runtime.locality_for_partition(0).index(), 0);
        assert_eq!(runtime.locality_for_partition(4).index(), 1);
        assert_eq!(runtime.locality_for_partition(5).index(), 2);
    }

    #[test]
    fn dispatch_resolves_on_pool() {
        let runtime = Runtime::new(1, 2).unwrap();
        let task = runtime
            .locality(0)
            .dispatch(async { Ok::<_, TaskError>(21 * 2) });
        assert_eq!(futures::executor::block_on(task).unwrap(), 42);
    }
}
