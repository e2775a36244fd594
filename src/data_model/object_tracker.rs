//! Object trackers.

use crate::{
    container::{node_exists, Array, Attributes, ContainerError, Group, NodePath},
    data_type::DataType,
    storage::ReadableWritableListableStorage,
};

use super::DataModelError;

/// The node name of an object tracker group.
pub const OBJECT_TRACKER: &str = "object_tracker";

const ACTIVE_SET_INDEX: &str = "active_set_index";
const ACTIVE_OBJECT_ID: &str = "active_object_id";
const ACTIVE_OBJECT_INDEX: &str = "active_object_index";

/// Records, per discretized time step, which object IDs are active and at
/// what offset their data lives.
///
/// Three parallel append-only arrays:
///  - `active_set_index`: one entry per time step, the offset of the step's
///    first ID in `active_object_id`,
///  - `active_object_id`: the flattened list, across all time steps, of the
///    IDs of the active objects,
///  - optionally `active_object_index`: the storage offset of each active
///    object's data, when storage order differs from ID order.
///
/// Invariant: the `t`-th `active_set_index` value equals the sum of all
/// active-set sizes of time steps `0..t`.
#[derive(Debug)]
pub struct ObjectTracker {
    path: NodePath,
    active_set_index: Array,
    active_object_id: Array,
    active_object_index: Option<Array>,
}

impl ObjectTracker {
    /// Create a new object tracker in the node at `parent`.
    ///
    /// `with_indices` adds the optional `active_object_index` array.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the tracker already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
        with_indices: bool,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(OBJECT_TRACKER)?;
        Group::create(storage.clone(), path.clone(), Attributes::new())?;
        let active_set_index = Array::create(
            storage.clone(),
            path.join(ACTIVE_SET_INDEX)?,
            DataType::UInt64,
            &[],
            Attributes::new(),
        )?;
        let active_object_id = Array::create(
            storage.clone(),
            path.join(ACTIVE_OBJECT_ID)?,
            DataType::UInt64,
            &[],
            Attributes::new(),
        )?;
        let active_object_index = if with_indices {
            Some(Array::create(
                storage.clone(),
                path.join(ACTIVE_OBJECT_INDEX)?,
                DataType::UInt64,
                &[],
                Attributes::new(),
            )?)
        } else {
            None
        };
        Ok(Self {
            path,
            active_set_index,
            active_object_id,
            active_object_index,
        })
    }

    /// Open the existing object tracker in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the tracker does not exist or on an
    /// underlying container failure.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(OBJECT_TRACKER)?;
        Group::open(storage.clone(), path.clone())?;
        let active_set_index = Array::open(storage.clone(), path.join(ACTIVE_SET_INDEX)?)?;
        let active_object_id = Array::open(storage.clone(), path.join(ACTIVE_OBJECT_ID)?)?;
        let index_path = path.join(ACTIVE_OBJECT_INDEX)?;
        let active_object_index = if node_exists(&**storage, &index_path)? {
            Some(Array::open(storage.clone(), index_path)?)
        } else {
            None
        };
        Ok(Self {
            path,
            active_set_index,
            active_object_id,
            active_object_index,
        })
    }

    /// The path of the tracker group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return whether the tracker records storage offsets.
    #[must_use]
    pub fn has_indices(&self) -> bool {
        self.active_object_index.is_some()
    }

    /// Append one time step: the IDs of the objects active at that step, and
    /// optionally their storage offsets.
    ///
    /// Returns the index of the appended time step.
    ///
    /// # Errors
    /// Returns [`DataModelError::MismatchedLength`] if `indices` is present
    /// with a different length than `ids`, or a [`DataModelError`] on an
    /// underlying container failure.
    pub fn append_time_step(
        &mut self,
        ids: &[u64],
        indices: Option<&[u64]>,
    ) -> Result<u64, DataModelError> {
        if let Some(indices) = indices {
            if indices.len() != ids.len() {
                return Err(DataModelError::MismatchedLength {
                    expected: ids.len() as u64,
                    got: indices.len() as u64,
                });
            }
        }
        let offset = self.active_object_id.nr_items();
        let step = self.active_set_index.append_items(&[offset])?;
        if !ids.is_empty() {
            self.active_object_id.append_items(ids)?;
        }
        if let (Some(array), Some(indices)) = (&self.active_object_index, indices) {
            if !indices.is_empty() {
                array.append_items(indices)?;
            }
        }
        Ok(step)
    }

    /// The number of recorded time steps.
    #[must_use]
    pub fn nr_time_steps(&self) -> u64 {
        self.active_set_index.nr_items()
    }

    /// Return the offset into `active_object_id` of time step `step`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if `step` is out of bounds.
    pub fn active_set_index(&self, step: u64) -> Result<u64, DataModelError> {
        Ok(self.active_set_index.read_items::<u64>(step, 1)?[0])
    }

    /// Return the number of objects active at time step `step`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if `step` is out of bounds.
    pub fn active_set_size(&self, step: u64) -> Result<u64, DataModelError> {
        let start = self.active_set_index(step)?;
        let end = if step + 1 < self.nr_time_steps() {
            self.active_set_index(step + 1)?
        } else {
            self.active_object_id.nr_items()
        };
        Ok(end - start)
    }

    /// Return the sizes of all active sets.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn active_set_sizes(&self) -> Result<Vec<u64>, DataModelError> {
        let indices = self.active_set_index.read_all::<u64>()?;
        let total = self.active_object_id.nr_items();
        Ok(indices
            .iter()
            .zip(indices.iter().skip(1).chain(std::iter::once(&total)))
            .map(|(start, end)| end - start)
            .collect())
    }

    /// Return the IDs of the objects active at time step `step`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if `step` is out of bounds.
    pub fn active_object_ids(&self, step: u64) -> Result<Vec<u64>, DataModelError> {
        let start = self.active_set_index(step)?;
        let size = self.active_set_size(step)?;
        Ok(self.active_object_id.read_items(start, size)?)
    }

    /// Return the flattened list of active object IDs across all time steps.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn all_active_object_ids(&self) -> Result<Vec<u64>, DataModelError> {
        Ok(self.active_object_id.read_all()?)
    }

    /// Return the storage offsets of the objects active at time step `step`.
    ///
    /// # Errors
    /// Returns [`ContainerError::DoesNotExist`] wrapped in a
    /// [`DataModelError`] if the tracker records no storage offsets, or a
    /// [`DataModelError`] if `step` is out of bounds.
    pub fn active_object_indices(&self, step: u64) -> Result<Vec<u64>, DataModelError> {
        let array = self.active_object_index.as_ref().ok_or_else(|| {
            DataModelError::Container(ContainerError::DoesNotExist(self.path.clone()))
        })?;
        let start = self.active_set_index(step)?;
        let size = self.active_set_size(step)?;
        Ok(array.read_items(start, size)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn active_set_bookkeeping() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let parent = NodePath::root();
        let mut tracker = ObjectTracker::create(&storage, &parent, false).unwrap();
        tracker.append_time_step(&[5, 9], None).unwrap();
        tracker.append_time_step(&[5], None).unwrap();
        tracker.append_time_step(&[], None).unwrap();
        tracker.append_time_step(&[5, 9, 11], None).unwrap();

        let tracker = ObjectTracker::open(&storage, &parent).unwrap();
        assert_eq!(tracker.nr_time_steps(), 4);
        assert_eq!(tracker.active_set_sizes().unwrap(), vec![2, 1, 0, 3]);
        assert_eq!(tracker.active_set_index(0).unwrap(), 0);
        assert_eq!(tracker.active_set_index(1).unwrap(), 2);
        assert_eq!(tracker.active_set_index(2).unwrap(), 3);
        assert_eq!(tracker.active_set_index(3).unwrap(), 3);
        assert_eq!(tracker.active_object_ids(3).unwrap(), vec![5, 9, 11]);
        assert_eq!(
            tracker.all_active_object_ids().unwrap().len() as u64,
            tracker.active_set_sizes().unwrap().iter().sum::<u64>()
        );
    }

    #[test]
    fn indices_length_must_match() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let mut tracker = ObjectTracker::create(&storage, &NodePath::root(), true).unwrap();
        assert!(tracker.append_time_step(&[5, 9], Some(&[0])).is_err());
        tracker.append_time_step(&[5, 9], Some(&[1, 0])).unwrap();
        assert_eq!(tracker.active_object_indices(0).unwrap(), vec![1, 0]);
    }
}
