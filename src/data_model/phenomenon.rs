//! Phenomena.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    container::{Array, Attributes, Group, NodePath},
    data_type::DataType,
    storage::ReadableWritableListableStorage,
};

use super::{property_set::PropertySetBuilder, DataModelError, PropertySet};

const OBJECT_ID: &str = "object_id";
const PROPERTY_SETS: &str = "property_sets";

/// A collection of objects of one kind, plus the property sets describing
/// them.
///
/// The `object_id` array is the phenomenon-wide registry of object IDs: an
/// append-only list of unique `u64`s. Property sets reference these IDs
/// through their object trackers.
#[derive(Debug)]
pub struct Phenomenon {
    storage: ReadableWritableListableStorage,
    group: Group,
    object_id: Array,
    property_sets_group: Group,
    property_sets: HashMap<String, PropertySet>,
}

impl Phenomenon {
    /// Create a new phenomenon at `path`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if a node at `path` already exists or on
    /// an underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::create(storage.clone(), path.clone(), Attributes::new())?;
        let object_id = Array::create(
            storage.clone(),
            path.join(OBJECT_ID)?,
            DataType::UInt64,
            &[],
            Attributes::new(),
        )?;
        let property_sets_group = Group::create(
            storage.clone(),
            path.join(PROPERTY_SETS)?,
            Attributes::new(),
        )?;
        Ok(Self {
            storage: storage.clone(),
            group,
            object_id,
            property_sets_group,
            property_sets: HashMap::new(),
        })
    }

    /// Open the existing phenomenon at `path`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the phenomenon does not exist or on an
    /// underlying container failure.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), path.clone())?;
        let object_id = Array::open(storage.clone(), path.join(OBJECT_ID)?)?;
        let property_sets_group = Group::open(storage.clone(), path.join(PROPERTY_SETS)?)?;
        let mut property_sets = HashMap::new();
        for name in property_sets_group.child_names()? {
            let set = PropertySet::open(storage, property_sets_group.path().join(&name)?)?;
            property_sets.insert(name, set);
        }
        Ok(Self {
            storage: storage.clone(),
            group,
            object_id,
            property_sets_group,
            property_sets,
        })
    }

    /// The path of the phenomenon group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        self.group.path()
    }

    /// The name of the phenomenon.
    #[must_use]
    pub fn name(&self) -> &str {
        self.group.path().name()
    }

    /// Register object IDs.
    ///
    /// IDs are unique within the phenomenon; the caller allocates them.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn add_object_ids(&mut self, ids: &[u64]) -> Result<(), DataModelError> {
        self.object_id.append_items(ids)?;
        Ok(())
    }

    /// The number of registered objects.
    #[must_use]
    pub fn nr_objects(&self) -> u64 {
        self.object_id.nr_items()
    }

    /// Read all registered object IDs.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn object_ids(&self) -> Result<Vec<u64>, DataModelError> {
        Ok(self.object_id.read_all()?)
    }

    /// Add a property set named `name`, configured by `builder`.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property set named
    /// `name` exists.
    pub fn add_property_set(
        &mut self,
        name: &str,
        builder: PropertySetBuilder,
    ) -> Result<&mut PropertySet, DataModelError> {
        if self.property_sets.contains_key(name) {
            return Err(DataModelError::AlreadyExists(format!("property set {name}")));
        }
        let path = self.property_sets_group.path().join(name)?;
        let set = builder.build(&self.storage, path)?;
        Ok(self.property_sets.entry(name.to_string()).or_insert(set))
    }

    /// Return the property set named `name`.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn property_set(&self, name: &str) -> Result<&PropertySet, DataModelError> {
        self.property_sets
            .get(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("property set {name}")))
    }

    /// Return the property set named `name`, for writing.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn property_set_mut(&mut self, name: &str) -> Result<&mut PropertySet, DataModelError> {
        self.property_sets
            .get_mut(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("property set {name}")))
    }

    /// Return the sorted names of all property sets.
    #[must_use]
    pub fn property_set_names(&self) -> Vec<&str> {
        self.property_sets
            .keys()
            .map(String::as_str)
            .sorted_unstable()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn objects_and_property_sets() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let path = NodePath::new("/areas").unwrap();
        let mut phenomenon = Phenomenon::create(&storage, path.clone()).unwrap();
        phenomenon.add_object_ids(&[5, 9]).unwrap();
        phenomenon
            .add_property_set("constant", PropertySetBuilder::new())
            .unwrap();
        assert!(matches!(
            phenomenon.add_property_set("constant", PropertySetBuilder::new()),
            Err(DataModelError::AlreadyExists(_))
        ));

        let phenomenon = Phenomenon::open(&storage, path).unwrap();
        assert_eq!(phenomenon.name(), "areas");
        assert_eq!(phenomenon.nr_objects(), 2);
        assert_eq!(phenomenon.object_ids().unwrap(), vec![5, 9]);
        assert_eq!(phenomenon.property_set_names(), vec!["constant"]);
        assert!(phenomenon.property_set("constant").is_ok());
        assert!(matches!(
            phenomenon.property_set("absent"),
            Err(DataModelError::DoesNotExist(_))
        ));
    }
}
