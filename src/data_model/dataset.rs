//! Datasets.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    container::{Attributes, Group, NodePath},
    storage::ReadableWritableListableStorage,
};

use super::{DataModelError, Phenomenon};

const PHENOMENA: &str = "phenomena";

/// The top-level namespace of a container: a name-keyed collection of
/// [`Phenomenon`]s rooted at `/phenomena`.
#[derive(Debug)]
pub struct Dataset {
    storage: ReadableWritableListableStorage,
    phenomena_group: Group,
    phenomena: HashMap<String, Phenomenon>,
}

impl Dataset {
    /// Create a new dataset in `storage`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if a dataset already exists in the
    /// storage or on an underlying container failure.
    pub fn create(storage: &ReadableWritableListableStorage) -> Result<Self, DataModelError> {
        Group::create(storage.clone(), NodePath::root(), Attributes::new())?;
        let phenomena_group = Group::create(
            storage.clone(),
            NodePath::root().join(PHENOMENA)?,
            Attributes::new(),
        )?;
        Ok(Self {
            storage: storage.clone(),
            phenomena_group,
            phenomena: HashMap::new(),
        })
    }

    /// Open the existing dataset in `storage`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if no dataset exists in the storage or on
    /// an underlying container failure.
    pub fn open(storage: &ReadableWritableListableStorage) -> Result<Self, DataModelError> {
        Group::open(storage.clone(), NodePath::root())?;
        let phenomena_group = Group::open(storage.clone(), NodePath::root().join(PHENOMENA)?)?;
        let mut phenomena = HashMap::new();
        for name in phenomena_group.child_names()? {
            let phenomenon =
                Phenomenon::open(storage, phenomena_group.path().join(&name)?)?;
            phenomena.insert(name, phenomenon);
        }
        Ok(Self {
            storage: storage.clone(),
            phenomena_group,
            phenomena,
        })
    }

    /// Add a phenomenon named `name`.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a phenomenon named `name`
    /// exists.
    pub fn add_phenomenon(&mut self, name: &str) -> Result<&mut Phenomenon, DataModelError> {
        if self.phenomena.contains_key(name) {
            return Err(DataModelError::AlreadyExists(format!("phenomenon {name}")));
        }
        let path = self.phenomena_group.path().join(name)?;
        let phenomenon = Phenomenon::create(&self.storage, path)?;
        Ok(self.phenomena.entry(name.to_string()).or_insert(phenomenon))
    }

    /// Return the phenomenon named `name`.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn phenomenon(&self, name: &str) -> Result<&Phenomenon, DataModelError> {
        self.phenomena
            .get(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("phenomenon {name}")))
    }

    /// Return the phenomenon named `name`, for writing.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn phenomenon_mut(&mut self, name: &str) -> Result<&mut Phenomenon, DataModelError> {
        self.phenomena
            .get_mut(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("phenomenon {name}")))
    }

    /// Return the sorted names of all phenomena.
    #[must_use]
    pub fn phenomenon_names(&self) -> Vec<&str> {
        self.phenomena
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
    fn phenomena_registry() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let mut dataset = Dataset::create(&storage).unwrap();
        dataset.add_phenomenon("areas").unwrap();
        dataset.add_phenomenon("outlets").unwrap();
        assert!(matches!(
            dataset.add_phenomenon("areas"),
            Err(DataModelError::AlreadyExists(_))
        ));

        let dataset = Dataset::open(&storage).unwrap();
        assert!(format!("{dataset:?}").contains("Dataset"));
        assert_eq!(dataset.phenomenon_names(), vec!["areas", "outlets"]);
        assert!(dataset.phenomenon("areas").is_ok());
        assert!(matches!(
            dataset.phenomenon("rivers"),
            Err(DataModelError::DoesNotExist(_))
        ));
    }
}
