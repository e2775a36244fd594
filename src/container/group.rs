//! Container groups.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::{ReadableWritableListableStorage, StoreKeyError};

use super::{
    meta_key, node_exists, node_prefix, read_metadata, Attributes, ContainerError, NodeMetadata,
    NodePath,
};

/// A container group: a named hierarchical node holding attributes and child
/// nodes.
#[derive(Debug)]
pub struct Group {
    storage: ReadableWritableListableStorage,
    path: NodePath,
    attributes: RwLock<Attributes>,
}

impl Group {
    /// Create a new group at `path`.
    ///
    /// # Errors
    /// Returns [`ContainerError::AlreadyExists`] if a node already exists at
    /// `path`, or a [`ContainerError`] on an underlying storage failure.
    pub fn create(
        storage: ReadableWritableListableStorage,
        path: NodePath,
        attributes: Attributes,
    ) -> Result<Self, ContainerError> {
        if node_exists(&*storage, &path)? {
            return Err(ContainerError::AlreadyExists(path));
        }
        let group = Self {
            storage,
            path,
            attributes: RwLock::new(attributes),
        };
        group.store_metadata()?;
        Ok(group)
    }

    /// Open the existing group at `path`.
    ///
    /// # Errors
    /// Returns [`ContainerError::DoesNotExist`] if there is no node at
    /// `path`, or [`ContainerError::InvalidMetadata`] if the node is not a
    /// group.
    pub fn open(
        storage: ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<Self, ContainerError> {
        match read_metadata(&*storage, &path)? {
            NodeMetadata::Group { attributes } => Ok(Self {
                storage,
                path,
                attributes: RwLock::new(attributes),
            }),
            NodeMetadata::Array { .. } => Err(ContainerError::InvalidMetadata {
                path,
                error: "expected a group, found an array".to_string(),
            }),
        }
    }

    /// The path of the group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The storage backing the group.
    #[must_use]
    pub fn storage(&self) -> &ReadableWritableListableStorage {
        &self.storage
    }

    /// Return a clone of the group attributes.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        self.attributes.read().clone()
    }

    /// Return the attribute `name`, deserialized as `T`.
    ///
    /// # Errors
    /// Returns [`ContainerError::AttributeDoesNotExist`] if the attribute is
    /// absent, or [`ContainerError::InvalidMetadata`] if it cannot be
    /// deserialized as `T`.
    pub fn attribute<T: DeserializeOwned>(&self, name: &str) -> Result<T, ContainerError> {
        let attributes = self.attributes.read();
        let value =
            attributes
                .get(name)
                .ok_or_else(|| ContainerError::AttributeDoesNotExist {
                    path: self.path.clone(),
                    name: name.to_string(),
                })?;
        serde_json::from_value(value.clone()).map_err(|err| ContainerError::InvalidMetadata {
            path: self.path.clone(),
            error: err.to_string(),
        })
    }

    /// Return whether the attribute `name` exists.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.read().contains_key(name)
    }

    /// Set the attribute `name` to `value` and persist the group metadata.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if `value` cannot be serialized or the
    /// metadata cannot be stored.
    pub fn set_attribute<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ContainerError> {
        let value =
            serde_json::to_value(value).map_err(|err| ContainerError::InvalidMetadata {
                path: self.path.clone(),
                error: err.to_string(),
            })?;
        self.attributes.write().insert(name.to_string(), value);
        self.store_metadata()
    }

    /// Return the names of the direct child nodes, sorted.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if there is an underlying storage error.
    pub fn child_names(&self) -> Result<Vec<String>, ContainerError> {
        let prefix = node_prefix(&self.path);
        let children = self.storage.list_dir(&prefix)?;
        children
            .into_iter()
            .map(|child| {
                let name = child.as_str()[prefix.as_str().len()..]
                    .trim_end_matches('/')
                    .to_string();
                if name.is_empty() {
                    Err(ContainerError::StorageError(
                        StoreKeyError::from(child.as_str().to_string()).into(),
                    ))
                } else {
                    Ok(name)
                }
            })
            .collect()
    }

    fn store_metadata(&self) -> Result<(), ContainerError> {
        let metadata = NodeMetadata::Group {
            attributes: self.attributes.read().clone(),
        };
        let bytes = serde_json::to_vec_pretty(&metadata).map_err(|err| {
            ContainerError::InvalidMetadata {
                path: self.path.clone(),
                error: err.to_string(),
            }
        })?;
        tracing::trace!(path = %self.path, "store group metadata");
        self.storage.set(&meta_key(&self.path), &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn create_open() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let path = NodePath::new("/a").unwrap();
        let group = Group::create(storage.clone(), path.clone(), Attributes::new()).unwrap();
        group.set_attribute("answer", &42u64).unwrap();
        assert!(Group::create(storage.clone(), path.clone(), Attributes::new()).is_err());

        let group = Group::open(storage.clone(), path.clone()).unwrap();
        assert_eq!(group.attribute::<u64>("answer").unwrap(), 42);
        assert!(group.attribute::<u64>("question").is_err());
        assert!(!group.has_attribute("question"));

        Group::create(storage.clone(), path.join("b").unwrap(), Attributes::new()).unwrap();
        Group::create(storage.clone(), path.join("c").unwrap(), Attributes::new()).unwrap();
        assert_eq!(group.child_names().unwrap(), vec!["b", "c"]);
    }
}
