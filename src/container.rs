//! Hierarchical container nodes.
//!
//! A node in the container hierarchy is either a [`Group`] or an [`Array`]
//! (a typed, shaped dataset). Both carry user attributes in JSON metadata
//! stored at `<path>/container.json`, making the container self-describing.
//! Array payloads are stored little-endian at `<path>/data`.

mod array;
mod group;
mod node_path;

pub use array::Array;
pub use group::Group;
pub use node_path::{NodePath, NodePathError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data_type::{DataType, UnsupportedDataTypeError},
    storage::{ReadableStorageTraits, StorageError, StoreKey, StorePrefix},
    ArrayShape,
};

/// The name of the metadata document of a node.
pub const METADATA_DOCUMENT: &str = "container.json";

/// A container error.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A node already exists at the path.
    #[error("node {0} already exists")]
    AlreadyExists(NodePath),
    /// No node exists at the path.
    #[error("node {0} does not exist")]
    DoesNotExist(NodePath),
    /// An attribute does not exist.
    #[error("attribute {name} of node {path} does not exist")]
    AttributeDoesNotExist {
        /// The node path.
        path: NodePath,
        /// The attribute name.
        name: String,
    },
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An unsupported data type.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// The element type of a read/write does not match the array data type.
    #[error("data type {got} is incompatible with array {path} of data type {expected}")]
    IncompatibleDataType {
        /// The array path.
        path: NodePath,
        /// The requested data type.
        got: DataType,
        /// The data type of the array.
        expected: DataType,
    },
    /// An item range is out of bounds of an array.
    #[error("items [{start_item}, {start_item}+{nr_items}) are out of bounds of array {path} with shape {shape:?}")]
    OutOfBounds {
        /// The array path.
        path: NodePath,
        /// The first item of the range.
        start_item: u64,
        /// The number of items in the range.
        nr_items: u64,
        /// The shape of the array.
        shape: ArrayShape,
    },
    /// The length of an element buffer is incompatible with the item shape.
    #[error("buffer of {len} elements is incompatible with items of {item_size} elements of array {path}")]
    IncompatibleBufferLength {
        /// The array path.
        path: NodePath,
        /// The length of the buffer.
        len: usize,
        /// The number of elements per item.
        item_size: u64,
    },
    /// Invalid node metadata.
    #[error("invalid metadata of node {path}: {error}")]
    InvalidMetadata {
        /// The node path.
        path: NodePath,
        /// The underlying parse error.
        error: String,
    },
}

/// User attributes of a node.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// The metadata document of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "lowercase")]
pub(crate) enum NodeMetadata {
    /// Group metadata.
    Group {
        /// User attributes.
        #[serde(default)]
        attributes: Attributes,
    },
    /// Array metadata.
    Array {
        /// The shape of the array.
        shape: ArrayShape,
        /// The portable data type of the array.
        data_type: DataType,
        /// User attributes.
        #[serde(default)]
        attributes: Attributes,
    },
}

/// Return the store key of the metadata document of the node at `path`.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    let path = path.as_str().strip_prefix('/').unwrap_or(path.as_str());
    if path.is_empty() {
        unsafe { StoreKey::new_unchecked(METADATA_DOCUMENT) }
    } else {
        unsafe { StoreKey::new_unchecked(format!("{path}/{METADATA_DOCUMENT}")) }
    }
}

/// Return the store key of the data payload of the array at `path`.
#[must_use]
pub fn data_key(path: &NodePath) -> StoreKey {
    let path = path.as_str().strip_prefix('/').unwrap_or(path.as_str());
    if path.is_empty() {
        unsafe { StoreKey::new_unchecked("data") }
    } else {
        unsafe { StoreKey::new_unchecked(format!("{path}/data")) }
    }
}

/// Return the store prefix of the node at `path`.
///
/// # Panics
/// Panics if `path` cannot be converted to a store prefix, which cannot
/// happen for a validated [`NodePath`].
#[must_use]
pub fn node_prefix(path: &NodePath) -> StorePrefix {
    StorePrefix::try_from(path).expect("a valid node path is a valid store prefix")
}

/// Return whether a node (group or array) exists at `path`.
///
/// # Errors
/// Returns a [`ContainerError`] if there is an underlying storage error.
pub fn node_exists<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, ContainerError> {
    Ok(storage.size_key(&meta_key(path))?.is_some())
}

pub(crate) fn read_metadata<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<NodeMetadata, ContainerError> {
    let bytes = storage
        .get(&meta_key(path))?
        .ok_or_else(|| ContainerError::DoesNotExist(path.clone()))?;
    serde_json::from_slice(&bytes).map_err(|err| ContainerError::InvalidMetadata {
        path: path.clone(),
        error: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        let path = NodePath::new("/a/b").unwrap();
        assert_eq!(meta_key(&path).as_str(), "a/b/container.json");
        assert_eq!(data_key(&path).as_str(), "a/b/data");
        assert_eq!(meta_key(&NodePath::root()).as_str(), "container.json");
        assert_eq!(node_prefix(&path).as_str(), "a/b/");
    }
}
