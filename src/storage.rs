//! Key-value storage backing the binary container.
//!
//! A [store](store) is a system that can store and retrieve the byte payloads
//! of container nodes: a filesystem, an in-memory map, etc.
//!
//! This module defines abstract store interfaces.
//! Container nodes ([`Group`](crate::container::Group) and
//! [`Array`](crate::container::Array)) are built on top of these interfaces
//! and never touch bytes directly.

mod store_key;
mod store_prefix;
pub mod store;

use std::sync::Arc;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is
/// [`None`] if the key is not available.
pub type MaybeBytes = Option<Vec<u8>>;

/// An offset in bytes into the value of a store key.
pub type ByteOffset = u64;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;

/// [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid store prefix.
    #[error(transparent)]
    InvalidStorePrefix(#[from] StorePrefixError),
    /// An invalid byte range of the value at `key`.
    #[error("invalid byte range [{offset}, {offset}+{length}) for store key {key}")]
    InvalidByteRange {
        /// The key with the out-of-bounds range.
        key: StoreKey,
        /// The start of the range.
        offset: ByteOffset,
        /// The length of the range.
        length: u64,
    },
    /// The store is read only.
    #[error("the store is read only")]
    ReadOnly,
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

/// Readable storage traits.
pub trait ReadableStorageTraits: std::fmt::Debug + Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store key does not exist or there is an underlying error with the store.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Retrieve `length` bytes of the value at `key`, starting at `offset`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the byte range is out-of-bounds of the value or there is an underlying error with the store.
    fn get_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        length: u64,
    ) -> Result<MaybeBytes, StorageError>;

    /// Return the size in bytes of the value at `key`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;
}

/// Writable storage traits.
pub trait WritableStorageTraits: std::fmt::Debug + Send + Sync {
    /// Store bytes at a [`StoreKey`], replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Store bytes at `offset` into the value of a [`StoreKey`].
    ///
    /// The value is created or zero-extended as needed.
    /// This supports append-only dataset growth.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        value: &[u8],
    ) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`].
    ///
    /// Succeeds if the key does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<(), StorageError>;

    /// Erase all [`StoreKey`]s under `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError>;
}

/// Listable storage traits.
pub trait ListableStorageTraits: std::fmt::Debug + Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list(&self) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] with a given [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the prefix is not a directory or there is an underlying error with the store.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// Retrieve the child prefixes (direct children only) of a [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StorePrefixes, StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`], [`WritableStorageTraits`], and [`ListableStorageTraits`].
pub trait ReadableWritableListableStorageTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

impl<T> ReadableWritableListableStorageTraits for T where
    T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

/// Return whether a key exists.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn key_exists<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    key: &StoreKey,
) -> Result<bool, StorageError> {
    Ok(storage.size_key(key)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::store::MemoryStore;
    use super::*;

    #[test]
    fn trait_objects_are_debug() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        assert!(format!("{storage:?}").contains("MemoryStore"));
    }

    #[test]
    fn key_existence() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b").unwrap();
        assert!(!key_exists(&store, &key).unwrap());
        store.set(&key, &[0u8]).unwrap();
        assert!(key_exists(&store, &key).unwrap());
    }
}
