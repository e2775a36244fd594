//! An in-memory store.

use parking_lot::RwLock;

use crate::storage::{
    ByteOffset, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StorePrefix, StorePrefixes, WritableStorageTraits,
};

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

/// An in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Arc<RwLock<Vec<u8>>>>>,
}

impl MemoryStore {
    /// Create a new, empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_map: Mutex::default(),
        }
    }

    fn set_impl(&self, key: &StoreKey, value: &[u8], offset: Option<ByteOffset>) {
        let mut data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        let data = data_map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(data_map);
        let mut data = data.write();

        let offset = offset.unwrap_or(0);
        if offset == 0 && data.is_empty() {
            // fast path
            *data = value.to_vec();
        } else {
            let length = usize::try_from(offset + value.len() as u64).unwrap();
            if data.len() < length {
                data.resize(length, 0);
            }
            let offset = usize::try_from(offset).unwrap();
            data[offset..offset + value.len()].copy_from_slice(value);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(data) = data_map.get(key) {
            let data = data.clone();
            drop(data_map);
            let data = data.read();
            Ok(Some(data.clone()))
        } else {
            Ok(None)
        }
    }

    fn get_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        length: u64,
    ) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(data) = data_map.get(key) {
            let data = data.clone();
            drop(data_map);
            let data = data.read();
            if offset + length > data.len() as u64 {
                return Err(StorageError::InvalidByteRange {
                    key: key.clone(),
                    offset,
                    length,
                });
            }
            let start = usize::try_from(offset).unwrap();
            let end = usize::try_from(offset + length).unwrap();
            Ok(Some(data[start..end].to_vec()))
        } else {
            Ok(None)
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(data_map.get(key).map(|data| data.read().len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.set_impl(key, value, None);
        Ok(())
    }

    fn set_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        value: &[u8],
    ) -> Result<(), StorageError> {
        self.set_impl(key, value, Some(offset));
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        data_map.remove(key);
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(data_map.keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(data_map
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StorePrefixes, StorageError> {
        let data_map = self.data_map.lock().unwrap_or_else(|e| e.into_inner());
        let mut children: BTreeSet<StorePrefix> = BTreeSet::new();
        for key in data_map.keys() {
            if key.has_prefix(prefix) {
                let rest = &key.as_str()[prefix.as_str().len()..];
                if let Some((child, _)) = rest.split_once('/') {
                    let child = format!("{}{child}/", prefix.as_str());
                    children.insert(unsafe { StorePrefix::new_unchecked(child) });
                }
            }
        }
        Ok(children.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_erase() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b").unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
        store.set(&key, &[1, 2, 3]).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.size_key(&key).unwrap(), Some(3));
        store.erase(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn set_partial_extends() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a").unwrap();
        store.set(&key, &[1, 2]).unwrap();
        store.set_partial(&key, 4, &[5, 6]).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(vec![1, 2, 0, 0, 5, 6]));
        assert_eq!(store.get_partial(&key, 1, 3).unwrap(), Some(vec![2, 0, 0]));
        assert!(store.get_partial(&key, 5, 3).is_err());
    }

    #[test]
    fn list() {
        let store = MemoryStore::new();
        for key in ["a/b/c", "a/b/d", "a/e", "f"] {
            store.set(&StoreKey::new(key).unwrap(), &[0]).unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 4);
        let prefix = StorePrefix::new("a/").unwrap();
        assert_eq!(store.list_prefix(&prefix).unwrap().len(), 3);
        assert_eq!(
            store.list_dir(&prefix).unwrap(),
            vec![StorePrefix::new("a/b/").unwrap()]
        );
        store.erase_prefix(&prefix).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
