//! A filesystem store.
//!
//! Each [`StoreKey`] maps to one file below a base directory; store prefixes
//! map to directories.

use parking_lot::RwLock;
use thiserror::Error;
use walkdir::WalkDir;

use crate::storage::{
    ByteOffset, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StorePrefix, StorePrefixes, WritableStorageTraits,
};

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

/// A filesystem store.
#[derive(Debug)]
pub struct FilesystemStore {
    base_directory: PathBuf,
    files: RwLock<HashMap<StoreKey, Mutex<()>>>,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The base directory is an existing file.
    #[error("base directory {0} is an existing file")]
    ExistingFile(PathBuf),
}

impl FilesystemStore {
    /// Create a new filesystem store at `base_directory`.
    ///
    /// The base directory is created if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory` points to
    /// an existing file or cannot be created.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_directory = base_directory.as_ref().to_path_buf();
        if base_directory.is_file() {
            return Err(FilesystemStoreCreateError::ExistingFile(base_directory));
        }
        std::fs::create_dir_all(&base_directory)?;
        Ok(Self {
            base_directory,
            files: RwLock::default(),
        })
    }

    fn key_to_path(&self, key: &StoreKey) -> PathBuf {
        self.base_directory.join(key.as_str())
    }

    fn prefix_to_path(&self, prefix: &StorePrefix) -> PathBuf {
        self.base_directory.join(prefix.as_str())
    }

    /// Serialise writers of the same key, so partial writes do not interleave.
    fn with_file_lock<T>(
        &self,
        key: &StoreKey,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut files = self.files.write();
        files.entry(key.clone()).or_default();
        drop(files);
        let files = self.files.read();
        let mutex = files.get(key).expect("inserted above");
        let _guard = mutex.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    fn set_impl(
        &self,
        key: &StoreKey,
        value: &[u8],
        offset: Option<ByteOffset>,
        truncate: bool,
    ) -> Result<(), StorageError> {
        let path = self.key_to_path(key);
        self.with_file_lock(key, || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(truncate)
                .open(&path)?;
            if let Some(offset) = offset {
                file.seek(SeekFrom::Start(offset))?;
            }
            file.write_all(value)?;
            Ok(())
        })
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let path = self.key_to_path(key);
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn get_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        length: u64,
    ) -> Result<MaybeBytes, StorageError> {
        let path = self.key_to_path(key);
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let size = file.metadata()?.len();
        if offset + length > size {
            return Err(StorageError::InvalidByteRange {
                key: key.clone(),
                offset,
                length,
            });
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; usize::try_from(length).unwrap()];
        file.read_exact(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let path = self.key_to_path(key);
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.set_impl(key, value, None, true)
    }

    fn set_partial(
        &self,
        key: &StoreKey,
        offset: ByteOffset,
        value: &[u8],
    ) -> Result<(), StorageError> {
        self.set_impl(key, value, Some(offset), false)
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let path = self.key_to_path(key);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let path = self.prefix_to_path(prefix);
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.list_prefix(&StorePrefix::root())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let path = self.prefix_to_path(prefix);
        if !path.exists() {
            return Ok(vec![]);
        }
        let mut keys = StoreKeys::new();
        for entry in WalkDir::new(&path).sort_by_file_name() {
            let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&self.base_directory)
                    .map_err(|err| StorageError::Other(err.to_string()))?;
                let key = relative.to_string_lossy().replace('\\', "/");
                keys.push(StoreKey::new(key)?);
            }
        }
        Ok(keys)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StorePrefixes, StorageError> {
        let path = self.prefix_to_path(prefix);
        if !path.exists() {
            return Ok(vec![]);
        }
        let mut prefixes = StorePrefixes::new();
        let mut entries: Vec<_> =
            std::fs::read_dir(&path)?.collect::<Result<_, std::io::Error>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);
        for entry in entries {
            if entry.file_type()?.is_dir() {
                let child = format!(
                    "{}{}/",
                    prefix.as_str(),
                    entry.file_name().to_string_lossy()
                );
                prefixes.push(StorePrefix::new(child)?);
            }
        }
        Ok(prefixes)
    }
}
