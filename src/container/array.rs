//! Container arrays (typed, shaped datasets).

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    data_type::{elements_from_le_bytes, elements_to_le_bytes, DataType, Element},
    storage::ReadableWritableListableStorage,
    ArrayShape,
};

use super::{
    data_key, meta_key, node_exists, read_metadata, Attributes, ContainerError, NodeMetadata,
    NodePath,
};

/// A container array: a named hierarchical node holding a typed,
/// multidimensional array payload and attributes.
///
/// The first axis is the *item* axis: an item is one slice of the remaining
/// axes. Arrays grow append-only along the item axis, which is how the data
/// model realises its append-only datasets (object IDs, tracker arrays,
/// property values). The payload is stored contiguously in row-major order
/// with the portable little-endian representation of [`DataType`].
#[derive(Debug)]
pub struct Array {
    storage: ReadableWritableListableStorage,
    path: NodePath,
    shape: RwLock<ArrayShape>,
    data_type: DataType,
    attributes: RwLock<Attributes>,
}

impl Array {
    /// Create a new array at `path` with `item_shape` and zero items.
    ///
    /// # Errors
    /// Returns [`ContainerError::AlreadyExists`] if a node already exists at
    /// `path`, or a [`ContainerError`] on an underlying storage failure.
    pub fn create(
        storage: ReadableWritableListableStorage,
        path: NodePath,
        data_type: DataType,
        item_shape: &[u64],
        attributes: Attributes,
    ) -> Result<Self, ContainerError> {
        if node_exists(&*storage, &path)? {
            return Err(ContainerError::AlreadyExists(path));
        }
        let mut shape = Vec::with_capacity(1 + item_shape.len());
        shape.push(0);
        shape.extend_from_slice(item_shape);
        let array = Self {
            storage,
            path,
            shape: RwLock::new(shape),
            data_type,
            attributes: RwLock::new(attributes),
        };
        array.store_metadata()?;
        Ok(array)
    }

    /// Open the existing array at `path`.
    ///
    /// # Errors
    /// Returns [`ContainerError::DoesNotExist`] if there is no node at
    /// `path`, or [`ContainerError::InvalidMetadata`] if the node is not an
    /// array.
    pub fn open(
        storage: ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<Self, ContainerError> {
        match read_metadata(&*storage, &path)? {
            NodeMetadata::Array {
                shape,
                data_type,
                attributes,
            } => Ok(Self {
                storage,
                path,
                shape: RwLock::new(shape),
                data_type,
                attributes: RwLock::new(attributes),
            }),
            NodeMetadata::Group { .. } => Err(ContainerError::InvalidMetadata {
                path,
                error: "expected an array, found a group".to_string(),
            }),
        }
    }

    /// The path of the array.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The data type of the array.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return a clone of the array shape.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.shape.read().clone()
    }

    /// The number of items (the extent of the first axis).
    #[must_use]
    pub fn nr_items(&self) -> u64 {
        self.shape.read()[0]
    }

    /// The shape of one item (the extents of the remaining axes).
    #[must_use]
    pub fn item_shape(&self) -> ArrayShape {
        self.shape.read()[1..].to_vec()
    }

    /// The number of elements in one item.
    #[must_use]
    pub fn item_size(&self) -> u64 {
        self.shape.read()[1..].iter().product()
    }

    /// Append `elements` as whole items and return the item offset of the
    /// first appended item.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the element type does not match the
    /// array data type, the buffer length is not a whole number of items, or
    /// there is an underlying storage failure.
    pub fn append_items<T: Element>(&self, elements: &[T]) -> Result<u64, ContainerError> {
        self.check_data_type::<T>()?;
        let item_size = self.item_size();
        if item_size == 0 || elements.len() as u64 % item_size != 0 {
            return Err(ContainerError::IncompatibleBufferLength {
                path: self.path.clone(),
                len: elements.len(),
                item_size,
            });
        }
        let nr_items = elements.len() as u64 / item_size;
        let mut shape = self.shape.write();
        let start_item = shape[0];
        let byte_offset = start_item * item_size * self.data_type.size() as u64;
        self.storage.set_partial(
            &data_key(&self.path),
            byte_offset,
            &elements_to_le_bytes(elements),
        )?;
        shape[0] = start_item + nr_items;
        drop(shape);
        self.store_metadata()?;
        Ok(start_item)
    }

    /// Overwrite `elements` as whole items starting at item `start_item`.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the element type does not match the
    /// array data type, the item range is out of bounds, or there is an
    /// underlying storage failure.
    pub fn write_items<T: Element>(
        &self,
        start_item: u64,
        elements: &[T],
    ) -> Result<(), ContainerError> {
        self.check_data_type::<T>()?;
        let item_size = self.item_size();
        if item_size == 0 || elements.len() as u64 % item_size != 0 {
            return Err(ContainerError::IncompatibleBufferLength {
                path: self.path.clone(),
                len: elements.len(),
                item_size,
            });
        }
        let nr_items = elements.len() as u64 / item_size;
        self.check_bounds(start_item, nr_items)?;
        let byte_offset = start_item * item_size * self.data_type.size() as u64;
        self.storage.set_partial(
            &data_key(&self.path),
            byte_offset,
            &elements_to_le_bytes(elements),
        )?;
        Ok(())
    }

    /// Read `nr_items` whole items starting at item `start_item`.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the element type does not match the
    /// array data type, the item range is out of bounds, or there is an
    /// underlying storage failure.
    pub fn read_items<T: Element>(
        &self,
        start_item: u64,
        nr_items: u64,
    ) -> Result<Vec<T>, ContainerError> {
        self.check_data_type::<T>()?;
        self.check_bounds(start_item, nr_items)?;
        if nr_items == 0 {
            return Ok(vec![]);
        }
        let item_size = self.item_size();
        let element_size = self.data_type.size() as u64;
        let byte_offset = start_item * item_size * element_size;
        let byte_length = nr_items * item_size * element_size;
        let bytes = self
            .storage
            .get_partial(&data_key(&self.path), byte_offset, byte_length)?
            .ok_or_else(|| ContainerError::DoesNotExist(self.path.clone()))?;
        Ok(elements_from_le_bytes(&bytes))
    }

    /// Read all items of the array.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the element type does not match the
    /// array data type or there is an underlying storage failure.
    pub fn read_all<T: Element>(&self) -> Result<Vec<T>, ContainerError> {
        self.read_items(0, self.nr_items())
    }

    /// Return a clone of the array attributes.
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

    /// Set the attribute `name` to `value` and persist the array metadata.
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

    fn check_data_type<T: Element>(&self) -> Result<(), ContainerError> {
        if T::DATA_TYPE == self.data_type {
            Ok(())
        } else {
            Err(ContainerError::IncompatibleDataType {
                path: self.path.clone(),
                got: T::DATA_TYPE,
                expected: self.data_type,
            })
        }
    }

    fn check_bounds(&self, start_item: u64, nr_items: u64) -> Result<(), ContainerError> {
        let shape = self.shape.read();
        if start_item + nr_items <= shape[0] {
            Ok(())
        } else {
            Err(ContainerError::OutOfBounds {
                path: self.path.clone(),
                start_item,
                nr_items,
                shape: shape.clone(),
            })
        }
    }

    fn store_metadata(&self) -> Result<(), ContainerError> {
        let metadata = NodeMetadata::Array {
            shape: self.shape.read().clone(),
            data_type: self.data_type,
            attributes: self.attributes.read().clone(),
        };
        let bytes = serde_json::to_vec_pretty(&metadata).map_err(|err| {
            ContainerError::InvalidMetadata {
                path: self.path.clone(),
                error: err.to_string(),
            }
        })?;
        tracing::trace!(path = %self.path, "store array metadata");
        self.storage.set(&meta_key(&self.path), &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    fn new_storage() -> ReadableWritableListableStorage {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn append_read_round_trip() {
        let storage = new_storage();
        let path = NodePath::new("/values").unwrap();
        let array = Array::create(
            storage.clone(),
            path.clone(),
            DataType::Float64,
            &[3],
            Attributes::new(),
        )
        .unwrap();
        assert_eq!(array.nr_items(), 0);
        assert_eq!(array.item_size(), 3);

        let start = array.append_items(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(start, 0);
        let start = array.append_items(&[7.0f64, 8.0, 9.0]).unwrap();
        assert_eq!(start, 2);

        let array = Array::open(storage, path).unwrap();
        assert_eq!(array.shape(), vec![3, 3]);
        assert_eq!(array.data_type(), DataType::Float64);
        assert_eq!(array.read_items::<f64>(1, 1).unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(
            array.read_all::<f64>().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert!(array.read_items::<f64>(2, 2).is_err());
        assert!(array.read_items::<f32>(0, 1).is_err());
        assert!(array.append_items(&[1.0f64, 2.0]).is_err());
    }

    #[test]
    fn write_items_overwrites() {
        let storage = new_storage();
        let array = Array::create(
            storage,
            NodePath::new("/ids").unwrap(),
            DataType::UInt64,
            &[],
            Attributes::new(),
        )
        .unwrap();
        array.append_items(&[1u64, 2, 3]).unwrap();
        array.write_items(1, &[9u64]).unwrap();
        assert_eq!(array.read_all::<u64>().unwrap(), vec![1, 9, 3]);
        assert!(array.write_items(3, &[0u64]).is_err());
    }
}
