//! Value collections where each object's value may have a distinct shape.
//!
//! No single stride fits all objects, so the value group holds one
//! sub-dataset per object, named by the decimal object index.

use crate::{
    container::{node_exists, Array, Attributes, Group, NodePath},
    data_model::DataModelError,
    data_type::{DataType, Element},
    storage::ReadableWritableListableStorage,
    ArrayShape,
};

use super::{sorted_indices, VALUE};

/// A different-shape, constant value collection.
///
/// A group with one array per object, each with its own shape, fixed for the
/// object's lifetime. Addressed by object index.
#[derive(Debug)]
pub struct Value {
    storage: ReadableWritableListableStorage,
    group: Group,
    data_type: DataType,
    rank: u64,
}

impl Value {
    /// Create the value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
        data_type: DataType,
        rank: u64,
    ) -> Result<Self, DataModelError> {
        let group = Group::create(storage.clone(), property.join(VALUE)?, Attributes::new())?;
        group.set_attribute("data_type", &data_type)?;
        group.set_attribute("rank", &rank)?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// Open the existing value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection does not exist.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), property.join(VALUE)?)?;
        let data_type: DataType = group.attribute("data_type")?;
        let rank: u64 = group.attribute("rank")?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The number of dimensions of one object's value.
    #[must_use]
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Add the value of the object at index `object_idx`.
    ///
    /// # Panics
    /// Panics if the length of `value_shape` does not equal the rank of the
    /// collection.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object already has a value, the
    /// buffer length does not match `value_shape`, or the element type is
    /// incompatible.
    pub fn add_object<T: Element>(
        &mut self,
        object_idx: u64,
        value_shape: &[u64],
        elements: &[T],
    ) -> Result<(), DataModelError> {
        assert_eq!(value_shape.len() as u64, self.rank);
        let nr_elements: u64 = value_shape.iter().product();
        if elements.len() as u64 != nr_elements {
            return Err(DataModelError::MismatchedLength {
                expected: nr_elements,
                got: elements.len() as u64,
            });
        }
        let array = Array::create(
            self.storage.clone(),
            self.group.path().join(&object_idx.to_string())?,
            self.data_type,
            value_shape,
            Attributes::new(),
        )?;
        array.append_items(elements)?;
        Ok(())
    }

    /// Read the value of the object at index `object_idx`.
    ///
    /// Returns the object's value shape and its flattened elements.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object has no value.
    pub fn read_object<T: Element>(
        &self,
        object_idx: u64,
    ) -> Result<(ArrayShape, Vec<T>), DataModelError> {
        let array = self.object_array(object_idx)?;
        let elements = array.read_all()?;
        Ok((array.item_shape(), elements))
    }

    /// Return the value shape of the object at index `object_idx`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object has no value.
    pub fn value_shape(&self, object_idx: u64) -> Result<ArrayShape, DataModelError> {
        Ok(self.object_array(object_idx)?.item_shape())
    }

    /// Return whether the object at index `object_idx` has a value.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn contains_object(&self, object_idx: u64) -> Result<bool, DataModelError> {
        Ok(node_exists(
            &*self.storage,
            &self.group.path().join(&object_idx.to_string())?,
        )?)
    }

    /// Return the sorted indices of the objects with a value.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn object_indices(&self) -> Result<Vec<u64>, DataModelError> {
        Ok(sorted_indices(self.group.child_names()?))
    }

    fn object_array(&self, object_idx: u64) -> Result<Array, DataModelError> {
        Ok(Array::open(
            self.storage.clone(),
            self.group.path().join(&object_idx.to_string())?,
        )?)
    }
}

/// A different-shape, variable value collection whose shape is constant
/// through time.
///
/// A group with one array per object of shape
/// `[nr_time_cells, ...object_shape]`: the object's shape is fixed through
/// time while its value varies. Addressed by object index + time-cell range.
#[derive(Debug)]
pub struct ConstantShapeValue {
    storage: ReadableWritableListableStorage,
    group: Group,
    data_type: DataType,
    rank: u64,
}

impl ConstantShapeValue {
    /// Create the value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
        data_type: DataType,
        rank: u64,
    ) -> Result<Self, DataModelError> {
        let group = Group::create(storage.clone(), property.join(VALUE)?, Attributes::new())?;
        group.set_attribute("data_type", &data_type)?;
        group.set_attribute("rank", &rank)?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// Open the existing value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection does not exist.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), property.join(VALUE)?)?;
        let data_type: DataType = group.attribute("data_type")?;
        let rank: u64 = group.attribute("rank")?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The number of dimensions of one object's value.
    #[must_use]
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Add the object at index `object_idx` with its fixed `value_shape`.
    ///
    /// No time cells are stored yet.
    ///
    /// # Panics
    /// Panics if the length of `value_shape` does not equal the rank of the
    /// collection.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object already exists.
    pub fn add_object(
        &mut self,
        object_idx: u64,
        value_shape: &[u64],
    ) -> Result<(), DataModelError> {
        assert_eq!(value_shape.len() as u64, self.rank);
        Array::create(
            self.storage.clone(),
            self.group.path().join(&object_idx.to_string())?,
            self.data_type,
            value_shape,
            Attributes::new(),
        )?;
        Ok(())
    }

    /// Append the values of one or more time cells of the object at index
    /// `object_idx`.
    ///
    /// Returns the cell offset of the first appended cell.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object does not exist or the
    /// element type or buffer length is incompatible.
    pub fn append_time_cells<T: Element>(
        &mut self,
        object_idx: u64,
        elements: &[T],
    ) -> Result<u64, DataModelError> {
        Ok(self.object_array(object_idx)?.append_items(elements)?)
    }

    /// Read `nr_cells` time cells of the object at index `object_idx`,
    /// starting at cell `start_cell`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object does not exist or the cell
    /// range is out of bounds.
    pub fn read_time_cells<T: Element>(
        &self,
        object_idx: u64,
        start_cell: u64,
        nr_cells: u64,
    ) -> Result<Vec<T>, DataModelError> {
        Ok(self
            .object_array(object_idx)?
            .read_items(start_cell, nr_cells)?)
    }

    /// Return the number of stored time cells of the object at index
    /// `object_idx`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object does not exist.
    pub fn nr_time_cells(&self, object_idx: u64) -> Result<u64, DataModelError> {
        Ok(self.object_array(object_idx)?.nr_items())
    }

    /// Return the fixed value shape of the object at index `object_idx`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the object does not exist.
    pub fn value_shape(&self, object_idx: u64) -> Result<ArrayShape, DataModelError> {
        Ok(self.object_array(object_idx)?.item_shape())
    }

    /// Return the sorted indices of the stored objects.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn object_indices(&self) -> Result<Vec<u64>, DataModelError> {
        Ok(sorted_indices(self.group.child_names()?))
    }

    fn object_array(&self, object_idx: u64) -> Result<Array, DataModelError> {
        Ok(Array::open(
            self.storage.clone(),
            self.group.path().join(&object_idx.to_string())?,
        )?)
    }
}

/// A different-shape, variable value collection whose shape varies through
/// time.
///
/// A group with one sub-group per object, each containing one array per time
/// step. Addressed by object index + time index.
#[derive(Debug)]
pub struct VariableShapeValue {
    storage: ReadableWritableListableStorage,
    group: Group,
    data_type: DataType,
    rank: u64,
}

impl VariableShapeValue {
    /// Create the value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
        data_type: DataType,
        rank: u64,
    ) -> Result<Self, DataModelError> {
        let group = Group::create(storage.clone(), property.join(VALUE)?, Attributes::new())?;
        group.set_attribute("data_type", &data_type)?;
        group.set_attribute("rank", &rank)?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// Open the existing value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection does not exist.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), property.join(VALUE)?)?;
        let data_type: DataType = group.attribute("data_type")?;
        let rank: u64 = group.attribute("rank")?;
        Ok(Self {
            storage: storage.clone(),
            group,
            data_type,
            rank,
        })
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The number of dimensions of one value.
    #[must_use]
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Add the value of the object at index `object_idx` for time step
    /// `step`.
    ///
    /// # Panics
    /// Panics if the length of `value_shape` does not equal the rank of the
    /// collection.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the value already exists or the buffer
    /// length does not match `value_shape`.
    pub fn add_value<T: Element>(
        &mut self,
        object_idx: u64,
        step: u64,
        value_shape: &[u64],
        elements: &[T],
    ) -> Result<(), DataModelError> {
        assert_eq!(value_shape.len() as u64, self.rank);
        let nr_elements: u64 = value_shape.iter().product();
        if elements.len() as u64 != nr_elements {
            return Err(DataModelError::MismatchedLength {
                expected: nr_elements,
                got: elements.len() as u64,
            });
        }
        let object_path = self.group.path().join(&object_idx.to_string())?;
        if !node_exists(&*self.storage, &object_path)? {
            Group::create(self.storage.clone(), object_path.clone(), Attributes::new())?;
        }
        let array = Array::create(
            self.storage.clone(),
            object_path.join(&step.to_string())?,
            self.data_type,
            value_shape,
            Attributes::new(),
        )?;
        array.append_items(elements)?;
        Ok(())
    }

    /// Read the value of the object at index `object_idx` for time step
    /// `step`.
    ///
    /// Returns the value shape and the flattened elements.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the value does not exist.
    pub fn read_value<T: Element>(
        &self,
        object_idx: u64,
        step: u64,
    ) -> Result<(ArrayShape, Vec<T>), DataModelError> {
        let array = Array::open(
            self.storage.clone(),
            self.group
                .path()
                .join(&object_idx.to_string())?
                .join(&step.to_string())?,
        )?;
        let elements = array.read_all()?;
        Ok((array.item_shape(), elements))
    }

    /// Return whether a value exists for the object at index `object_idx`
    /// and time step `step`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn contains(&self, object_idx: u64, step: u64) -> Result<bool, DataModelError> {
        Ok(node_exists(
            &*self.storage,
            &self
                .group
                .path()
                .join(&object_idx.to_string())?
                .join(&step.to_string())?,
        )?)
    }

    /// Return the sorted indices of the stored objects.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn object_indices(&self) -> Result<Vec<u64>, DataModelError> {
        Ok(sorted_indices(self.group.child_names()?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    fn property(storage: &ReadableWritableListableStorage) -> NodePath {
        let path = NodePath::new("/p").unwrap();
        Group::create(storage.clone(), path.clone(), Attributes::new()).unwrap();
        path
    }

    #[test]
    fn per_object_shapes() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let property = property(&storage);
        let mut value = Value::create(&storage, &property, DataType::Float64, 2).unwrap();
        value
            .add_object(5, &[2, 3], &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        value.add_object(9, &[1, 2], &[7.0f64, 8.0]).unwrap();
        assert!(value.add_object(9, &[1, 1], &[0.0f64]).is_err());
        assert!(value.add_object(11, &[2, 2], &[0.0f64]).is_err());

        let value = Value::open(&storage, &property).unwrap();
        assert_eq!(value.object_indices().unwrap(), vec![5, 9]);
        assert!(value.contains_object(5).unwrap());
        assert!(!value.contains_object(11).unwrap());
        let (shape, elements) = value.read_object::<f64>(5).unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(elements, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(value.value_shape(9).unwrap(), vec![1, 2]);
    }

    #[test]
    fn per_object_time_cells() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let property = property(&storage);
        let mut value =
            ConstantShapeValue::create(&storage, &property, DataType::Int32, 1).unwrap();
        value.add_object(5, &[2]).unwrap();
        assert_eq!(value.append_time_cells(5, &[1i32, 2]).unwrap(), 0);
        assert_eq!(value.append_time_cells(5, &[3i32, 4, 5, 6]).unwrap(), 1);

        let value = ConstantShapeValue::open(&storage, &property).unwrap();
        assert_eq!(value.nr_time_cells(5).unwrap(), 3);
        assert_eq!(value.value_shape(5).unwrap(), vec![2]);
        assert_eq!(value.read_time_cells::<i32>(5, 1, 2).unwrap(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn per_object_per_step() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let property = property(&storage);
        let mut value =
            VariableShapeValue::create(&storage, &property, DataType::UInt8, 1).unwrap();
        value.add_value(5, 0, &[2], &[1u8, 2]).unwrap();
        value.add_value(5, 1, &[3], &[3u8, 4, 5]).unwrap();
        value.add_value(9, 1, &[1], &[6u8]).unwrap();

        let value = VariableShapeValue::open(&storage, &property).unwrap();
        assert_eq!(value.object_indices().unwrap(), vec![5, 9]);
        assert!(value.contains(5, 1).unwrap());
        assert!(!value.contains(9, 0).unwrap());
        let (shape, elements) = value.read_value::<u8>(5, 1).unwrap();
        assert_eq!(shape, vec![3]);
        assert_eq!(elements, vec![3, 4, 5]);
    }
}
