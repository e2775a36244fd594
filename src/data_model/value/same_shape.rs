//! Value collections where every object's value has an identical shape.
//!
//! One contiguous dataset suffices: the value of the `i`-th item starts at an
//! implicit stride of `i * product(value_shape)` elements.

use crate::{
    container::{Array, Attributes, Group, NodePath},
    data_model::DataModelError,
    data_type::{DataType, Element},
    storage::ReadableWritableListableStorage,
    ArrayShape,
};

use super::VALUE;

/// A same-shape, constant value collection.
///
/// One array of shape `[nr_objects, ...value_shape]`; one item per object,
/// fixed for the object's lifetime. Addressed by object index.
#[derive(Debug)]
pub struct Value {
    array: Array,
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
        value_shape: &[u64],
    ) -> Result<Self, DataModelError> {
        let array = Array::create(
            storage.clone(),
            property.join(VALUE)?,
            data_type,
            value_shape,
            Attributes::new(),
        )?;
        Ok(Self { array })
    }

    /// Open the existing value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection does not exist.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
    ) -> Result<Self, DataModelError> {
        let array = Array::open(storage.clone(), property.join(VALUE)?)?;
        Ok(Self { array })
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.array.data_type()
    }

    /// The shape of one object's value.
    #[must_use]
    pub fn value_shape(&self) -> ArrayShape {
        self.array.item_shape()
    }

    /// The number of stored items (one per object).
    #[must_use]
    pub fn nr_items(&self) -> u64 {
        self.array.nr_items()
    }

    /// Append one value per object, in object storage order.
    ///
    /// Returns the item offset of the first appended value.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the element type or buffer length is
    /// incompatible, or on an underlying container failure.
    pub fn append<T: Element>(&mut self, elements: &[T]) -> Result<u64, DataModelError> {
        Ok(self.array.append_items(elements)?)
    }

    /// Read the values of `nr_items` objects starting at item `start_item`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the item range is out of bounds.
    pub fn read<T: Element>(&self, start_item: u64, nr_items: u64) -> Result<Vec<T>, DataModelError> {
        Ok(self.array.read_items(start_item, nr_items)?)
    }

    /// Read the value of the object at item `item`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if `item` is out of bounds.
    pub fn read_object<T: Element>(&self, item: u64) -> Result<Vec<T>, DataModelError> {
        self.read(item, 1)
    }
}

/// A same-shape, variable value collection whose shape is constant through
/// time.
///
/// One array of shape `[nr_items, ...value_shape]` where one item is appended
/// per active object per time step; the item offset of a time step comes from
/// the object tracker. Addressed by item index/range.
#[derive(Debug)]
pub struct ConstantShapeValue {
    array: Array,
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
        value_shape: &[u64],
    ) -> Result<Self, DataModelError> {
        let array = Array::create(
            storage.clone(),
            property.join(VALUE)?,
            data_type,
            value_shape,
            Attributes::new(),
        )?;
        Ok(Self { array })
    }

    /// Open the existing value collection of the property at `property`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the collection does not exist.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        property: &NodePath,
    ) -> Result<Self, DataModelError> {
        let array = Array::open(storage.clone(), property.join(VALUE)?)?;
        Ok(Self { array })
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.array.data_type()
    }

    /// The shape of one value.
    #[must_use]
    pub fn value_shape(&self) -> ArrayShape {
        self.array.item_shape()
    }

    /// The number of stored items (active objects summed over time steps).
    #[must_use]
    pub fn nr_items(&self) -> u64 {
        self.array.nr_items()
    }

    /// Append the values of one time step's active set, in active-set order.
    ///
    /// Returns the item offset of the first appended value, which equals the
    /// tracker's active-set index of the step when steps are appended in
    /// lockstep.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the element type or buffer length is
    /// incompatible, or on an underlying container failure.
    pub fn append<T: Element>(&mut self, elements: &[T]) -> Result<u64, DataModelError> {
        Ok(self.array.append_items(elements)?)
    }

    /// Read `nr_items` values starting at item `start_item`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the item range is out of bounds.
    pub fn read<T: Element>(&self, start_item: u64, nr_items: u64) -> Result<Vec<T>, DataModelError> {
        Ok(self.array.read_items(start_item, nr_items)?)
    }
}

/// A same-shape, variable value collection whose shape varies through time.
///
/// A group with one array per time step, named by the decimal step index,
/// each of shape `[nr_active_objects, ...value_shape_of_the_step]`.
/// Addressed by time index.
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

    /// The number of stored time steps.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn nr_time_steps(&self) -> Result<u64, DataModelError> {
        Ok(self.group.child_names()?.len() as u64)
    }

    /// Append the values of time step `step`: one value of `value_shape` per
    /// active object, in active-set order.
    ///
    /// # Panics
    /// Panics if the length of `value_shape` does not equal the rank of the
    /// collection.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the step already exists, or if the
    /// element type or buffer length is incompatible.
    pub fn append_time_step<T: Element>(
        &mut self,
        step: u64,
        value_shape: &[u64],
        elements: &[T],
    ) -> Result<(), DataModelError> {
        assert_eq!(value_shape.len() as u64, self.rank);
        let array = Array::create(
            self.storage.clone(),
            self.group.path().join(&step.to_string())?,
            self.data_type,
            value_shape,
            Attributes::new(),
        )?;
        array.append_items(elements)?;
        Ok(())
    }

    /// Read the values of time step `step`.
    ///
    /// Returns the full shape `[nr_active_objects, ...value_shape]` and the
    /// flattened values.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the step does not exist.
    pub fn read_time_step<T: Element>(
        &self,
        step: u64,
    ) -> Result<(ArrayShape, Vec<T>), DataModelError> {
        let array = Array::open(
            self.storage.clone(),
            self.group.path().join(&step.to_string())?,
        )?;
        let elements = array.read_all()?;
        Ok((array.shape(), elements))
    }

    /// Return whether values exist for time step `step`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn contains_time_step(&self, step: u64) -> Result<bool, DataModelError> {
        Ok(crate::container::node_exists(
            &*self.storage,
            &self.group.path().join(&step.to_string())?,
        )?)
    }
}
