//! Properties: a name-keyed registry of value collections.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    container::{Attributes, Group, NodePath},
    data_type::DataType,
    storage::ReadableWritableListableStorage,
};

use super::{
    value::{different_shape, same_shape, ShapePerObject, ShapeVariability, ValueVariability},
    DataModelError,
};

/// The node name of the properties group of a property set.
pub const PROPERTIES: &str = "properties";

const SHAPE_PER_OBJECT: &str = "shape_per_object";
const VALUE_VARIABILITY: &str = "value_variability";
const SHAPE_VARIABILITY: &str = "shape_variability";
const DATA_TYPE: &str = "data_type";
const DESCRIPTION: &str = "description";
const TIME_DISCRETIZATION: &str = "time_discretization";
const SPACE_DISCRETIZATION: &str = "space_discretization";

/// The value collection of a property: a tagged union over the six storage
/// variants.
///
/// The variant is determined once at creation and never changes. Every query
/// site matches exhaustively on the variant, so name uniqueness across all
/// six variants is enforced by construction (a single name → variant map)
/// rather than by scanning six collections.
#[derive(Debug)]
pub enum PropertyVariant {
    /// Same shape per object, constant through time.
    SameShape(same_shape::Value),
    /// Same shape per object, variable through time, constant shape.
    SameShapeConstantShape(same_shape::ConstantShapeValue),
    /// Same shape per object, variable through time, variable shape.
    SameShapeVariableShape(same_shape::VariableShapeValue),
    /// Different shape per object, constant through time.
    DifferentShape(different_shape::Value),
    /// Different shape per object, variable through time, constant shape.
    DifferentShapeConstantShape(different_shape::ConstantShapeValue),
    /// Different shape per object, variable through time, variable shape.
    DifferentShapeVariableShape(different_shape::VariableShapeValue),
}

impl PropertyVariant {
    /// Whether all objects' values share one shape.
    #[must_use]
    pub fn shape_per_object(&self) -> ShapePerObject {
        match self {
            Self::SameShape(_)
            | Self::SameShapeConstantShape(_)
            | Self::SameShapeVariableShape(_) => ShapePerObject::Same,
            Self::DifferentShape(_)
            | Self::DifferentShapeConstantShape(_)
            | Self::DifferentShapeVariableShape(_) => ShapePerObject::Different,
        }
    }

    /// Whether the value is fixed or changes through time.
    #[must_use]
    pub fn value_variability(&self) -> ValueVariability {
        match self {
            Self::SameShape(_) | Self::DifferentShape(_) => ValueVariability::Constant,
            Self::SameShapeConstantShape(_)
            | Self::SameShapeVariableShape(_)
            | Self::DifferentShapeConstantShape(_)
            | Self::DifferentShapeVariableShape(_) => ValueVariability::Variable,
        }
    }

    /// Whether a variable value's shape is fixed or changes through time.
    ///
    /// Constant values trivially have constant shape.
    #[must_use]
    pub fn shape_variability(&self) -> ShapeVariability {
        match self {
            Self::SameShape(_)
            | Self::DifferentShape(_)
            | Self::SameShapeConstantShape(_)
            | Self::DifferentShapeConstantShape(_) => ShapeVariability::Constant,
            Self::SameShapeVariableShape(_) | Self::DifferentShapeVariableShape(_) => {
                ShapeVariability::Variable
            }
        }
    }

    /// The data type of the values.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::SameShape(value) => value.data_type(),
            Self::SameShapeConstantShape(value) => value.data_type(),
            Self::SameShapeVariableShape(value) => value.data_type(),
            Self::DifferentShape(value) => value.data_type(),
            Self::DifferentShapeConstantShape(value) => value.data_type(),
            Self::DifferentShapeVariableShape(value) => value.data_type(),
        }
    }
}

/// A named property: a variant value collection plus its metadata node.
#[derive(Debug)]
pub struct Property {
    group: Group,
    variant: PropertyVariant,
}

impl Property {
    /// The name of the property.
    ///
    /// # Panics
    /// Panics if the property group is the container root, which cannot
    /// happen for a property created through [`Properties`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.group.path().name()
    }

    /// The description of the property.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the description attribute is missing.
    pub fn description(&self) -> Result<String, DataModelError> {
        Ok(self.group.attribute(DESCRIPTION)?)
    }

    /// The value collection of the property.
    #[must_use]
    pub fn value(&self) -> &PropertyVariant {
        &self.variant
    }

    /// The value collection of the property, for writing.
    #[must_use]
    pub fn value_mut(&mut self) -> &mut PropertyVariant {
        &mut self.variant
    }

    /// Record that the property's values are discretized through time by the
    /// property set at `property_set`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn set_time_discretization(
        &self,
        property_set: &NodePath,
    ) -> Result<(), DataModelError> {
        Ok(self
            .group
            .set_attribute(TIME_DISCRETIZATION, &property_set.as_str())?)
    }

    /// Return the path of the property set discretizing the property's
    /// values through time, if any.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the recorded path is invalid.
    pub fn time_discretization(&self) -> Result<Option<NodePath>, DataModelError> {
        if self.group.has_attribute(TIME_DISCRETIZATION) {
            let path: String = self.group.attribute(TIME_DISCRETIZATION)?;
            Ok(Some(NodePath::new(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Record that the property's values are discretized through space by
    /// the property set at `property_set`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn set_space_discretization(
        &self,
        property_set: &NodePath,
    ) -> Result<(), DataModelError> {
        Ok(self
            .group
            .set_attribute(SPACE_DISCRETIZATION, &property_set.as_str())?)
    }

    /// Return the path of the property set discretizing the property's
    /// values through space, if any.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the recorded path is invalid.
    pub fn space_discretization(&self) -> Result<Option<NodePath>, DataModelError> {
        if self.group.has_attribute(SPACE_DISCRETIZATION) {
            let path: String = self.group.attribute(SPACE_DISCRETIZATION)?;
            Ok(Some(NodePath::new(&path)?))
        } else {
            Ok(None)
        }
    }
}

/// The properties of a property set: name → variant value collection.
///
/// A name is unique across all six variants simultaneously; `add_*` fails
/// with "already exists" when the name is present in any variant.
#[derive(Debug)]
pub struct Properties {
    storage: ReadableWritableListableStorage,
    group: Group,
    properties: HashMap<String, Property>,
}

impl Properties {
    /// Create the properties group in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the group already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::create(storage.clone(), parent.join(PROPERTIES)?, Attributes::new())?;
        Ok(Self {
            storage: storage.clone(),
            group,
            properties: HashMap::new(),
        })
    }

    /// Open the existing properties group in the node at `parent`, reading
    /// the variant of each property from its recorded metadata.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the group does not exist or a
    /// property's metadata is invalid.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), parent.join(PROPERTIES)?)?;
        let mut properties = HashMap::new();
        for name in group.child_names()? {
            let path = group.path().join(&name)?;
            let property_group = Group::open(storage.clone(), path.clone())?;
            let shape_per_object: ShapePerObject = property_group.attribute(SHAPE_PER_OBJECT)?;
            let value_variability: ValueVariability =
                property_group.attribute(VALUE_VARIABILITY)?;
            let shape_variability: ShapeVariability =
                property_group.attribute(SHAPE_VARIABILITY)?;
            let variant = match (shape_per_object, value_variability, shape_variability) {
                (ShapePerObject::Same, ValueVariability::Constant, _) => {
                    PropertyVariant::SameShape(same_shape::Value::open(&storage, &path)?)
                }
                (ShapePerObject::Same, ValueVariability::Variable, ShapeVariability::Constant) => {
                    PropertyVariant::SameShapeConstantShape(same_shape::ConstantShapeValue::open(
                        &storage, &path,
                    )?)
                }
                (ShapePerObject::Same, ValueVariability::Variable, ShapeVariability::Variable) => {
                    PropertyVariant::SameShapeVariableShape(same_shape::VariableShapeValue::open(
                        &storage, &path,
                    )?)
                }
                (ShapePerObject::Different, ValueVariability::Constant, _) => {
                    PropertyVariant::DifferentShape(different_shape::Value::open(&storage, &path)?)
                }
                (
                    ShapePerObject::Different,
                    ValueVariability::Variable,
                    ShapeVariability::Constant,
                ) => PropertyVariant::DifferentShapeConstantShape(
                    different_shape::ConstantShapeValue::open(&storage, &path)?,
                ),
                (
                    ShapePerObject::Different,
                    ValueVariability::Variable,
                    ShapeVariability::Variable,
                ) => PropertyVariant::DifferentShapeVariableShape(
                    different_shape::VariableShapeValue::open(&storage, &path)?,
                ),
            };
            properties.insert(
                name,
                Property {
                    group: property_group,
                    variant,
                },
            );
        }
        Ok(Self {
            storage: storage.clone(),
            group,
            properties,
        })
    }

    /// Add a same-shape constant property.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_same_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        value_shape: &[u64],
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Same,
            ValueVariability::Constant,
            ShapeVariability::Constant,
            data_type,
            description,
        )?;
        let value = same_shape::Value::create(&self.storage, &path, data_type, value_shape)?;
        self.insert(name, PropertyVariant::SameShape(value))
    }

    /// Add a same-shape variable property with constant shape through time.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_same_shape_constant_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        value_shape: &[u64],
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Same,
            ValueVariability::Variable,
            ShapeVariability::Constant,
            data_type,
            description,
        )?;
        let value =
            same_shape::ConstantShapeValue::create(&self.storage, &path, data_type, value_shape)?;
        self.insert(name, PropertyVariant::SameShapeConstantShape(value))
    }

    /// Add a same-shape variable property with variable shape through time.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_same_shape_variable_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        rank: u64,
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Same,
            ValueVariability::Variable,
            ShapeVariability::Variable,
            data_type,
            description,
        )?;
        let value =
            same_shape::VariableShapeValue::create(&self.storage, &path, data_type, rank)?;
        self.insert(name, PropertyVariant::SameShapeVariableShape(value))
    }

    /// Add a different-shape constant property.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_different_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        rank: u64,
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Different,
            ValueVariability::Constant,
            ShapeVariability::Constant,
            data_type,
            description,
        )?;
        let value = different_shape::Value::create(&self.storage, &path, data_type, rank)?;
        self.insert(name, PropertyVariant::DifferentShape(value))
    }

    /// Add a different-shape variable property with constant shape through
    /// time.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_different_shape_constant_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        rank: u64,
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Different,
            ValueVariability::Variable,
            ShapeVariability::Constant,
            data_type,
            description,
        )?;
        let value =
            different_shape::ConstantShapeValue::create(&self.storage, &path, data_type, rank)?;
        self.insert(name, PropertyVariant::DifferentShapeConstantShape(value))
    }

    /// Add a different-shape variable property with variable shape through
    /// time.
    ///
    /// # Errors
    /// Returns [`DataModelError::AlreadyExists`] if a property named `name`
    /// exists in any variant.
    pub fn add_different_shape_variable_shape(
        &mut self,
        name: &str,
        data_type: DataType,
        rank: u64,
        description: &str,
    ) -> Result<&mut Property, DataModelError> {
        let path = self.new_property_group(
            name,
            ShapePerObject::Different,
            ValueVariability::Variable,
            ShapeVariability::Variable,
            data_type,
            description,
        )?;
        let value =
            different_shape::VariableShapeValue::create(&self.storage, &path, data_type, rank)?;
        self.insert(name, PropertyVariant::DifferentShapeVariableShape(value))
    }

    /// Return whether a property named `name` exists in any variant.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// The number of properties.
    #[must_use]
    pub fn nr_properties(&self) -> usize {
        self.properties.len()
    }

    /// Return the sorted names of all properties.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.properties
            .keys()
            .map(String::as_str)
            .sorted_unstable()
            .collect()
    }

    /// Return the property named `name`.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent from
    /// all variants.
    pub fn property(&self, name: &str) -> Result<&Property, DataModelError> {
        self.properties
            .get(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("property {name}")))
    }

    /// Return the property named `name`, for writing.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent from
    /// all variants.
    pub fn property_mut(&mut self, name: &str) -> Result<&mut Property, DataModelError> {
        self.properties
            .get_mut(name)
            .ok_or_else(|| DataModelError::DoesNotExist(format!("property {name}")))
    }

    /// Whether the values of the property named `name` share one shape per
    /// object.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn shape_per_object(&self, name: &str) -> Result<ShapePerObject, DataModelError> {
        Ok(self.property(name)?.value().shape_per_object())
    }

    /// Whether the values of the property named `name` are fixed or change
    /// through time.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn value_variability(&self, name: &str) -> Result<ValueVariability, DataModelError> {
        Ok(self.property(name)?.value().value_variability())
    }

    /// Whether the shape of the values of the property named `name` is fixed
    /// or changes through time.
    ///
    /// # Errors
    /// Returns [`DataModelError::DoesNotExist`] if the name is absent.
    pub fn shape_variability(&self, name: &str) -> Result<ShapeVariability, DataModelError> {
        Ok(self.property(name)?.value().shape_variability())
    }

    fn new_property_group(
        &self,
        name: &str,
        shape_per_object: ShapePerObject,
        value_variability: ValueVariability,
        shape_variability: ShapeVariability,
        data_type: DataType,
        description: &str,
    ) -> Result<NodePath, DataModelError> {
        if self.contains(name) {
            return Err(DataModelError::AlreadyExists(format!("property {name}")));
        }
        let path = self.group.path().join(name)?;
        let group = Group::create(self.storage.clone(), path.clone(), Attributes::new())?;
        group.set_attribute(SHAPE_PER_OBJECT, &shape_per_object)?;
        group.set_attribute(VALUE_VARIABILITY, &value_variability)?;
        group.set_attribute(SHAPE_VARIABILITY, &shape_variability)?;
        group.set_attribute(DATA_TYPE, &data_type)?;
        group.set_attribute(DESCRIPTION, &description)?;
        Ok(path)
    }

    fn insert(
        &mut self,
        name: &str,
        variant: PropertyVariant,
    ) -> Result<&mut Property, DataModelError> {
        let group = Group::open(self.storage.clone(), self.group.path().join(name)?)?;
        Ok(self
            .properties
            .entry(name.to_string())
            .or_insert(Property { group, variant }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn name_unique_across_variants() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let mut properties = Properties::create(&storage, &NodePath::root()).unwrap();
        properties
            .add_same_shape("elevation", DataType::Float64, &[3], "height above datum")
            .unwrap();
        // Adding the same name in any other variant fails.
        assert!(matches!(
            properties.add_different_shape("elevation", DataType::Float64, 2, ""),
            Err(DataModelError::AlreadyExists(_))
        ));
        assert!(matches!(
            properties.add_same_shape_constant_shape("elevation", DataType::Float64, &[3], ""),
            Err(DataModelError::AlreadyExists(_))
        ));
        assert!(properties.contains("elevation"));
        assert!(!properties.contains("slope"));
        assert!(matches!(
            properties.shape_per_object("slope"),
            Err(DataModelError::DoesNotExist(_))
        ));
    }

    #[test]
    fn variant_queries_round_trip() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let mut properties = Properties::create(&storage, &NodePath::root()).unwrap();
        properties
            .add_same_shape("a", DataType::Float64, &[2], "")
            .unwrap();
        properties
            .add_same_shape_variable_shape("b", DataType::Int32, 1, "")
            .unwrap();
        properties
            .add_different_shape_constant_shape("c", DataType::UInt16, 2, "")
            .unwrap();

        let properties = Properties::open(&storage, &NodePath::root()).unwrap();
        assert_eq!(properties.nr_properties(), 3);
        assert_eq!(properties.names(), vec!["a", "b", "c"]);
        assert_eq!(
            properties.shape_per_object("a").unwrap(),
            ShapePerObject::Same
        );
        assert_eq!(
            properties.value_variability("a").unwrap(),
            ValueVariability::Constant
        );
        assert_eq!(
            properties.shape_variability("b").unwrap(),
            ShapeVariability::Variable
        );
        assert_eq!(
            properties.shape_per_object("c").unwrap(),
            ShapePerObject::Different
        );
        assert_eq!(
            properties.value_variability("c").unwrap(),
            ValueVariability::Variable
        );
        assert_eq!(
            properties.property("a").unwrap().value().data_type(),
            DataType::Float64
        );
    }
}
