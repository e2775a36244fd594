//! Space domains.

use serde::{Deserialize, Serialize};

use crate::{
    container::{Array, Attributes, Group, NodePath},
    data_type::DataType,
    storage::ReadableWritableListableStorage,
};

use super::DataModelError;

/// The node name of a space domain group.
pub const SPACE_DOMAIN: &str = "space_domain";

const COORDINATES: &str = "coordinates";
const CONFIGURATION: &str = "configuration";

/// Whether objects move through space.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mobility {
    /// Locations are fixed for the object's lifetime.
    Stationary,
    /// Locations change per discretized time step.
    Mobile,
}

/// The kind of space-location record stored per item.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceDomainItemType {
    /// A point: one coordinate per dimension.
    Point,
    /// An axis-aligned box: min and max corners.
    Box,
}

/// The configuration of a space domain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfiguration {
    /// Whether objects move through space.
    pub mobility: Mobility,
    /// The kind of space-location record stored per item.
    pub item_type: SpaceDomainItemType,
    /// The number of spatial dimensions.
    pub rank: u64,
}

impl SpaceConfiguration {
    /// The number of coordinates stored per item.
    #[must_use]
    pub const fn coordinates_per_item(&self) -> u64 {
        match self.item_type {
            SpaceDomainItemType::Point => self.rank,
            SpaceDomainItemType::Box => 2 * self.rank,
        }
    }
}

/// Typed spatial location information of the objects of a property set.
///
/// The domain stores one `f64` coordinate tuple per item in a `coordinates`
/// array: `rank` coordinates per point, `2 * rank` per box (min corner
/// followed by max corner). A stationary domain holds one item per object; a
/// mobile domain appends one item per active object per time step.
#[derive(Debug)]
pub struct SpaceDomain {
    group: Group,
    coordinates: Array,
    configuration: SpaceConfiguration,
}

impl SpaceDomain {
    /// Create a new space domain in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the domain already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
        configuration: SpaceConfiguration,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(SPACE_DOMAIN)?;
        let group = Group::create(storage.clone(), path.clone(), Attributes::new())?;
        group.set_attribute(CONFIGURATION, &configuration)?;
        let coordinates = Array::create(
            storage.clone(),
            path.join(COORDINATES)?,
            DataType::Float64,
            &[configuration.coordinates_per_item()],
            Attributes::new(),
        )?;
        Ok(Self {
            group,
            coordinates,
            configuration,
        })
    }

    /// Open the existing space domain in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the domain does not exist or on an
    /// underlying container failure.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(SPACE_DOMAIN)?;
        let group = Group::open(storage.clone(), path.clone())?;
        let configuration: SpaceConfiguration = group.attribute(CONFIGURATION)?;
        let coordinates = Array::open(storage.clone(), path.join(COORDINATES)?)?;
        Ok(Self {
            group,
            coordinates,
            configuration,
        })
    }

    /// The path of the domain group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        self.group.path()
    }

    /// The configuration of the domain.
    #[must_use]
    pub fn configuration(&self) -> &SpaceConfiguration {
        &self.configuration
    }

    /// The number of stored space locations.
    #[must_use]
    pub fn nr_locations(&self) -> u64 {
        self.coordinates.nr_items()
    }

    /// Append space-location records.
    ///
    /// `coordinates` must contain a whole number of items
    /// ([`SpaceConfiguration::coordinates_per_item`] coordinates each).
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn append_coordinates(&mut self, coordinates: &[f64]) -> Result<(), DataModelError> {
        self.coordinates.append_items(coordinates)?;
        Ok(())
    }

    /// Read all space-location records, flattened.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn read_coordinates(&self) -> Result<Vec<f64>, DataModelError> {
        Ok(self.coordinates.read_all()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn round_trip() {
        let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
        let configuration = SpaceConfiguration {
            mobility: Mobility::Stationary,
            item_type: SpaceDomainItemType::Box,
            rank: 2,
        };
        let mut domain =
            SpaceDomain::create(&storage, &NodePath::root(), configuration.clone()).unwrap();
        assert_eq!(configuration.coordinates_per_item(), 4);
        domain
            .append_coordinates(&[0.0, 0.0, 10.0, 20.0])
            .unwrap();

        let domain = SpaceDomain::open(&storage, &NodePath::root()).unwrap();
        assert_eq!(domain.configuration(), &configuration);
        assert_eq!(domain.nr_locations(), 1);
        assert_eq!(
            domain.read_coordinates().unwrap(),
            vec![0.0, 0.0, 10.0, 20.0]
        );
    }
}
