//! Time domains.

use serde::{Deserialize, Serialize};

use crate::{
    container::{Array, Attributes, Group, NodePath},
    data_type::DataType,
    storage::ReadableWritableListableStorage,
};

use super::DataModelError;

/// The node name of a time domain group.
pub const TIME_DOMAIN: &str = "time_domain";

const COORDINATES: &str = "coordinates";
const CONFIGURATION: &str = "configuration";
const CLOCK: &str = "clock";

/// The kind of time-location record stored per item.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDomainItemType {
    /// A single time point (one coordinate).
    Point,
    /// A period located in time (start + duration).
    Box,
    /// A period of fixed duration (start + duration in whole ticks).
    Cell,
    /// A period located in time (start + end).
    Interval,
}

impl TimeDomainItemType {
    /// The number of coordinates stored per item.
    #[must_use]
    pub const fn coordinates_per_item(&self) -> u64 {
        match self {
            Self::Point => 1,
            Self::Box | Self::Cell | Self::Interval => 2,
        }
    }
}

/// The unit of a clock tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickUnit {
    /// Seconds.
    Second,
    /// Days.
    Day,
    /// Weeks.
    Week,
    /// Months.
    Month,
    /// Years.
    Year,
}

/// A clock: an epoch plus the duration of one tick.
///
/// Time coordinates are expressed in ticks since the epoch, where one tick
/// spans `nr_units` of `unit`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// The epoch as an ISO-8601 date-time string.
    pub epoch: String,
    /// The unit of a tick.
    pub unit: TickUnit,
    /// The number of units per tick.
    pub nr_units: u64,
}

/// The configuration of a time domain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeConfiguration {
    /// The kind of time-location record stored per item.
    pub item_type: TimeDomainItemType,
}

/// Typed temporal location information of the objects of a property set.
///
/// The domain stores one `u64` coordinate tuple per item in a `coordinates`
/// array: 1 coordinate for points, 2 for boxes/cells/intervals.
#[derive(Debug)]
pub struct TimeDomain {
    group: Group,
    coordinates: Array,
    configuration: TimeConfiguration,
    clock: Clock,
}

impl TimeDomain {
    /// Create a new time domain in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the domain already exists or on an
    /// underlying container failure.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
        configuration: TimeConfiguration,
        clock: Clock,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(TIME_DOMAIN)?;
        let group = Group::create(storage.clone(), path.clone(), Attributes::new())?;
        group.set_attribute(CONFIGURATION, &configuration)?;
        group.set_attribute(CLOCK, &clock)?;
        let coordinates = Array::create(
            storage.clone(),
            path.join(COORDINATES)?,
            DataType::UInt64,
            &[configuration.item_type.coordinates_per_item()],
            Attributes::new(),
        )?;
        Ok(Self {
            group,
            coordinates,
            configuration,
            clock,
        })
    }

    /// Open the existing time domain in the node at `parent`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the domain does not exist or on an
    /// underlying container failure.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        parent: &NodePath,
    ) -> Result<Self, DataModelError> {
        let path = parent.join(TIME_DOMAIN)?;
        let group = Group::open(storage.clone(), path.clone())?;
        let configuration: TimeConfiguration = group.attribute(CONFIGURATION)?;
        let clock: Clock = group.attribute(CLOCK)?;
        let coordinates = Array::open(storage.clone(), path.join(COORDINATES)?)?;
        Ok(Self {
            group,
            coordinates,
            configuration,
            clock,
        })
    }

    /// The path of the domain group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        self.group.path()
    }

    /// The configuration of the domain.
    #[must_use]
    pub fn configuration(&self) -> &TimeConfiguration {
        &self.configuration
    }

    /// The clock of the domain.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The number of stored time locations.
    #[must_use]
    pub fn nr_locations(&self) -> u64 {
        self.coordinates.nr_items()
    }

    /// Append time-location records.
    ///
    /// `coordinates` must contain a whole number of items
    /// ([`TimeDomainItemType::coordinates_per_item`] coordinates each).
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn append_coordinates(&mut self, coordinates: &[u64]) -> Result<(), DataModelError> {
        self.coordinates.append_items(coordinates)?;
        Ok(())
    }

    /// Read all time-location records, flattened.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] on an underlying container failure.
    pub fn read_coordinates(&self) -> Result<Vec<u64>, DataModelError> {
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
        let configuration = TimeConfiguration {
            item_type: TimeDomainItemType::Box,
        };
        let clock = Clock {
            epoch: "2000-01-01T00:00:00".to_string(),
            unit: TickUnit::Day,
            nr_units: 1,
        };
        let mut domain =
            TimeDomain::create(&storage, &NodePath::root(), configuration.clone(), clock.clone())
                .unwrap();
        domain.append_coordinates(&[0, 10, 10, 5]).unwrap();

        let domain = TimeDomain::open(&storage, &NodePath::root()).unwrap();
        assert_eq!(domain.configuration(), &configuration);
        assert_eq!(domain.clock(), &clock);
        assert_eq!(domain.nr_locations(), 2);
        assert_eq!(domain.read_coordinates().unwrap(), vec![0, 10, 10, 5]);
    }
}
