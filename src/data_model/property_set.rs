//! Property sets.

use crate::{
    container::{Attributes, Group, NodePath},
    storage::ReadableWritableListableStorage,
};

use super::{
    object_tracker::ObjectTracker,
    properties::Properties,
    space_domain::{SpaceConfiguration, SpaceDomain},
    time_domain::{Clock, TimeConfiguration, TimeDomain},
    DataModelError, Ownership,
};

const OBJECT_TRACKER_LINK: &str = "object_tracker_link";
const TIME_DOMAIN_LINK: &str = "time_domain_link";

#[derive(Debug)]
enum TrackerSpec {
    Owned { with_indices: bool },
    Linked(NodePath),
}

#[derive(Debug)]
enum TimeSpec {
    Owned(TimeConfiguration, Clock),
    Linked(NodePath),
}

/// A builder for a [`PropertySet`].
///
/// Configures the single object tracker (owned by default), the optional time
/// domain and the optional space domain before the set is created. Linked
/// components alias the component owned by another property set; writes
/// through the new set are rejected for them.
#[derive(Debug)]
pub struct PropertySetBuilder {
    tracker: TrackerSpec,
    time: Option<TimeSpec>,
    space: Option<SpaceConfiguration>,
}

impl Default for PropertySetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySetBuilder {
    /// Create a builder with an owned tracker without storage offsets and no
    /// domains.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: TrackerSpec::Owned {
                with_indices: false,
            },
            time: None,
            space: None,
        }
    }

    /// Record storage offsets in the owned object tracker.
    #[must_use]
    pub fn track_object_indices(mut self) -> Self {
        self.tracker = TrackerSpec::Owned { with_indices: true };
        self
    }

    /// Share the object tracker owned by the property set at `owner`.
    #[must_use]
    pub fn link_object_tracker(mut self, owner: &NodePath) -> Self {
        self.tracker = TrackerSpec::Linked(owner.clone());
        self
    }

    /// Add an owned time domain.
    #[must_use]
    pub fn with_time_domain(mut self, configuration: TimeConfiguration, clock: Clock) -> Self {
        self.time = Some(TimeSpec::Owned(configuration, clock));
        self
    }

    /// Share the time domain owned by the property set at `owner`.
    #[must_use]
    pub fn link_time_domain(mut self, owner: &NodePath) -> Self {
        self.time = Some(TimeSpec::Linked(owner.clone()));
        self
    }

    /// Add an owned space domain.
    #[must_use]
    pub fn with_space_domain(mut self, configuration: SpaceConfiguration) -> Self {
        self.space = Some(configuration);
        self
    }

    /// Create the property set at `path`.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if a node at `path` already exists or on
    /// an underlying container failure.
    pub fn build(
        self,
        storage: &ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<PropertySet, DataModelError> {
        let group = Group::create(storage.clone(), path.clone(), Attributes::new())?;
        let object_tracker = match self.tracker {
            TrackerSpec::Owned { with_indices } => {
                Ownership::Owned(ObjectTracker::create(storage, &path, with_indices)?)
            }
            TrackerSpec::Linked(owner) => {
                group.set_attribute(OBJECT_TRACKER_LINK, &owner.as_str())?;
                Ownership::Linked {
                    value: ObjectTracker::open(storage, &owner)?,
                    owner,
                }
            }
        };
        let time_domain = match self.time {
            Some(TimeSpec::Owned(configuration, clock)) => Some(Ownership::Owned(
                TimeDomain::create(storage, &path, configuration, clock)?,
            )),
            Some(TimeSpec::Linked(owner)) => {
                group.set_attribute(TIME_DOMAIN_LINK, &owner.as_str())?;
                Some(Ownership::Linked {
                    value: TimeDomain::open(storage, &owner)?,
                    owner,
                })
            }
            None => None,
        };
        let space_domain = match self.space {
            Some(configuration) => Some(SpaceDomain::create(storage, &path, configuration)?),
            None => None,
        };
        let properties = Properties::create(storage, &path)?;
        Ok(PropertySet {
            group,
            object_tracker,
            time_domain,
            space_domain,
            properties,
        })
    }
}

/// A property set: one object tracker, optional time and space domains, and
/// a registry of properties.
///
/// Every property in the set shares the set's tracker and domains: the `i`-th
/// value of a constant property belongs to the `i`-th object, and the values
/// of a variable property at a time step belong to the step's active set, in
/// active-set order.
#[derive(Debug)]
pub struct PropertySet {
    group: Group,
    object_tracker: Ownership<ObjectTracker>,
    time_domain: Option<Ownership<TimeDomain>>,
    space_domain: Option<SpaceDomain>,
    properties: Properties,
}

impl PropertySet {
    /// Open the existing property set at `path`, resolving linked components
    /// through their recorded owner paths.
    ///
    /// # Errors
    /// Returns a [`DataModelError`] if the set does not exist or a recorded
    /// link is invalid.
    pub fn open(
        storage: &ReadableWritableListableStorage,
        path: NodePath,
    ) -> Result<Self, DataModelError> {
        let group = Group::open(storage.clone(), path.clone())?;
        let object_tracker = if group.has_attribute(OBJECT_TRACKER_LINK) {
            let owner: String = group.attribute(OBJECT_TRACKER_LINK)?;
            let owner = NodePath::new(&owner)?;
            Ownership::Linked {
                value: ObjectTracker::open(storage, &owner)?,
                owner,
            }
        } else {
            Ownership::Owned(ObjectTracker::open(storage, &path)?)
        };
        let time_domain = if group.has_attribute(TIME_DOMAIN_LINK) {
            let owner: String = group.attribute(TIME_DOMAIN_LINK)?;
            let owner = NodePath::new(&owner)?;
            Some(Ownership::Linked {
                value: TimeDomain::open(storage, &owner)?,
                owner,
            })
        } else if crate::container::node_exists(
            &**storage,
            &path.join(super::time_domain::TIME_DOMAIN)?,
        )? {
            Some(Ownership::Owned(TimeDomain::open(storage, &path)?))
        } else {
            None
        };
        let space_domain = if crate::container::node_exists(
            &**storage,
            &path.join(super::space_domain::SPACE_DOMAIN)?,
        )? {
            Some(SpaceDomain::open(storage, &path)?)
        } else {
            None
        };
        let properties = Properties::open(storage, &path)?;
        Ok(Self {
            group,
            object_tracker,
            time_domain,
            space_domain,
            properties,
        })
    }

    /// The path of the property set group.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        self.group.path()
    }

    /// The name of the property set.
    #[must_use]
    pub fn name(&self) -> &str {
        self.group.path().name()
    }

    /// A read handle to the object tracker.
    #[must_use]
    pub fn object_tracker(&self) -> &ObjectTracker {
        self.object_tracker.get()
    }

    /// A write handle to the object tracker.
    ///
    /// # Errors
    /// Returns [`DataModelError::NotOwned`] if the tracker is linked.
    pub fn object_tracker_mut(&mut self) -> Result<&mut ObjectTracker, DataModelError> {
        self.object_tracker.get_mut()
    }

    /// Return whether the set owns its object tracker.
    #[must_use]
    pub fn owns_object_tracker(&self) -> bool {
        self.object_tracker.is_owned()
    }

    /// Return whether the set has a time domain.
    #[must_use]
    pub fn has_time_domain(&self) -> bool {
        self.time_domain.is_some()
    }

    /// A read handle to the time domain.
    ///
    /// # Panics
    /// Panics if the set has no time domain; check [`Self::has_time_domain`]
    /// first.
    #[must_use]
    pub fn time_domain(&self) -> &TimeDomain {
        self.time_domain
            .as_ref()
            .expect("property set has no time domain")
            .get()
    }

    /// A write handle to the time domain.
    ///
    /// # Panics
    /// Panics if the set has no time domain; check [`Self::has_time_domain`]
    /// first.
    ///
    /// # Errors
    /// Returns [`DataModelError::NotOwned`] if the time domain is linked.
    pub fn time_domain_mut(&mut self) -> Result<&mut TimeDomain, DataModelError> {
        self.time_domain
            .as_mut()
            .expect("property set has no time domain")
            .get_mut()
    }

    /// Return whether the set has and owns its time domain.
    #[must_use]
    pub fn owns_time_domain(&self) -> bool {
        self.time_domain
            .as_ref()
            .is_some_and(Ownership::is_owned)
    }

    /// Return whether the set has a space domain.
    #[must_use]
    pub fn has_space_domain(&self) -> bool {
        self.space_domain.is_some()
    }

    /// A read handle to the space domain.
    ///
    /// # Panics
    /// Panics if the set has no space domain; check
    /// [`Self::has_space_domain`] first.
    #[must_use]
    pub fn space_domain(&self) -> &SpaceDomain {
        self.space_domain
            .as_ref()
            .expect("property set has no space domain")
    }

    /// A write handle to the space domain.
    ///
    /// # Panics
    /// Panics if the set has no space domain; check
    /// [`Self::has_space_domain`] first.
    #[must_use]
    pub fn space_domain_mut(&mut self) -> &mut SpaceDomain {
        self.space_domain
            .as_mut()
            .expect("property set has no space domain")
    }

    /// The properties of the set.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The properties of the set, for writing.
    #[must_use]
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        data_model::{TickUnit, TimeDomainItemType},
        data_type::DataType,
        storage::store::MemoryStore,
    };

    use super::*;

    fn new_storage() -> ReadableWritableListableStorage {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn owned_components() {
        let storage = new_storage();
        let path = NodePath::new("/simulated").unwrap();
        let mut set = PropertySetBuilder::new()
            .with_time_domain(
                TimeConfiguration {
                    item_type: TimeDomainItemType::Point,
                },
                Clock {
                    epoch: "2000-01-01T00:00:00".to_string(),
                    unit: TickUnit::Day,
                    nr_units: 1,
                },
            )
            .build(&storage, path.clone())
            .unwrap();
        assert!(set.owns_object_tracker());
        assert!(set.has_time_domain());
        assert!(set.owns_time_domain());
        assert!(!set.has_space_domain());
        set.object_tracker_mut()
            .unwrap()
            .append_time_step(&[5, 9], None)
            .unwrap();
        set.time_domain_mut().unwrap().append_coordinates(&[0]).unwrap();
        set.properties_mut()
            .add_same_shape("elevation", DataType::Float64, &[3], "")
            .unwrap();

        let set = PropertySet::open(&storage, path).unwrap();
        assert_eq!(set.object_tracker().nr_time_steps(), 1);
        assert_eq!(set.time_domain().nr_locations(), 1);
        assert!(set.properties().contains("elevation"));
    }

    #[test]
    fn linked_components_reject_writes() {
        let storage = new_storage();
        let owner_path = NodePath::new("/simulated").unwrap();
        let mut owner = PropertySetBuilder::new()
            .with_time_domain(
                TimeConfiguration {
                    item_type: TimeDomainItemType::Point,
                },
                Clock {
                    epoch: "2000-01-01T00:00:00".to_string(),
                    unit: TickUnit::Day,
                    nr_units: 1,
                },
            )
            .build(&storage, owner_path.clone())
            .unwrap();
        owner
            .object_tracker_mut()
            .unwrap()
            .append_time_step(&[5], None)
            .unwrap();

        let linked_path = NodePath::new("/derived").unwrap();
        let linked = PropertySetBuilder::new()
            .link_object_tracker(&owner_path)
            .link_time_domain(&owner_path)
            .build(&storage, linked_path.clone())
            .unwrap();
        assert!(!linked.owns_object_tracker());
        assert!(!linked.owns_time_domain());
        // Reads alias the owner's data.
        assert_eq!(linked.object_tracker().nr_time_steps(), 1);

        // Re-open and confirm link resolution and the write gate.
        let mut linked = PropertySet::open(&storage, linked_path).unwrap();
        assert!(!linked.owns_object_tracker());
        assert_eq!(linked.object_tracker().active_object_ids(0).unwrap(), vec![5]);
        assert!(matches!(
            linked.object_tracker_mut(),
            Err(DataModelError::NotOwned(owner)) if owner == owner_path
        ));
        assert!(matches!(
            linked.time_domain_mut(),
            Err(DataModelError::NotOwned(_))
        ));
    }
}
