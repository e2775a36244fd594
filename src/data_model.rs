//! The object/property data model.
//!
//! A [`Dataset`] is the top-level namespace of a container. It aggregates
//! [`Phenomenon`]s; a phenomenon aggregates objects (globally unique integer
//! IDs) and [`PropertySet`]s; a property set aggregates exactly one
//! [`ObjectTracker`], zero-or-one [`TimeDomain`], zero-or-one
//! [`SpaceDomain`], and a [`Properties`] registry of name-keyed value
//! collections.
//!
//! All datasets in the model are append-only: objects, tracked time steps,
//! domain coordinates and property values are created and never mutated or
//! deleted.

mod dataset;
mod object_tracker;
mod phenomenon;
mod properties;
mod property_set;
mod space_domain;
mod time_domain;
pub mod value;

pub use dataset::Dataset;
pub use object_tracker::ObjectTracker;
pub use phenomenon::Phenomenon;
pub use properties::{Properties, Property, PropertyVariant};
pub use property_set::{PropertySet, PropertySetBuilder};
pub use space_domain::{Mobility, SpaceConfiguration, SpaceDomain, SpaceDomainItemType};
pub use time_domain::{Clock, TickUnit, TimeConfiguration, TimeDomain, TimeDomainItemType};

use thiserror::Error;

use crate::container::{ContainerError, NodePath, NodePathError};

/// A data model error.
#[derive(Debug, Error)]
pub enum DataModelError {
    /// A container error.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// An invalid node path.
    #[error(transparent)]
    NodePath(#[from] NodePathError),
    /// A name already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// A name does not exist.
    #[error("{0} does not exist")]
    DoesNotExist(String),
    /// Mutation was requested through a linked (non-owned) handle.
    #[error("resource is linked to {0} and not owned; writes are not allowed")]
    NotOwned(NodePath),
    /// The lengths of parallel buffers do not match.
    #[error("expected {expected} values, got {got}")]
    MismatchedLength {
        /// The expected number of values.
        expected: u64,
        /// The provided number of values.
        got: u64,
    },
}

/// An owned or linked component of a property set.
///
/// A `Linked` component aliases a component owned by another property set
/// (for example, a discretization property set sharing the time domain of the
/// property it discretizes). Reads go through the handle uniformly; mutation
/// is only permitted through an `Owned` handle.
#[derive(Debug)]
pub enum Ownership<T> {
    /// The component is owned by this property set.
    Owned(T),
    /// The component is owned by the property set at `owner`.
    Linked {
        /// The path of the owning property set.
        owner: NodePath,
        /// The read-through handle to the component.
        value: T,
    },
}

impl<T> Ownership<T> {
    /// Return a read handle to the component.
    #[must_use]
    pub fn get(&self) -> &T {
        match self {
            Self::Owned(value) | Self::Linked { value, .. } => value,
        }
    }

    /// Return whether the component is owned.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Return a write handle to the component.
    ///
    /// # Errors
    /// Returns [`DataModelError::NotOwned`] if the component is linked.
    pub fn get_mut(&mut self) -> Result<&mut T, DataModelError> {
        match self {
            Self::Owned(value) => Ok(value),
            Self::Linked { owner, .. } => Err(DataModelError::NotOwned(owner.clone())),
        }
    }
}
