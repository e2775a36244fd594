//! Property value collections.
//!
//! Two independent axes define six storage strategies for the array values
//! of a property:
//!  - *shape-per-object*: [`ShapePerObject::Same`] (every object's value has
//!    one shape, stored contiguously with an implicit stride) vs
//!    [`ShapePerObject::Different`] (one sub-dataset per object, named by the
//!    object index),
//!  - *variability*: [`ValueVariability::Constant`] (one value per object for
//!    its lifetime) vs [`ValueVariability::Variable`] (one value per active
//!    object per discretized time step), where a variable value's shape may
//!    itself be [`ShapeVariability::Constant`] or
//!    [`ShapeVariability::Variable`] through time.
//!
//! The variant of a value collection is fixed at creation and cannot change.

pub mod different_shape;
pub mod same_shape;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The node name of the value collection of a property.
pub const VALUE: &str = "value";

/// Whether all objects' property values share one shape.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePerObject {
    /// Every object's value has an identical shape.
    Same,
    /// Each object's value may have a distinct shape.
    Different,
}

/// Whether a property's value is fixed or changes through time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueVariability {
    /// The value is fixed for the object's lifetime.
    Constant,
    /// The value changes per discretized time step.
    Variable,
}

/// Whether a variable value's shape is fixed or changes through time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeVariability {
    /// The shape is fixed through time.
    Constant,
    /// The shape changes per discretized time step.
    Variable,
}

/// Parse and sort the numeric child names of a value group.
pub(crate) fn sorted_indices(names: Vec<String>) -> Vec<u64> {
    names
        .into_iter()
        .filter_map(|name| name.parse().ok())
        .sorted_unstable()
        .collect()
}
