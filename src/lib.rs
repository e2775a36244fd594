//! A library for storing scientific phenomena and computing on them.
//!
//! `phenomena` couples two subsystems:
//!  - a hierarchical, self-describing **data model** for objects, their
//!    space/time domains, and time-varying properties, stored in a single
//!    binary container ([`data_model`] over [`container`] over [`storage`]),
//!    and
//!  - a **partitioned array** layer ([`partitioned`]) that executes
//!    elementwise raster algebra over rectangular array partitions scheduled
//!    across localities, with a [`raster`] bridge to external raster bands.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use phenomena::data_model::Dataset;
//! use phenomena::storage::store::MemoryStore;
//!
//! let storage: phenomena::storage::ReadableWritableListableStorage =
//!     Arc::new(MemoryStore::new());
//! let mut dataset = Dataset::create(&storage)?;
//! let phenomenon = dataset.add_phenomenon("area")?;
//! phenomenon.add_object_ids(&[5, 9])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod container;
pub mod data_model;
pub mod data_type;
pub mod partitioned;
pub mod raster;
pub mod storage;

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;
