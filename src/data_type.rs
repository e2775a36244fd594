//! Data types of array elements.
//!
//! The container stores array payloads with a portable, fixed-endianness
//! (little-endian) in-file data type and reads them back through a native,
//! platform in-memory type. The mapping table between portable and native
//! types is fixed and closed: signed/unsigned 8/16/32/64-bit integers and
//! 32/64-bit floats. Reading or writing any type outside this table fails
//! with [`UnsupportedDataTypeError`].

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A data type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error ("no datatype mapping").
#[derive(Debug, Error, From)]
#[error("no datatype mapping for {_0}")]
pub struct UnsupportedDataTypeError(String);

impl DataType {
    /// All data types of the mapping table.
    pub const ALL: [DataType; 10] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Return the portable (in-file) name of the data type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Return the size of the data type in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Create a data type from its portable name.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `name` is outside of the fixed
    /// mapping table.
    pub fn from_name(name: &str) -> Result<Self, UnsupportedDataTypeError> {
        Self::ALL
            .iter()
            .find(|data_type| data_type.name() == name)
            .copied()
            .ok_or_else(|| UnsupportedDataTypeError(name.to_string()))
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        Self::from_name(&name).map_err(serde::de::Error::custom)
    }
}

/// A native element type with an entry in the fixed mapping table.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    /// The corresponding portable data type.
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($t:ty, $data_type:expr) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $data_type;
        }
    };
}

impl_element!(i8, DataType::Int8);
impl_element!(i16, DataType::Int16);
impl_element!(i32, DataType::Int32);
impl_element!(i64, DataType::Int64);
impl_element!(u8, DataType::UInt8);
impl_element!(u16, DataType::UInt16);
impl_element!(u32, DataType::UInt32);
impl_element!(u64, DataType::UInt64);
impl_element!(f32, DataType::Float32);
impl_element!(f64, DataType::Float64);

/// Reverse the bytes of each element of `bytes` in place.
fn swap_endianness(bytes: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for element in bytes.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}

/// Convert native elements to little-endian in-file bytes.
#[must_use]
pub fn elements_to_le_bytes<T: Element>(elements: &[T]) -> Vec<u8> {
    let mut bytes = bytemuck::cast_slice(elements).to_vec();
    if cfg!(target_endian = "big") {
        swap_endianness(&mut bytes, T::DATA_TYPE.size());
    }
    bytes
}

/// Convert little-endian in-file bytes to native elements.
///
/// # Panics
/// Panics if the length of `bytes` is not a multiple of the element size.
#[must_use]
pub fn elements_from_le_bytes<T: Element>(bytes: &[u8]) -> Vec<T> {
    let mut bytes = bytes.to_vec();
    if cfg!(target_endian = "big") {
        swap_endianness(&mut bytes, T::DATA_TYPE.size());
    }
    bytemuck::allocation::pod_collect_to_vec(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for data_type in DataType::ALL {
            assert_eq!(DataType::from_name(data_type.name()).unwrap(), data_type);
        }
        assert!(DataType::from_name("complex64").is_err());
        assert_eq!(
            DataType::from_name("bool").unwrap_err().to_string(),
            "no datatype mapping for bool"
        );
    }

    #[test]
    fn le_bytes_round_trip() {
        let elements: Vec<u16> = vec![1, 256, 65535];
        let bytes = elements_to_le_bytes(&elements);
        assert_eq!(bytes, vec![1, 0, 0, 1, 255, 255]);
        assert_eq!(elements_from_le_bytes::<u16>(&bytes), elements);

        let elements: Vec<f64> = vec![1.5, -2.25];
        let bytes = elements_to_le_bytes(&elements);
        assert_eq!(elements_from_le_bytes::<f64>(&bytes), elements);
    }

    #[test]
    fn sizes() {
        assert_eq!(DataType::Int8.size(), 1);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::UInt64.size(), 8);
    }
}
