//! Scalar type converters and the [`FieldType`] bridge between Rust field
//! types and document values.

mod converter;
mod dates;
mod field;
mod geo;
mod numbers;
mod passthrough;

pub use converter::{ConverterRegistry, TypeConverter};
pub use dates::DateConverter;
pub use field::*;
pub use geo::{GeoPoint, GeoPointConverter};
pub use numbers::NumberConverter;
pub use passthrough::PassThroughConverter;
