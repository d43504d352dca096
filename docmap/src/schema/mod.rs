//! Schema derivation.
//!
//! Every mapped type implements [`Entity`], whose `describe` declares the
//! type's fields, storage names and indexes on a [`SchemaBuilder`]. The
//! [`Mapper`](crate::mapper::Mapper) turns the declarations into a validated
//! [`Schema`] the first time the type is used, and caches it.
//!
//! Derivation rejects layouts that cannot be mapped:
//! - an id field stored under a name other than `_id`
//! - two properties with the same storage name
//! - a named, repeated or non-document overflow field
//! - a list without an element type
//! - a scalar type without a registered converter
//! - an embedded field whose type is a top-level entity

mod builder;
mod descriptor;
mod entity;
pub(crate) mod property;
#[allow(clippy::module_inception)]
mod schema;

pub use builder::SchemaBuilder;
pub use descriptor::{PropertyKind, TypeDescriptor};
pub use entity::{Entity, EntityKind};
pub use property::{FieldDecl, Property};
pub use schema::Schema;
