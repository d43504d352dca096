#![allow(clippy::type_complexity)]
//! # docmap - Object-Document Mapping
//!
//! docmap maps typed Rust records to and from schemaless documents of the
//! kind document databases store, derives index specifications from type
//! declarations, and builds query, update and aggregation documents.
//!
//! ## Key Features
//!
//! - **Dual-mode documents**: a [`Document`](document::Document) is either a
//!   free-standing ordered map or a live view over a typed record
//! - **Identity**: the same record always yields the same live document
//! - **Schema derivation**: storage names, id and overflow fields, nested
//!   types and indexes declared once per type
//! - **Converters**: numbers, dates, geo points and pass-through values,
//!   extensible per mapping context
//! - **Builders**: queries, updates, projections, `$group` bodies and
//!   aggregation pipelines
//! - **Driver seam**: a [`DocumentStore`](store::DocumentStore) trait and a
//!   typed [`Collection`](store::Collection)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docmap::common::Shared;
//! use docmap::mapper::Mapper;
//! use docmap_derive::Entity;
//!
//! #[derive(Entity, Default)]
//! #[entity(name = "users")]
//! struct User {
//!     #[property(id)]
//!     id: Option<String>,
//!     #[property(indexed(unique))]
//!     email: String,
//! }
//!
//! # fn main() -> docmap::errors::MapperResult<()> {
//! let mapper = Mapper::builder().register::<User>().build()?;
//! let user = Shared::new(User::default());
//!
//! // writes through the view land in the record
//! let document = mapper.to_document(&user)?;
//! document.put("email", "ada@example.com")?;
//! assert_eq!(user.read().email, "ada@example.com");
//!
//! // and the same record always yields the same view
//! assert!(mapper.to_document(&user)?.ptr_eq(&document));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Constants and the shared record cells
//! - [`convert`] - Scalar type converters and the field-type bridge
//! - [`document`] - Values, documents and lists
//! - [`errors`] - Error types and result definitions
//! - [`index`] - Index declarations and derived index specs
//! - [`mapper`] - The mapping context and its builder
//! - [`query`] - Query, update, projection, group and pipeline builders
//! - [`schema`] - Entity declarations and derived schemas
//! - [`store`] - The driver seam, the typed collection and an in-memory store

pub mod common;
pub mod convert;
pub mod document;
pub mod errors;
pub mod index;
pub mod mapper;
pub mod query;
pub mod schema;
pub mod store;
