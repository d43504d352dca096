#![recursion_limit = "128"]
//! # docmap Derive Macros
//!
//! This crate provides procedural macros that generate the registration code
//! docmap needs for mapped types.
//!
//! ## Macros
//!
//! ### `Entity`
//!
//! Derives `docmap::schema::Entity` for structs with named fields. The
//! generated `describe` declares every non-transient field with accessors,
//! together with the storage name and the indexes given in attributes.
//!
//! - **Type attribute**: `#[entity(name = "...", embedded, index(...), text_index(...))]`
//! - **Field attribute**: `#[property(name = "...", id, overflow, transient, base, indexed(...))]`
//!
//! # Examples
//!
//! ```rust,ignore
//! use docmap_derive::Entity;
//!
//! #[derive(Entity, Default)]
//! #[entity(name = "posts", index(fields = "author, -created", unique))]
//! pub struct Post {
//!     #[property(id)]
//!     pub id: Option<String>,
//!     #[property(indexed(descending))]
//!     pub created: i64,
//!     pub author: String,
//!     #[property(transient)]
//!     pub dirty: bool,
//! }
//! ```
//!
//! ### `DocEnum`
//!
//! Derives `docmap::convert::DocEnum` and `docmap::convert::FieldType` for
//! fieldless enums, storing each variant by name.
//!
//! - **Variant attribute**: `#[doc_enum(name = "...")]` overrides the stored name
//!
//! # Examples
//!
//! ```rust,ignore
//! use docmap_derive::DocEnum;
//!
//! #[derive(DocEnum, Default)]
//! pub enum Status {
//!     #[default]
//!     Active,
//!     #[doc_enum(name = "gone")]
//!     Inactive,
//! }
//! ```
//!
//! ## Error Messages
//!
//! - **Entity**: only structs with named fields are supported
//! - **DocEnum**: only enums whose variants carry no data are supported

extern crate proc_macro;
mod doc_enum;
mod entity;

use crate::doc_enum::generate_doc_enum;
use crate::entity::generate_entity_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Entity` trait for a struct.
///
/// # Attributes
///
/// Type level, in `#[entity(...)]`:
/// - `name = "..."` - the storage (collection) name
/// - `embedded` - the type is only stored inside other documents
/// - `index(fields = "a, -b", name = "...", unique, sparse)` - a compound index;
///   a leading `-` sorts the field descending
/// - `text_index(fields = "title:2, body", name = "...", language = "...")` - a
///   text index with optional weights
///
/// Field level, in `#[property(...)]`:
/// - `name = "..."` - the storage name of the field
/// - `id` - the field maps to `_id`
/// - `overflow` - the field holds unmapped keys
/// - `transient` - the field is not mapped
/// - `base` - the field holds a base type whose fields are flattened in
/// - `indexed(name = "...", descending, unique, sparse)` - a single-field index
///
/// # Errors
///
/// Returns a compile error if:
/// - Applied to an enum, a union, a tuple struct or a unit struct
/// - An attribute key is unknown
/// - A `base` field carries other property attributes
#[proc_macro_derive(Entity, attributes(entity, property))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => match generate_entity_for_struct(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => e.to_compile_error().into(),
        },
        Data::Enum(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Entity for enums. Use #[derive(DocEnum)] for enums stored by name.",
            );
            error.to_compile_error().into()
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Entity for unions. Only structs are supported.",
            );
            error.to_compile_error().into()
        }
    }
}

/// Derives name-based storage for a fieldless enum.
///
/// Each variant is stored as a string: its identifier, or the name given
/// with `#[doc_enum(name = "...")]`. Reading an unknown name fails with a
/// conversion error and reading null yields `Default::default()`, so the
/// enum must implement `Default`.
///
/// # Errors
///
/// Returns a compile error if:
/// - Applied to a struct or a union
/// - A variant carries data
/// - Two variants share a stored name
#[proc_macro_derive(DocEnum, attributes(doc_enum))]
pub fn derive_doc_enum(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Enum(ref data) => match generate_doc_enum(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => {
                let error = syn::Error::new_spanned(
                    &ast,
                    format!("Failed to derive DocEnum for enum '{}': {}", ast.ident, e),
                );
                error.to_compile_error().into()
            }
        },
        _ => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive DocEnum for structs or unions. Only fieldless enums are supported.",
            );
            error.to_compile_error().into()
        }
    }
}
