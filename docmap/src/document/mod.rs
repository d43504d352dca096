//! The document model: [`Value`], [`Document`] and [`DocumentList`].
//!
//! Documents are shared handles that are either free-standing ordered maps
//! or live views over typed records bound by the [`Mapper`](crate::mapper::Mapper).

pub(crate) mod binding;
mod display;
mod document;
mod list;
#[cfg(feature = "serde")]
mod serde_impl;
mod value;

pub use document::{normalize, Document};
pub(crate) use document::WeakDocument;
pub use list::DocumentList;
pub(crate) use list::WeakDocumentList;
pub use value::*;
