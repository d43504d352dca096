//! The driver seam and the typed collection.
//!
//! A [`DocumentStore`] is anything that can find, write and remove plain
//! documents and run database commands. [`Collection`] puts a
//! [`Mapper`](crate::mapper::Mapper) in front of a store so callers work
//! with typed records. [`InMemoryStore`] is a process-local store.

mod collection;
mod driver;
mod memory;

pub use collection::{Collection, Cursor};
pub use driver::{DocumentCursor, DocumentStore, WriteOutcome};
pub use memory::InMemoryStore;
