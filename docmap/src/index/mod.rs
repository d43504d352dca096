//! Index specification derivation.
//!
//! Index declarations on an entity (type-level [`IndexDecl`]s and
//! [`TextIndexDecl`]s, and per-field [`IndexedDecl`]s) are turned into
//! [`IndexSpec`]s: a key document plus an options document, ready for the
//! store's `ensure_index`.
//!
//! # Naming
//!
//! When no explicit name is given the canonical store name is derived from
//! the keys, so re-deriving the same index on every start is idempotent
//! against the index the store already holds:
//!
//! ```rust
//! use docmap::index::IndexSpec;
//!
//! let spec = IndexSpec::new(None, &["-x", "y"], false, false).unwrap();
//! assert_eq!(spec.name(), "x_-1_y_1");
//! ```

mod fields;
mod options;
mod spec;

pub use fields::*;
pub use options::*;
pub use spec::*;
