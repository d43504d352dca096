//! Fluent builders for the documents a store understands: query
//! conditions, updates, projections, `$group` bodies and aggregation
//! pipelines.
//!
//! Builders own a private [`Document`](crate::document::Document) and hand
//! out deep copies, so a built document never aliases the builder.

mod group;
mod operator;
mod pipeline;
mod projection;
#[allow(clippy::module_inception)]
mod query;
mod update;

pub use group::Group;
pub use operator::{Operator, ALL_OPERATORS};
pub use pipeline::Pipeline;
pub use projection::Projection;
pub use query::Query;
pub use update::Update;
