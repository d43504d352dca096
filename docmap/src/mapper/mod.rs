//! The mapping context: schema cache, identity cache and the conversions
//! between typed records and their live document views.

mod builder;
mod identity;
#[allow(clippy::module_inception)]
mod mapper;

pub use builder::MapperBuilder;
pub use mapper::Mapper;
