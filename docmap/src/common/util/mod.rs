mod shared;

pub use shared::*;
