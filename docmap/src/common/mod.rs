mod constants;
mod util;

pub use constants::*;
pub use util::*;
