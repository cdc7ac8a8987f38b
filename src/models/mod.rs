mod paging;
mod statistics;

pub use paging::*;
pub use statistics::*;
