mod statistics;

pub use statistics::*;
