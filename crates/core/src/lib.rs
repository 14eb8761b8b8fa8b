pub mod catalog;
pub mod display;
pub mod model;
pub mod vote;

pub use model::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
