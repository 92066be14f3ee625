//! Data sources other than site files.
//!
//! - seeded synthetic sites drawn from the exponential model (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
