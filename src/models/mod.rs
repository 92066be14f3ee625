//! Rock size-frequency model implementations.
//!
//! Models are small, pure functions so that the fitters and the plotting code
//! can share them.

pub mod model;

pub use model::*;
