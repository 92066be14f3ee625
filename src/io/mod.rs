//! Input/output helpers.
//!
//! - site dataset CSV ingest + validation (`ingest`)
//! - statistics CSVs, GIS export and run info (`export`)
//! - per-partition measurement records (`store`)

pub mod export;
pub mod ingest;
pub mod store;

pub use export::*;
pub use ingest::*;
pub use store::*;
