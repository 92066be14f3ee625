//! `rock-abundance` library crate.
//!
//! The binary (`rocks`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting and scheduling paths can be driven from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cfa;
pub mod cli;
pub mod compare;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod scheduler;
pub mod telemetry;
