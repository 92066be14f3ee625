//! Curve fitting.
//!
//! - exponential rock-abundance model by Levenberg-Marquardt (`exponential`)
//! - power law by log-log regression (`power_law`)

pub mod exponential;
pub mod power_law;

pub use exponential::*;
pub use power_law::*;
