#![allow(clippy::field_reassign_with_default)]
// #![warn(missing_docs)]

//! Crate containing longitudinal vehicle dynamics and drive-cycle energy models
//! for sizing the powertrain and battery of electric vehicles.
//! # Features:
//! - logging: emit `log` records for derived coefficients and degraded results (default)
//! - bincode: enable binary (de)serialization in [`traits::SerdeAPI`]

#[macro_use]
pub mod macros;

pub mod battery;
pub mod drive_cycle;
pub mod drivetrain;
pub mod dynamics;
pub mod energy;
pub mod environment;
pub mod error;
pub mod forces;
pub mod imports;
pub mod motion;
pub mod params;
pub mod power;
pub mod prelude;
pub mod scenario;
pub mod traits;
pub mod utils;
pub mod vehicle;
