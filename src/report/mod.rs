//! Corp summary rendering.
//!
//! Turns balance records into the fixed-width table and summary fields
//! posted to Discord.

pub mod generator;

pub use generator::*;
