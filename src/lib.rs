//! Bridges a plain HTTP temperature sensor to a host that wants both
//! on-demand reads and pushed value changes.

pub mod config;
pub mod externals;
pub mod internals;
pub mod models;
