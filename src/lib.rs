//! `niv-engine` library crate.
//!
//! The binary (`niv`) is a thin wrapper around this library so that:
//!
//! - every pipeline phase is testable without spawning processes or touching
//!   the network
//! - the formulas and transforms are reusable on tables built elsewhere

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;
