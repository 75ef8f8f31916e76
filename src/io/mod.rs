//! Input/output helpers.
//!
//! - wide CSV read/write (`table`)
//! - timestamped run exports (CSV/JSON) (`export`)

pub mod export;
pub mod table;

pub use export::*;
pub use table::*;
