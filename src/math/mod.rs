//! Numeric primitives for the NIV pipeline: lagged changes, rolling
//! statistics, kernel smoothing, clipping and compression.

pub mod kernel;
pub mod rolling;
pub mod transforms;

pub use kernel::*;
pub use rolling::*;
pub use transforms::*;
