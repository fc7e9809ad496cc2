//! Feature engineering: category encoding and per-series trailing aggregates.

pub mod builder;
pub mod encoding;

pub use builder::*;
pub use encoding::*;
