//! Reporting utilities: summary statistics and formatted terminal output.
//!
//! Formatting lives apart from the pipeline so output changes stay local.

pub mod format;
pub mod summary;

pub use format::*;
pub use summary::*;
