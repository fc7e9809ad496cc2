//! Input/output helpers.
//!
//! - CSV ingest + schema validation (`ingest`)
//! - CSV exports (`export`)
//! - result bundle JSON read/write (`bundle`)

pub mod bundle;
pub mod export;
pub mod ingest;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
