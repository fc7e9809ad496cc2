//! Raw records -> cleaned records.

pub mod cleaner;
pub mod impute;
pub mod outliers;

pub use cleaner::*;
pub use impute::*;
pub use outliers::*;
