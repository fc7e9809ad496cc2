//! Forecasting orchestration.
//!
//! Responsibilities:
//!
//! - fit a random forest on historical feature rows (`forecaster`)
//! - predict future days for every trained series (`forecaster`)
//! - score the forecaster on a chronological holdout (`evaluator`)

pub mod evaluator;
pub mod forecaster;

pub use evaluator::*;
pub use forecaster::*;
