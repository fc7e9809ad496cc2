//! `salescast` library crate.
//!
//! The binary (`salescast`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - stages (cleaning, features, forecasting) are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod clean;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
