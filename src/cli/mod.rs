//! Command-line parsing for the sales forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code. Every pipeline flag is optional: when absent, the value from
//! `--config` (or the built-in default) is used.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{ImputeStrategy, OutlierPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "salescast", version, about = "Sales cleaning, forecasting and reporting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline: clean, evaluate, forecast, report and export.
    Run(RunArgs),
    /// Print holdout metrics only (useful for scripting).
    Evaluate(PipelineArgs),
    /// Clean an input file and write the cleaned records as CSV.
    Clean(CleanArgs),
    /// Print a previously saved result bundle.
    Show(ShowArgs),
    /// Write a synthetic sales dataset.
    Sample(SampleArgs),
}

/// Input and pipeline overrides shared by the data-processing commands.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// Input sales file (.csv, .txt or .tsv).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// TOML config file; flags below override its values.
    #[arg(short = 'c', long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// chrono format of the date column (e.g. %m/%d/%Y).
    #[arg(long)]
    pub date_format: Option<String>,

    /// Statistic used to fill missing amounts.
    #[arg(long, value_enum)]
    pub impute: Option<ImputeStrategy>,

    /// What to do with amounts outside the IQR fences.
    #[arg(long, value_enum)]
    pub outlier_policy: Option<OutlierPolicy>,

    /// IQR multiplier for the outlier fences.
    #[arg(long)]
    pub outlier_multiplier: Option<f64>,

    /// Trailing window length in days.
    #[arg(long)]
    pub window: Option<u32>,

    /// Number of trees in the forest.
    #[arg(long)]
    pub trees: Option<usize>,

    /// Maximum tree depth.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum samples needed to split a node.
    #[arg(long)]
    pub min_samples_split: Option<usize>,

    /// Minimum samples per leaf.
    #[arg(long)]
    pub min_samples_leaf: Option<usize>,

    /// Features considered per split.
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Random seed for the forest.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Share of historical rows held out for evaluation.
    #[arg(long)]
    pub holdout_fraction: Option<f64>,

    /// Exact number of holdout rows (overrides the fraction).
    #[arg(long)]
    pub holdout_rows: Option<usize>,

    /// Days to forecast after the last observed day.
    #[arg(long)]
    pub horizon: Option<u32>,
}

/// Options for a full run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Directory for CSV exports and the result bundle JSON.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Disable the terminal chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for cleaning only.
#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Where to write the cleaned CSV.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Options for printing a saved bundle.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Bundle JSON written by `salescast run --out-dir`.
    #[arg(long, value_name = "JSON")]
    pub bundle: PathBuf,

    /// Chart width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Where to write the dataset CSV.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Number of days to generate.
    #[arg(long, default_value_t = 31)]
    pub days: u32,

    /// First date (YYYY-MM-DD).
    #[arg(long, default_value = "2025-10-01")]
    pub start_date: NaiveDate,

    /// Comma-separated region names.
    #[arg(long, value_delimiter = ',', default_value = "华北,华东,华南,West")]
    pub regions: Vec<String>,

    /// Comma-separated product ids.
    #[arg(long, value_delimiter = ',', default_value = "P001,P002,P003")]
    pub products: Vec<String>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
