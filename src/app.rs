//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments and layers config (defaults, TOML, flags)
//! - runs the pipeline
//! - prints reports/charts
//! - writes exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CleanArgs, Command, PipelineArgs, RunArgs, SampleArgs, ShowArgs};
use crate::data::{generate_sample, SampleSpec};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::io::ingest::load_record_set;

pub mod pipeline;

/// Entry point for the `salescast` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Clean(args) => handle_clean(args),
        Command::Show(args) => handle_show(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Log to stderr so stdout stays clean for reports. `RUST_LOG` overrides `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a subscriber may already be set (e.g. when embedded); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline)?;
    let raw = load_record_set(&args.pipeline.input)?;
    let mut output = pipeline::run_detailed(&raw, &config)?;

    // Exports happen only after the whole run succeeded.
    if let Some(dir) = &args.out_dir {
        output.bundle.artifacts =
            crate::io::export::write_exports(dir, &output.bundle, &output.cleaned.records)?;
    }

    println!("{}", crate::report::format_run_summary(&output.bundle));
    if !args.no_plot {
        println!(
            "{}",
            crate::plot::render_bundle_chart(&output.bundle, args.width, args.height)
        );
    }
    for artifact in &output.bundle.artifacts {
        println!("wrote {} ({})", artifact.path.display(), artifact.kind);
    }
    Ok(())
}

fn handle_evaluate(args: PipelineArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args)?;
    let raw = load_record_set(&args.input)?;
    let metrics = pipeline::evaluate_only(&raw, &config)?;
    print!("{}", crate::report::format_metrics(&metrics));
    Ok(())
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline)?;
    let raw = load_record_set(&args.pipeline.input)?;
    let cleaned = pipeline::clean_only(&raw, &config)?;
    crate::io::export::write_cleaned_csv(&args.output, &cleaned.records)?;

    print!("{}", crate::report::format_cleaning(&cleaned.summary));
    println!("wrote {}", args.output.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let bundle = crate::io::bundle::read_bundle_json(&args.bundle)?;
    println!("{}", crate::report::format_run_summary(&bundle));
    println!(
        "{}",
        crate::plot::render_bundle_chart(&bundle, args.width, args.height)
    );
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = SampleSpec {
        start_date: args.start_date,
        days: args.days,
        regions: args.regions,
        products: args.products,
        seed: args.seed,
        ..SampleSpec::default()
    };
    let records = generate_sample(&spec)?;
    crate::io::export::write_record_set_csv(&args.output, &records)?;
    println!("wrote {} records to {}", records.len(), args.output.display());
    Ok(())
}

/// Defaults, then the optional TOML file, then explicit flags.
pub fn pipeline_config_from_args(args: &PipelineArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = &args.date_format {
        config.date_format = v.clone();
    }
    if let Some(v) = args.impute {
        config.impute = v;
    }
    if let Some(v) = args.outlier_policy {
        config.outlier_policy = v;
    }
    if let Some(v) = args.outlier_multiplier {
        config.outlier_multiplier = v;
    }
    if let Some(v) = args.window {
        config.trailing_window = v;
    }
    if let Some(v) = args.trees {
        config.forest.n_trees = v;
    }
    if let Some(v) = args.max_depth {
        config.forest.max_depth = v;
    }
    if let Some(v) = args.min_samples_split {
        config.forest.min_samples_split = v;
    }
    if let Some(v) = args.min_samples_leaf {
        config.forest.min_samples_leaf = v;
    }
    if let Some(v) = args.max_features {
        config.forest.max_features = Some(v);
    }
    if let Some(v) = args.seed {
        config.forest.seed = v;
    }
    if let Some(v) = args.holdout_fraction {
        config.holdout_fraction = v;
    }
    if let Some(v) = args.holdout_rows {
        config.holdout_rows = Some(v);
    }
    if let Some(v) = args.horizon {
        config.forecast_horizon = v;
    }

    config.validate()?;
    Ok(config)
}
