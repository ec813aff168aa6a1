//! Arthya CLI
//!
//! # Usage
//!
//! ```bash
//! # Fit a model for user 7 from raw daily records
//! arthya train --user 7 data/user_7.csv
//!
//! # Refit from the stored model with new data
//! arthya retrain --user 7 data/user_7.csv
//!
//! # Train several users
//! arthya batch --input 1=data/u1.csv --input 2=data/u2.csv --output json
//!
//! # Forecast the next two weeks
//! arthya predict --user 7 data/user_7.csv --days 14
//!
//! # Check a configuration file
//! arthya validate arthya.yaml --detailed
//! ```

use arthya::config::{
    apply_overrides, load_config, validate_config, BatchArgs, Cli, Command, ConfigOverrides,
    OutputFormat, PipelineConfig, PredictArgs, TrainArgs, ValidateArgs,
};
use arthya::data::{load_feature_csv, load_records_csv, FeatureFrame};
use arthya::pipeline::{IncomeForecast, Pipeline, TrainingRun};
use arthya::tracking::{sink_from_config, TrackingSink};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

type CliPipeline = Pipeline<Box<dyn TrackingSink>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Train(args) => run_train(args, false),
        Command::Retrain(args) => run_train(args, true),
        Command::Batch(args) => run_batch(args),
        Command::Predict(args) => run_predict(args),
        Command::Validate(args) => run_validate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `-q` wins over `-v`; without either, `RUST_LOG` or `info`
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(overrides: &ConfigOverrides) -> Result<PipelineConfig, String> {
    let mut config = match &overrides.config {
        Some(path) => load_config(path).map_err(|e| e.to_string())?,
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    validate_config(&config).map_err(|e| format!("Invalid config: {e}"))?;
    Ok(config)
}

fn build_pipeline(overrides: &ConfigOverrides) -> Result<CliPipeline, String> {
    let config = resolve_config(overrides)?;
    let sink = sink_from_config(&config.tracking);
    Pipeline::new(config, sink).map_err(|e| e.to_string())
}

fn read_frame(pipeline: &CliPipeline, path: &Path, prepared: bool) -> Result<FeatureFrame, String> {
    let frame = if prepared {
        load_feature_csv(path)
    } else {
        load_records_csv(path).and_then(|records| pipeline.features_from_records(&records))
    };
    frame.map_err(|e| format!("{}: {e}", path.display()))
}

fn run_train(args: TrainArgs, warm: bool) -> Result<(), String> {
    let pipeline = build_pipeline(&args.overrides)?;
    let frame = read_frame(&pipeline, &args.data, args.prepared)?;

    let run = if warm {
        pipeline.retrain(args.user, &frame)
    } else {
        pipeline.train(args.user, &frame)
    }
    .map_err(|e| e.to_string())?;

    if let Some(path) = &args.series {
        run.series
            .write_csv(path)
            .map_err(|e| format!("Failed to write series: {e}"))?;
    }
    print_run(&run, args.output)
}

fn run_batch(args: BatchArgs) -> Result<(), String> {
    let pipeline = build_pipeline(&args.overrides)?;
    let inputs: BTreeMap<_, _> = args.inputs.into_iter().collect();
    let runs = pipeline.batch_train(&inputs);

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&runs)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Text => {
            for run in runs.values() {
                print_run(run, OutputFormat::Text)?;
            }
        }
    }

    let failed = runs.values().filter(|r| !r.is_success()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} users failed", runs.len()));
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), String> {
    let pipeline = build_pipeline(&args.overrides)?;
    let frame = read_frame(&pipeline, &args.data, args.prepared)?;

    let forecast = match args.days {
        Some(days) => pipeline.forecast_days(args.user, &frame, days),
        None => pipeline.predict(args.user, &frame),
    }
    .map_err(|e| e.to_string())?;

    print_forecast(&forecast, args.output)
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let config = load_config(&args.config).map_err(|e| e.to_string())?;
    println!("Configuration is valid: {}", args.config.display());

    if args.detailed {
        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| format!("YAML serialization error: {e}"))?;
        println!();
        println!("{yaml}");
    }
    Ok(())
}

fn print_run(run: &TrainingRun, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(run)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Text => {
            let status = match run.error_kind() {
                None => "ok".to_string(),
                Some(kind) => format!("failed ({kind})"),
            };
            println!("user {} {}: {status}", run.user, run.kind);
            if !run.is_success() {
                if let arthya::pipeline::RunStatus::Failed { message, .. } = &run.status {
                    println!("  error: {message}");
                }
                return Ok(());
            }
            println!(
                "  rows: {} (train {}, validation {}, test {})",
                run.samples.total, run.samples.train, run.samples.validation, run.samples.test
            );
            let partitions = [
                ("train", run.metrics.train),
                ("validation", run.metrics.validation),
                ("test", run.metrics.test),
            ];
            for (name, metrics) in partitions {
                if let Some(m) = metrics {
                    let r2 = m.r2.map_or("undefined".to_string(), |r| format!("{r:.4}"));
                    println!(
                        "  {name}: mae {:.4}, rmse {:.4}, r2 {r2}",
                        m.mae, m.rmse
                    );
                }
            }
            if let Some(path) = &run.artifact_path {
                println!(
                    "  artifact: {} (version {})",
                    path.display(),
                    run.artifact_version.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn print_forecast(forecast: &IncomeForecast, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(forecast)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Text => {
            println!(
                "user {} (model version {})",
                forecast.user, forecast.artifact_version
            );
            for p in &forecast.predictions {
                println!(
                    "  {}  {:>10.0}  [{:.0}, {:.0}]",
                    p.ds, p.income, p.income_lower, p.income_upper
                );
            }
            println!("  total: {:.0}", forecast.total());
        }
    }
    Ok(())
}
