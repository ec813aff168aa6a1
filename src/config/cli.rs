//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! arthya train --user 7 data/user_7.csv
//! arthya train --user 7 --prepared features.csv --config arthya.yaml
//! arthya retrain --user 7 data/user_7.csv --store ./models
//! arthya batch --input 1=data/u1.csv --input 2=data/u2.csv
//! arthya predict --user 7 data/user_7.csv --days 14
//! arthya validate arthya.yaml
//! ```

use super::schema::PipelineConfig;
use crate::ids::UserId;
use crate::io::ArtifactFormat;
use crate::pipeline::LockPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Arthya: per-user income forecasting
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "arthya")]
#[command(version)]
#[command(about = "Fit, retrain and query per-user income forecasting models")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fit a new model for one user
    Train(TrainArgs),

    /// Refit a user's model, warm-started from the stored one
    Retrain(TrainArgs),

    /// Train several users, one CSV each
    Batch(BatchArgs),

    /// Predict income with a stored model
    Predict(PredictArgs),

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Values that override the configuration file
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Path to YAML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the artifact store root
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Override the artifact format (json, yaml)
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ArtifactFormat>,

    /// Override the training fraction
    #[arg(long)]
    pub train_frac: Option<f64>,

    /// Override the held-out test fraction
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Fail instead of waiting when the user is already being fitted
    #[arg(long)]
    pub reject_busy: bool,
}

/// Arguments for train and retrain
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// User whose model is fitted
    #[arg(short, long)]
    pub user: UserId,

    /// CSV of daily records, or a feature table with --prepared
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// DATA is a prepared feature table with ds and Income_Total columns
    #[arg(long)]
    pub prepared: bool,

    /// Write the evaluation series (ds, actual, predicted) to this CSV
    #[arg(long)]
    pub series: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments for the batch command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct BatchArgs {
    /// USER=PATH pairs, one per user
    #[arg(short, long = "input", value_name = "USER=PATH", value_parser = parse_user_input, required = true)]
    pub inputs: Vec<(UserId, PathBuf)>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments for the predict command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PredictArgs {
    #[arg(short, long)]
    pub user: UserId,

    /// Rows to predict, or the history to extend with --days
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    #[arg(long)]
    pub prepared: bool,

    /// Forecast this many days after the last date in DATA
    #[arg(short, long)]
    pub days: Option<usize>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Print the effective configuration
    #[arg(short, long)]
    pub detailed: bool,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown output format: {s}. Valid formats: text, json"
            )),
        }
    }
}

fn parse_format(s: &str) -> Result<ArtifactFormat, String> {
    ArtifactFormat::from_extension(s)
        .ok_or_else(|| format!("Unknown artifact format: {s}. Valid formats: json, yaml"))
}

fn parse_user_input(s: &str) -> Result<(UserId, PathBuf), String> {
    let (user, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected USER=PATH, got {s}"))?;
    let user: UserId = user
        .parse()
        .map_err(|e| format!("invalid user id {user:?}: {e}"))?;
    if path.is_empty() {
        return Err(format!("missing path for user {user}"));
    }
    Ok((user, PathBuf::from(path)))
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a loaded configuration
pub fn apply_overrides(config: &mut PipelineConfig, overrides: &ConfigOverrides) {
    if let Some(store) = &overrides.store {
        config.store.root = store.clone();
    }
    if let Some(format) = overrides.format {
        config.store.format = format;
    }
    if let Some(train_frac) = overrides.train_frac {
        config.split.train_frac = train_frac;
    }
    if let Some(test_size) = overrides.test_size {
        config.split.test_size = test_size;
    }
    if overrides.reject_busy {
        config.concurrency.lock_policy = LockPolicy::Reject;
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_train_user_roundtrips(user in 0u64..u64::MAX, name in "[a-z][a-z0-9_]{0,12}\\.csv") {
            let user_str = user.to_string();
            let cli = parse_args(["arthya", "train", "--user", user_str.as_str(), name.as_str()]).unwrap();
            match cli.command {
                Command::Train(args) => {
                    prop_assert_eq!(args.user, UserId::new(user));
                    prop_assert_eq!(args.data.to_str().unwrap(), name.as_str());
                }
                _ => prop_assert!(false, "Expected Train command"),
            }
        }

        #[test]
        fn prop_batch_pairs_parse(ids in proptest::collection::btree_set(0u64..10_000, 1..6)) {
            let mut argv = vec!["arthya".to_string(), "batch".to_string()];
            for id in &ids {
                argv.push("--input".to_string());
                argv.push(format!("{id}=user_{id}.csv"));
            }
            let cli = parse_args(argv).unwrap();
            match cli.command {
                Command::Batch(args) => {
                    prop_assert_eq!(args.inputs.len(), ids.len());
                    for ((user, path), id) in args.inputs.iter().zip(&ids) {
                        prop_assert_eq!(user.get(), *id);
                        prop_assert_eq!(path.clone(), PathBuf::from(format!("user_{id}.csv")));
                    }
                }
                _ => prop_assert!(false, "Expected Batch command"),
            }
        }
    }
}
