//! PipeGuard - pipeline leak detection CLI
//!
//! Classifies every row of a sensor snapshot file as leak / no-leak and
//! locates predicted leaks along the pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Batch inference (default command)
//! pipeguard snapshots.csv
//! pipeguard predict snapshots.csv
//!
//! # Single snapshot as JSON lines
//! echo '{"P_0": 100000, "P_500": 99980, "A_0": 0.01, "A_500": 0.4}' | pipeguard predict --stdin
//!
//! # Training matrix, evaluation, physics breakdown
//! pipeguard prepare labelled.csv --output features.csv
//! pipeguard evaluate labelled.csv
//! pipeguard inspect snapshots.csv --run-id Run_12
//! ```
//!
//! Stdout carries exactly one JSON line. Logs go to stderr.
//!
//! # Environment Variables
//!
//! - `PIPEGUARD_CONFIG`: Path to a TOML config file
//! - `PIPEGUARD_MODEL_DIR`: Model artifact directory (default: `models`)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{anyhow, Result};
use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

use pipeguard::acquisition::{load_csv, load_json_lines};
use pipeguard::features::prepare_training_set;
use pipeguard::pipeline::{evaluate, inspect, render_error, render_line, InferencePipeline};
use pipeguard::{Dataset, LeakRegressor, ModelStore, PipelineConfig, PipelineError};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pipeguard")]
#[command(about = "Pipeline leak detection and localization")]
#[command(version)]
struct CliArgs {
    /// TOML config file (overrides $PIPEGUARD_CONFIG and ./pipeguard.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding leak_detector.json / leak_locator.json
    #[arg(long, global = true, env = "PIPEGUARD_MODEL_DIR", value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// CSV file to run inference on (same as `predict <CSV>`)
    csv: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Classify and locate leaks for every row
    Predict {
        /// Delimited sensor snapshot file
        csv: Option<PathBuf>,
        /// Read JSON objects, one per line, from stdin instead of a file
        #[arg(long, conflicts_with = "csv")]
        stdin: bool,
    },

    /// Derive the labelled training matrix
    Prepare {
        /// Labelled CSV (requires LeakLabel and Leak_Location)
        csv: PathBuf,
        /// Write features plus labels to this CSV
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Score the loaded models against a labelled CSV
    Evaluate {
        /// Labelled CSV (requires LeakLabel)
        csv: PathBuf,
    },

    /// Physics screening breakdown per row
    Inspect {
        /// Delimited sensor snapshot file
        csv: PathBuf,
        /// Only this Run_ID
        #[arg(long)]
        run_id: Option<String>,
    },
}

enum Input {
    File(PathBuf),
    Stdin,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ClapErrorKind::DisplayHelp
                    | ClapErrorKind::DisplayVersion
                    | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                e.exit();
            }
            let message = e.to_string();
            let first = message.lines().next().unwrap_or("invalid arguments");
            println!("{}", render_error(first.trim_start_matches("error: ")));
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.log_json);

    match run(args) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            println!("{}", render_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Dispatch and return the single stdout line.
fn run(args: CliArgs) -> Result<String> {
    let mut config = match &args.config {
        Some(path) => {
            let config = PipelineConfig::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from --config");
            config
        }
        None => PipelineConfig::load()?,
    };
    if let Some(dir) = args.model_dir {
        debug!(dir = %dir.display(), "Model directory override");
        config.models.dir = dir;
    }

    let command = args.command.unwrap_or(Command::Predict {
        csv: args.csv,
        stdin: false,
    });

    match command {
        Command::Predict { csv, stdin } => {
            let input = if stdin {
                Input::Stdin
            } else {
                Input::File(csv.ok_or_else(|| anyhow!("No CSV file path provided"))?)
            };
            cmd_predict(&config, &input)
        }
        Command::Prepare { csv, output } => cmd_prepare(&config, &csv, output.as_deref()),
        Command::Evaluate { csv } => cmd_evaluate(&config, &csv),
        Command::Inspect { csv, run_id } => cmd_inspect(&config, &csv, run_id.as_deref()),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_predict(config: &PipelineConfig, input: &Input) -> Result<String> {
    // Configuration errors first: input path, then mandatory model.
    if let Input::File(path) = input {
        ensure_exists(path)?;
    }
    let pipeline = build_pipeline(config)?;

    let dataset = match input {
        Input::File(path) => load_csv(path, config.dataset.delimiter_byte())?,
        Input::Stdin => load_json_lines(std::io::stdin().lock(), "stdin")?,
    };

    let report = pipeline.run(&dataset)?;
    Ok(render_line(&report)?)
}

fn cmd_prepare(config: &PipelineConfig, csv: &Path, output: Option<&Path>) -> Result<String> {
    let dataset = load_dataset(config, csv)?;
    let set = prepare_training_set(&dataset)?;
    if let Some(out) = output {
        set.write_csv(out)?;
        info!(path = %out.display(), rows = set.rows.len(), "Wrote training matrix");
    }
    Ok(render_line(&set.summary())?)
}

fn cmd_evaluate(config: &PipelineConfig, csv: &Path) -> Result<String> {
    ensure_exists(csv)?;
    let pipeline = build_pipeline(config)?;
    let dataset = load_dataset(config, csv)?;
    let report = pipeline.run(&dataset)?;
    let evaluation = evaluate(&dataset, &report)?;
    Ok(render_line(&evaluation)?)
}

fn cmd_inspect(config: &PipelineConfig, csv: &Path, run_id: Option<&str>) -> Result<String> {
    let dataset = load_dataset(config, csv)?;
    let inspection = inspect(&dataset, config, run_id)?;
    Ok(render_line(&inspection)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_exists(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::InputNotFound(path.to_path_buf()))
    }
}

fn load_dataset(config: &PipelineConfig, path: &Path) -> Result<Dataset, PipelineError> {
    load_csv(path, config.dataset.delimiter_byte())
}

fn build_pipeline(config: &PipelineConfig) -> Result<InferencePipeline, PipelineError> {
    let store = ModelStore::from_config(config);
    let classifier = store.load_classifier()?;
    let regressor = store
        .load_regressor()
        .map(|r| Box::new(r) as Box<dyn LeakRegressor>);

    let pipeline = InferencePipeline::from_config(Box::new(classifier), regressor, config);
    info!(
        classifier = %store.classifier_path().display(),
        regressor = pipeline.has_regressor(),
        parallel = config.inference.parallel,
        "Pipeline ready"
    );
    Ok(pipeline)
}
