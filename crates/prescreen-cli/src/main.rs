//! prescreen - compile, apply and audit data-screening rules
//!
//! This is the main entry point for the CLI application.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prescreen_core::export::write_rules_csv;
use prescreen_core::{
    apply, audit, compile, drop_excluded, predicate, ArtifactWriter, Dataset, Manifest,
    RuleTable, ScreeningConfig,
};

#[derive(Parser, Debug)]
#[command(name = "prescreen", version, about = "Deterministic, auditable data screening")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a configuration and print the rule table
    Compile {
        /// Screening configuration (.yaml, .yml or .json)
        #[arg(long)]
        config: PathBuf,

        /// Dataset the rules will be checked against (.csv or .json)
        #[arg(long)]
        data: PathBuf,

        /// Print JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Screen a dataset and write every artifact
    Run {
        /// Screening configuration; without one no rules are applied
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        data: PathBuf,

        /// Output directory (created if missing)
        #[arg(long)]
        out: PathBuf,

        /// Write screened_data.csv without excluded rows
        #[arg(long)]
        drop_excluded: bool,
    },

    /// Check a predicate against the restricted grammar
    Check {
        predicate: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile { config, data, json } => run_compile(&config, &data, json),
        Commands::Run {
            config,
            data,
            out,
            drop_excluded,
        } => run_screening(config.as_deref(), &data, &out, drop_excluded).map(|manifest| {
            info!(rows = manifest.rows_written, "Screening complete");
        }),
        Commands::Check { predicate } => run_check(&predicate),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn load_config(path: &Path) -> Result<ScreeningConfig> {
    ScreeningConfig::from_path(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

fn load_data(path: &Path) -> Result<Dataset> {
    Dataset::from_path(path).with_context(|| format!("Failed to load dataset {}", path.display()))
}

fn compile_rules(config: Option<&ScreeningConfig>, data: &Dataset) -> Result<RuleTable> {
    compile(config, data).context("Failed to compile screening rules")
}

fn run_compile(config: &Path, data: &Path, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let data = load_data(data)?;
    let rules = compile_rules(Some(&config), &data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        write_rules_csv(&rules, io::stdout().lock())?;
    }
    Ok(())
}

fn run_screening(
    config: Option<&Path>,
    data: &Path,
    out: &Path,
    drop: bool,
) -> Result<Manifest> {
    let config = config.map(load_config).transpose()?;
    let data = load_data(data)?;
    let rules = compile_rules(config.as_ref(), &data)?;

    let screened = apply(&data, &rules).context("Failed to apply screening rules")?;
    let report = audit(&screened, &rules).context("Failed to aggregate audit tables")?;

    let written = if drop {
        drop_excluded(&screened)?
    } else {
        screened
    };

    let manifest = ArtifactWriter::new(out)
        .and_then(|writer| writer.write_all(&written, &rules, &report))
        .with_context(|| format!("Failed to write artifacts to {}", out.display()))?;

    for line in &report.summary {
        println!("{}", line);
    }
    for warning in &report.warnings {
        println!("[{}] {}", warning.severity, warning.message());
    }
    Ok(manifest)
}

fn run_check(source: &str) -> Result<()> {
    predicate::validate(source)?;
    let fields = predicate::fields_used(source)?;
    println!("OK (fields: {})", fields);
    Ok(())
}
