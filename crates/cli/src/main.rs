//! Luna upgrade simulator
//!
//! Runs a built-in network upgrade plan against a JSON ledger snapshot and
//! writes the migrated state together with a report of what was burned,
//! raised, and migrated. Nothing here talks to a live node.

mod settings;
mod simulate;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use luna_upgrades::upgrade_plans_with;
use settings::{LogFormat, SimConfig};
use simulate::{load_ledger, load_overrides, write_ledger, Simulation};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "luna-upgrade-sim")]
#[command(about = "Dry-run Luna network upgrades against a ledger snapshot", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./luna-upgrade-sim.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Network gate overrides (TOML)
    #[arg(long, value_name = "PATH")]
    overrides: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in plans and the steps they resolve to on a network
    Plans {
        /// Chain id to resolve network gates for
        #[arg(long)]
        chain_id: String,
    },
    /// Apply one plan to a ledger snapshot
    Run(RunCommand),
}

#[derive(Args)]
struct RunCommand {
    /// Ledger snapshot (JSON)
    #[arg(long, value_name = "PATH")]
    state: PathBuf,

    /// Plan name, e.g. v2.12
    #[arg(long)]
    plan: String,

    /// Replace the snapshot's chain id
    #[arg(long)]
    chain_id: Option<String>,

    /// Replace the snapshot's block height
    #[arg(long)]
    height: Option<u64>,

    /// Where to write the migrated ledger
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Where to write the report (printed to stdout otherwise)
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SimConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(path) = cli.overrides {
        config.overrides = Some(path);
    }

    init_logging(&config);
    let overrides = load_overrides(config.overrides.as_deref())?;

    match cli.command {
        Commands::Plans { chain_id } => {
            for plan in upgrade_plans_with(&chain_id, &overrides)? {
                let steps: Vec<&str> = plan.steps.iter().map(|step| step.name()).collect();
                if steps.is_empty() {
                    println!("{}: no-op", plan.name);
                } else {
                    println!("{}: {}", plan.name, steps.join(", "));
                }
            }
        }
        Commands::Run(args) => {
            let mut ledger = load_ledger(&args.state)?;
            let simulation = Simulation {
                plan: args.plan,
                chain_id: args.chain_id,
                height: args.height,
                overrides,
                modules: config.modules,
                stored_versions: config.stored_versions,
            };
            let report = simulation.run(&mut ledger)?;

            if let Some(path) = &args.output {
                write_ledger(path, &ledger)?;
            }
            let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            match &args.report {
                Some(path) => fs::write(path, json)
                    .with_context(|| format!("failed to write report {}", path.display()))?,
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &SimConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}
