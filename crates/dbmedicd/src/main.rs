//! dbmedicd - run database investigations from the command line.
//!
//! Probes answer from a telemetry snapshot; output is JSON on stdout unless
//! `--format text` is given. Logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dbmedic_common::{AlarmState, MedicError, Trigger};
use dbmedicd::probe::registry::ProbeRegistry;
use dbmedicd::probe::snapshot::{SnapshotProbe, TelemetrySnapshot};
use dbmedicd::{render, Investigator, MedicConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbmedicd")]
#[command(about = "Autonomous diagnostic orchestration for managed databases", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one investigation against a telemetry snapshot
    Investigate {
        /// Alarm trigger as METRIC[:STATE] (state defaults to ALARM)
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        alarm: Option<String>,

        /// Alarm name accompanying --alarm
        #[arg(long, requires = "alarm")]
        alarm_name: Option<String>,

        /// Free-text trigger
        #[arg(long)]
        text: Option<String>,

        /// Telemetry snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,

        /// Config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },

    /// List the probe registry
    Probes,

    /// List the scenario catalog with reduction ratios
    Scenarios {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_alarm(spec: &str, alarm_name: Option<String>) -> Result<Trigger> {
    let (metric, state) = match spec.split_once(':') {
        Some((metric, state)) => {
            let state = AlarmState::from_str(state)
                .with_context(|| format!("Unknown alarm state '{}' (expected OK, ALARM or INSUFFICIENT_DATA)", state))?;
            (metric, state)
        }
        None => (spec, AlarmState::Alarm),
    };
    if metric.trim().is_empty() {
        bail!("Alarm metric name must not be empty");
    }
    Ok(Trigger::Alarm {
        metric_name: metric.trim().to_string(),
        state,
        alarm_name,
    })
}

fn listing_registry() -> ProbeRegistry {
    ProbeRegistry::standard(SnapshotProbe::factory(Arc::new(TelemetrySnapshot::default())))
}

async fn investigate(
    trigger: Trigger,
    snapshot: PathBuf,
    config: Option<PathBuf>,
    format: Format,
) -> Result<ExitCode> {
    let config = MedicConfig::load(config.as_deref())?;
    let snapshot = Arc::new(
        TelemetrySnapshot::load(&snapshot)
            .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?,
    );
    let registry = Arc::new(ProbeRegistry::standard(SnapshotProbe::factory(snapshot)));
    let investigator = Investigator::new(config, registry);

    match investigator.investigate(trigger).await {
        Ok(investigation) => {
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&investigation)?),
                Format::Text => print!("{}", render::render_investigation(&investigation)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ MedicError::TotalFailure { .. }) => {
            error!("[{}] {}", e.code(), e);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("dbmedicd v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Investigate {
            alarm,
            alarm_name,
            text,
            snapshot,
            config,
            format,
        } => {
            let trigger = match (alarm, text) {
                (Some(alarm), _) => parse_alarm(&alarm, alarm_name)?,
                (None, Some(text)) => Trigger::FreeText { text },
                (None, None) => bail!("either --alarm or --text is required"),
            };
            investigate(trigger, snapshot, config, format).await
        }
        Commands::Probes => {
            print!("{}", render::render_probes(&listing_registry()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scenarios { config } => {
            let config = MedicConfig::load(config.as_deref())?;
            let investigator = Investigator::new(config, Arc::new(listing_registry()));
            print!(
                "{}",
                render::render_scenarios(
                    investigator.catalog(),
                    investigator.registry().count(),
                    investigator.catalog_issues()
                )
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
