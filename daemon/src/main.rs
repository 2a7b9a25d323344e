//! Curation daemon — operator CLI over a node's governance store.

mod config;
mod outbox;

use anyhow::Context;
use clap::Parser;
use config::DaemonConfig;
use curation_governance::CurationEngine;
use curation_store_lmdb::LmdbEnvironment;
use curation_types::{Address, Clock, Identity, SystemClock};
use curation_utils::{format_deadline, init_tracing, LogFormat};
use outbox::{OfflineLedger, OutboxRegistry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "curation-daemon", about = "Curation governance operator CLI")]
struct Cli {
    /// Data directory for the governance store.
    /// When a config file is provided, defaults to the file's value.
    #[arg(long, env = "CURATION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CURATION_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CURATION_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CURATION_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the effective governance parameters as TOML.
    Params,
    /// List every current application.
    List,
    /// Show a subject's application.
    Show {
        subject: String,
        /// Show an archived submission instead of the current one.
        #[arg(long)]
        sequence: Option<u32>,
    },
    /// Show a round and its deposits.
    Round { subject: String, index: u32 },
    /// Page through the governance message log.
    Messages {
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, default_value_t = 100)]
        end: u64,
    },
    /// Finalize a subject's current round once its voting period ended.
    Finalize { subject: String },
    /// Retry master registry delivery for registered applications.
    Reconcile,
    /// Lame duck controls.
    #[command(name = "lame-duck")]
    LameDuck {
        #[command(subcommand)]
        action: LameDuckAction,
    },
}

#[derive(clap::Subcommand)]
enum LameDuckAction {
    /// Show whether lame duck mode is active.
    Status,
    /// Enter lame duck mode. The address must be listed in `admins`.
    Enter {
        #[arg(long)]
        admin: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<DaemonConfig> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log_level, LogFormat::parse(&config.log_format));
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    if let Command::Params = cli.command {
        print!("{}", toml::to_string_pretty(&config.params)?);
        return Ok(());
    }

    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let clock = Arc::new(SystemClock);
    let engine = CurationEngine::new(
        Arc::new(env.governance_store()),
        Arc::new(OfflineLedger),
        Arc::new(OutboxRegistry::new(config.registry_outbox_path())),
        clock.clone(),
        config.params.clone(),
    )?;

    match cli.command {
        Command::Params => {}
        Command::List => print_json(&engine.list_applications()?)?,
        Command::Show { subject, sequence } => {
            let subject = Address::parse(&subject)?;
            let app = match sequence {
                Some(seq) => engine.get_archived_application(&subject, seq)?,
                None => engine.get_application(&subject)?,
            };
            print_json(&app)?;
        }
        Command::Round { subject, index } => {
            let subject = Address::parse(&subject)?;
            print_json(&serde_json::json!({
                "round": engine.get_round(&subject, index)?,
                "deposits": engine.get_round_deposits(&subject, index)?,
            }))?;
        }
        Command::Messages { start, end } => print_json(&engine.get_messages(start, end)?)?,
        Command::Finalize { subject } => {
            let subject = Address::parse(&subject)?;
            print_json(&engine.finalize_round(&subject)?)?;
        }
        Command::Reconcile => {
            let report = engine.reconcile_registrations()?;
            tracing::info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                outbox = %config.registry_outbox_path().display(),
                "reconciliation pass done"
            );
            print_json(&report)?;
        }
        Command::LameDuck { action } => match action {
            LameDuckAction::Status => {
                let now = clock.now();
                let status = engine.lame_duck_status().map(|state| {
                    serde_json::json!({
                        "entered_at": state.entered_at,
                        "entered_by": state.entered_by,
                        "freezes_at": state.freezes_at,
                        "freezes": format_deadline(now.as_secs(), state.freezes_at.as_secs()),
                    })
                });
                print_json(&status)?;
            }
            LameDuckAction::Enter { admin } => {
                let address = Address::parse(&admin)?;
                let caller = if config.is_admin(&address) {
                    Identity::admin(address)
                } else {
                    Identity::new(address)
                };
                let state = engine.enter_lame_duck(&caller)?;
                print_json(&state)?;
            }
        },
    }

    Ok(())
}
