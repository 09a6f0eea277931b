//! Clock control unit CLI.
//!
//! Builds the configured clocks on a simulated register bank, applies one
//! operation, and prints the resulting clock state.

mod status;

use anyhow::{Context, Result};
use ccu_common::CcuConfig;
use ccu_core::{ClockOps, ClockUnit};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::status::ClockStatus;

/// Clock control unit command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "ccu-cli",
    about = "Drive sunxi MMC clocks with new timing switch on a simulated register bank",
    version,
    long_about = None
)]
struct Args {
    /// Path to a clock configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every clock's control word and rate
    Show {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Negotiate a rate without programming it
    ///
    /// With NTS set, `set-rate` may program up to one divider step below
    /// an odd rounded rate.
    Round {
        /// Clock name
        clock: String,
        /// Requested rate in Hz
        rate: u64,
    },

    /// Negotiate and program a rate
    SetRate {
        /// Clock name
        clock: String,
        /// Requested rate in Hz
        rate: u64,
    },

    /// Select a parent by mux index
    SetParent {
        /// Clock name
        clock: String,
        /// Mux index
        index: u8,
    },

    /// Ungate a clock
    Enable {
        /// Clock name
        clock: String,
    },

    /// Gate a clock
    Disable {
        /// Clock name
        clock: String,
    },

    /// Switch the new timing mode bit
    Nts {
        /// Clock name
        clock: String,
        /// New mode
        mode: NtsMode,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum NtsMode {
    On,
    Off,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config = load_config(&args)?;
    let unit = ClockUnit::from_config(&config).context("Failed to build clock unit")?;

    run(&unit, &args.command)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("ccu_cli={level},ccu_core={level},ccu_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `CCU_CONFIG_PATH` environment variable
/// 3. `config/ccu.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<CcuConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return CcuConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    if let Ok(env_path) = std::env::var("CCU_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from CCU_CONFIG_PATH");
            return CcuConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from CCU_CONFIG_PATH={env_path}")
            });
        }
        warn!(
            path = %env_path,
            "CCU_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/ccu.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return CcuConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {}", local_path.display()));
    }

    info!("No config file found, using built-in defaults");
    Ok(CcuConfig::default())
}

/// Apply `command` to the unit and print the outcome.
fn run(unit: &ClockUnit, command: &Command) -> Result<()> {
    match command {
        Command::Show { json } => {
            let statuses: Vec<_> = unit
                .clocks()
                .iter()
                .map(|clock| ClockStatus::capture(unit, clock))
                .collect();
            if *json {
                let out = serde_json::to_string_pretty(&statuses)
                    .context("Failed to serialize clock state")?;
                println!("{out}");
            } else {
                for status in &statuses {
                    println!("{status}");
                }
            }
            return Ok(());
        }
        Command::Round { clock, rate } => {
            let clk = unit.clock(clock)?;
            let req = unit
                .negotiate(clk, *rate)
                .with_context(|| format!("Cannot reach {rate} Hz on {clock}"))?;
            let parent = req
                .best_parent_index
                .and_then(|i| clk.parents().get(usize::from(i)))
                .map_or("?", String::as_str);
            println!(
                "{clock}: {rate} Hz rounds to {} Hz from {parent} ({} Hz)",
                req.rate, req.best_parent_rate
            );
            return Ok(());
        }
        Command::SetRate { clock, rate } => {
            let clk = unit.clock(clock)?;
            unit.change_rate(clk, *rate)
                .with_context(|| format!("Failed to set {clock} to {rate} Hz"))?;
        }
        Command::SetParent { clock, index } => {
            unit.clock(clock)?
                .set_parent(*index)
                .with_context(|| format!("Failed to select parent {index} on {clock}"))?;
        }
        Command::Enable { clock } => unit.clock(clock)?.enable()?,
        Command::Disable { clock } => unit.clock(clock)?.disable()?,
        Command::Nts { clock, mode } => unit.clock(clock)?.set_nts(*mode == NtsMode::On)?,
    }

    let clock = match command {
        Command::SetRate { clock, .. }
        | Command::SetParent { clock, .. }
        | Command::Enable { clock }
        | Command::Disable { clock }
        | Command::Nts { clock, .. } => clock,
        Command::Show { .. } | Command::Round { .. } => return Ok(()),
    };
    println!("{}", ClockStatus::capture(unit, unit.clock(clock)?));
    Ok(())
}
