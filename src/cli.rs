use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "housekeeper")]
#[command(version = "0.1.0")]
#[command(about = "Idle and event triggered housekeeping for long-running editors")]
pub struct CliArgs {
    /// Schedule file (defaults to the user config, if present)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Replay a trace of idle samples and events and report every dispatch
    Replay {
        /// Trace file with `tick <secs>` and `event <name>` lines
        trace: PathBuf,

        /// Emit one JSON object per step instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run a live host loop; stdin lines count as user input
    Watch {
        /// Seconds between host ticks
        #[arg(long, default_value = "1.0", value_parser = parse_tick)]
        tick: Duration,
    },
}

impl CliArgs {
    /// The explicit `--config` path, or the discovered user config.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(crate::config::find_config_file)
    }
}

/// Parses a strictly positive tick period in (fractional) seconds.
fn parse_tick(arg: &str) -> Result<Duration, String> {
    let secs: f64 = arg
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", arg))?;
    if secs.is_nan() || secs <= 0.0 {
        return Err("tick must be a positive number of seconds".to_string());
    }
    let period = Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())?;
    if period.is_zero() {
        return Err("tick is too small".to_string());
    }
    Ok(period)
}

pub fn parse_args() -> Result<CliArgs, Box<dyn std::error::Error>> {
    Ok(CliArgs::parse())
}
