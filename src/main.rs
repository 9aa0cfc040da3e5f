use anyhow::Context;
use housekeeper::cli::{self, CliCommand};
use housekeeper::config::HousekeeperConfig;
use housekeeper::replay;
use housekeeper::session::Session;
use housekeeper::watch;

/// Parse arguments, load the schedule, and either replay a trace or run a
/// live host loop until stdin closes.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli_args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logger (set RUST_LOG env var to control verbosity)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match cli_args.config_path() {
        Some(path) => HousekeeperConfig::from_file(&path)
            .with_context(|| format!("loading schedule {}", path.display()))?,
        None => {
            log::info!("No schedule file found, using built-in defaults");
            HousekeeperConfig::default()
        }
    };
    let session = Session::from_config(&config)?;

    match cli_args.command {
        CliCommand::Replay { trace, json } => {
            let steps = replay::load_trace(&trace)
                .with_context(|| format!("loading trace {}", trace.display()))?;
            for report in replay::replay(&session, &steps) {
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    println!("{}", report);
                }
            }
        }
        CliCommand::Watch { tick } => {
            watch::watch(&session.scheduler, tick).await?;
        }
    }
    Ok(())
}
