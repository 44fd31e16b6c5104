use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;

use cli::{run_command, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config();

    // Initialize logging
    let log_level = config
        .as_ref()
        .map(|c| c.general.log_level.as_str())
        .unwrap_or("info");
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Run the command
    if let Err(e) = config.and_then(|config| run_command(cli, config)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
