//! daycache - inspect and maintain the day-scoped resource cache on disk

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;

use daycache::cache::{CacheManager, DurableBackend, SystemClock};
use daycache::cli::{Cli, Command};
use daycache::logging;

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = cli.config();
    let clock = Arc::new(SystemClock);
    let backend = DurableBackend::open(&config, clock.clone())?;
    let mut cache = CacheManager::with_backend(Box::new(backend), config, clock);

    match cli.command {
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        Command::Get { resource, day } => match cache.get::<Value>(&resource, day) {
            Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
            None => {
                eprintln!("No valid entry for '{}'", resource);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Clear { resource, day } => cache.clear(&resource, day),
        Command::ClearResource { resource } => cache.clear_all_for_resource(&resource),
        Command::ClearAll => cache.clear_all(),
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
