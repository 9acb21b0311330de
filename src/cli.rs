//! Command-line interface parsing for the daycache maintenance tool
//!
//! The binary operates on the durable file store only; the in-memory backend
//! has nothing to inspect from outside the process.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::{CacheConfig, Day};

/// Error types for CLI argument parsing and startup
#[derive(Debug, Error)]
pub enum CliError {
    /// The day argument is not a `YYYY-MM-DD` date
    #[error("Invalid day: '{0}'. Expected YYYY-MM-DD")]
    InvalidDay(String),

    #[error("Invalid log level: '{0}'")]
    InvalidLogLevel(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// daycache - inspect and maintain the day-scoped resource cache
#[derive(Parser, Debug)]
#[command(name = "daycache")]
#[command(about = "Inspect and maintain the day-scoped resource cache")]
#[command(version)]
pub struct Cli {
    /// Cache directory (defaults to the XDG cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Capacity of the cache store in bytes
    #[arg(long, global = true, value_name = "BYTES")]
    pub quota_bytes: Option<u64>,

    /// Log filter, e.g. `debug` or `daycache=trace`
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show entry counts and write-time bounds
    Stats,
    /// Print the cached payload for a resource
    Get {
        resource: String,
        /// Logical day (defaults to today)
        #[arg(long, value_parser = parse_day_arg)]
        day: Option<Day>,
    },
    /// Remove one resource's entry for a day
    Clear {
        resource: String,
        /// Logical day (defaults to today)
        #[arg(long, value_parser = parse_day_arg)]
        day: Option<Day>,
    },
    /// Remove every entry of a resource
    ClearResource { resource: String },
    /// Remove every entry this cache owns
    ClearAll,
}

/// Parses a `YYYY-MM-DD` day argument
pub fn parse_day_arg(s: &str) -> Result<Day, CliError> {
    s.parse().map_err(|_| CliError::InvalidDay(s.to_string()))
}

impl Cli {
    /// Cache configuration derived from the global flags
    pub fn config(&self) -> CacheConfig {
        let mut config = CacheConfig::default();
        if let Some(dir) = &self.dir {
            config = config.with_dir(dir.clone());
        }
        if self.quota_bytes.is_some() {
            config = config.with_quota_bytes(self.quota_bytes);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_arg_valid() {
        assert_eq!(parse_day_arg("2024-03-01").unwrap().to_string(), "2024-03-01");
    }

    #[test]
    fn test_parse_day_arg_invalid() {
        let err = parse_day_arg("03/01/2024").unwrap_err();
        assert!(err.to_string().contains("Invalid day"));
        assert!(err.to_string().contains("03/01/2024"));
    }

    #[test]
    fn test_cli_parse_stats() {
        let cli = Cli::parse_from(["daycache", "stats"]);
        assert_eq!(cli.command, Command::Stats);
        assert_eq!(cli.log_level, "warn");
        assert!(cli.dir.is_none());
    }

    #[test]
    fn test_cli_parse_get_with_day() {
        let cli = Cli::parse_from(["daycache", "get", "dailyProps", "--day", "2024-03-01"]);
        assert_eq!(
            cli.command,
            Command::Get {
                resource: "dailyProps".to_string(),
                day: Some(parse_day_arg("2024-03-01").unwrap()),
            }
        );
    }

    #[test]
    fn test_cli_parse_clear_without_day() {
        let cli = Cli::parse_from(["daycache", "clear", "dailyProps"]);
        assert_eq!(
            cli.command,
            Command::Clear {
                resource: "dailyProps".to_string(),
                day: None,
            }
        );
    }

    #[test]
    fn test_cli_rejects_bad_day() {
        let result = Cli::try_parse_from(["daycache", "get", "dailyProps", "--day", "tomorrow"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "daycache",
            "clear-all",
            "--dir",
            "/tmp/cache",
            "--quota-bytes",
            "1024",
        ]);
        assert_eq!(cli.command, Command::ClearAll);

        let config = cli.config();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(config.quota_bytes, Some(1024));
    }

    #[test]
    fn test_config_keeps_default_quota() {
        let cli = Cli::parse_from(["daycache", "clear-resource", "lines"]);
        assert_eq!(cli.config().quota_bytes, CacheConfig::default().quota_bytes);
    }
}
