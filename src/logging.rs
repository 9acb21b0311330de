//! Logging configuration using tracing
//!
//! The library only emits events; the binary installs a subscriber that writes
//! to stderr, filtered by the `--log-level` flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::CliError;

/// Initialize the tracing subscriber
///
/// `filter` uses `EnvFilter` directive syntax (`warn`, `daycache=debug`, ...).
///
/// # Errors
/// Returns an error if the filter does not parse or a subscriber is already set
pub fn init(filter: &str) -> Result<(), CliError> {
    let env_filter =
        EnvFilter::try_new(filter).map_err(|_| CliError::InvalidLogLevel(filter.to_string()))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_unparseable_filter() {
        let err = init("daycache=loud").unwrap_err();
        assert!(matches!(err, CliError::InvalidLogLevel(ref f) if f == "daycache=loud"));
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init("debug");
        assert!(matches!(init("debug"), Err(CliError::Logging(_))));
    }
}
