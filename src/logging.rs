//! Structured logging setup.
//!
//! Events go to stderr so stdout stays free for response bodies. The level
//! filter comes from `RUST_LOG` and falls back to `info`. JSON output is
//! meant for log aggregation; the default is the human-readable format.

use std::error::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(format: LogFormat) -> Result<(), Box<dyn Error + Send + Sync>> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_error_instead_of_panicking() {
        // Whichever test installs the subscriber first wins; the next call
        // must fail cleanly.
        let _ = init(LogFormat::Text);
        assert!(init(LogFormat::Json).is_err());
    }
}
