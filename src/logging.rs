//! Logging setup shared by the binaries

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter: our level, noisy HTTP crates held at warn
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn", level)
}

/// Log to stderr so stdout stays free for JSON output. `RUST_LOG` wins over
/// the default filter.
pub fn setup_logging(verbose: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(default_filter(false).starts_with("info,"));
        assert!(default_filter(true).starts_with("debug,"));
        assert!(default_filter(false).contains("reqwest=warn"));
    }
}
