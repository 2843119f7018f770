//! Logging setup for the `clidrive` binary.

use anyhow::{Context as _, Result, anyhow};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "warn,clidrive=debug",
        _ => "info,clidrive=trace",
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbose` when set.
///
/// Logs go to stderr, or are appended to `log_file` when given, so they never
/// mix with results printed on stdout.
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 2);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

    debug!("Start logging pid:{}", std::process::id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(0), "warn");
        assert!(default_directives(1).contains("clidrive=debug"));
        assert!(default_directives(5).contains("clidrive=trace"));
    }
}
