//! Utilities: logging setup.
//!
//! Logs always go to stderr; stdout carries command output, or the MCP
//! transport under `mcp serve`.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the global `-v` / `-q` flags to a level. `quiet` wins.
pub fn derive_level(verbose: bool, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,labctl={level}")
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the
/// flag-derived filter. Calling this twice is a no-op.
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
