use std::io;

use tracing_subscriber::{EnvFilter, fmt};

/// Log level for a `-v` count
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize logging to stderr so command output on stdout stays clean
pub fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::new(level_for(verbosity));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::debug!("logging initialized at {}", level_for(verbosity));
    Ok(())
}
