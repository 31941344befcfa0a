//! source-router binary entry point.

use anyhow::Result;
use clap::Parser;
use source_router::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

/// Initializes stderr logging.
///
/// `SOURCE_ROUTER_LOG` takes precedence; otherwise `--verbose` selects
/// `debug` and the default is `warn`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SOURCE_ROUTER_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = execute(&cli)?;
    print!("{output}");
    Ok(())
}
