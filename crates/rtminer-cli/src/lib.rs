//! # rtminer CLI
//!
//! Command-line front end for an rtminer decision-tree server.
//!
//! ## Usage
//!
//! ```bash
//! # What can the server learn from?
//! rtminer --host 192.168.1.10 --port 8080 tables
//!
//! # Learn a tree and print it
//! rtminer print --table iris
//!
//! # Walk an archived tree to a prediction
//! RTMINER_HOST=192.168.1.10 rtminer predict --file iris.dmp
//!
//! # Keep one connection open
//! rtminer shell
//! ```
//!
//! ## Architecture
//!
//! 1. **Command Layer** (`cli`): Clap-based argument parsing
//! 2. **Execution Layer** (`executor`, `shell`): drives the request dispatcher
//! 3. **Output Layer** (`formatter`): human or JSON output
//!
//! All server I/O goes through [`rtminer_client::RequestDispatcher`].

pub mod cli;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod prelude;
pub mod shell;

use clap::Parser;
use rtminer_client::RequestDispatcher;
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands, OutputFormat, ServerArgs, Source, TreeSource};
pub use error::{CliError, CliResult, ErrorCategory};
pub use executor::CommandExecutor;
pub use formatter::{Formatter, StatusReport};
pub use shell::ShellCommand;

/// Run the CLI application
///
/// Command failures are displayed here and end the process with the
/// error's exit code; only start-up failures are returned.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, !cli.no_color);

    let colored = !cli.no_color && cli.format == OutputFormat::Human;
    let executor = CommandExecutor::new(RequestDispatcher::global()?, cli.format, colored);

    let result = match executor.configure(&cli.server).await {
        Ok(()) => executor.execute(cli.command).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        executor.display_error(&e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Log filter directive for a `-v` count.
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr fmt subscriber; `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8, ansi: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    // Another subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_parsing() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }
}
