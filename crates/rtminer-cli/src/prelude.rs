//! Prelude module for convenient imports
//!
//! # Example
//!
//! ```rust,no_run
//! use rtminer_cli::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> CliResult<()> {
//!     let cli = Cli::parse();
//!     let executor = CommandExecutor::new(
//!         RequestDispatcher::global()?,
//!         OutputFormat::Json,
//!         false,
//!     );
//!     executor.configure(&cli.server).await?;
//!     executor.execute(cli.command).await
//! }
//! ```

pub use crate::{
    // Core CLI types
    Cli,
    // Error handling
    CliError,
    CliResult,
    // Execution
    CommandExecutor,
    Commands,
    ErrorCategory,
    Formatter,
    OutputFormat,
    ServerArgs,
    ShellCommand,
    Source,
    TreeSource,
    // Entry point
    run,
};

// Re-export the dispatcher the executor runs on
pub use rtminer_client::RequestDispatcher;

// Re-export clap for custom CLI extensions
pub use clap::Parser;
