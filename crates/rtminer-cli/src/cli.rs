//! CLI argument parsing and configuration types

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Default server host when neither a flag nor `RTMINER_HOST` is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port when neither a flag nor `RTMINER_PORT` is given.
pub const DEFAULT_PORT: u32 = 8080;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "rtminer",
    version,
    about = "Learn, load, print and walk decision trees on an rtminer server",
    long_about = "rtminer drives a remote decision-tree server over a single TCP connection.\n\
                  The server learns trees from its database tables or loads trees it archived \n\
                  earlier; the client prints them or walks them one question at a time to a \n\
                  prediction.\n\n\
                  Every one-shot subcommand connects first and disconnects when done. Use \n\
                  `rtminer shell` to keep one connection open across several operations."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Server to talk to
    #[command(flatten)]
    pub server: ServerArgs,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Server endpoint and connection options
#[derive(Args, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerArgs {
    /// Server IPv4 address
    #[arg(long, short = 'H', global = true, env = "RTMINER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port (1024-65535)
    #[arg(long, short = 'p', global = true, env = "RTMINER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u32,

    /// Connect without checking for a network route first
    #[arg(long, global = true)]
    pub skip_network_check: bool,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the database tables the server can learn from
    Tables,

    /// List the tree files the server has archived
    Files,

    /// Learn a tree from a database table
    Learn {
        /// Table name
        table: String,
    },

    /// Load an archived tree file
    Load {
        /// File name
        file: String,
    },

    /// Learn or load a tree, then print it
    Print(TreeSource),

    /// Learn or load a tree, then answer its questions to get a prediction
    Predict(TreeSource),

    /// Interactive shell keeping one connection open
    Shell,
}

/// Where the tree comes from
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(group(ArgGroup::new("source").required(true).args(["table", "file"])))]
pub struct TreeSource {
    /// Learn the tree from this table
    #[arg(long, short = 't')]
    pub table: Option<String>,

    /// Load the tree from this archived file
    #[arg(long, short = 'F')]
    pub file: Option<String>,
}

/// Resolved [`TreeSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Learn from a database table
    Table(String),
    /// Load an archived file
    File(String),
}

impl TreeSource {
    /// The chosen source. Clap guarantees exactly one is present.
    pub fn resolve(self) -> Option<Source> {
        match (self.table, self.file) {
            (Some(table), None) => Some(Source::Table(table)),
            (None, Some(file)) => Some(Source::File(file)),
            _ => None,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text with optional colors
    Human,
    /// Pretty-printed JSON
    Json,
}
