//! Output formatting for CLI results
//!
//! Results go to stdout, prompts and errors to stderr, so `--format json`
//! output can be piped.

use owo_colors::OwoColorize;
use rtminer_client::{
    Catalogue, Endpoint, LoadStatus, SessionState, TransportMetrics, Turn,
};
use serde::Serialize;

use crate::cli::{OutputFormat, Source};
use crate::error::{CliError, CliResult};

/// Snapshot printed by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Configured endpoint
    pub endpoint: Endpoint,
    /// Session lifecycle state
    pub state: SessionState,
    /// Whether a connection is open
    pub connected: bool,
    /// Whether the last learn/load returned `ok`
    pub tree_loaded: bool,
    /// Channel counters
    pub metrics: TransportMetrics,
}

#[derive(Serialize)]
struct CatalogueOutput<'a> {
    catalogue: Catalogue,
    empty: bool,
    names: &'a [String],
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    source: &'a Source,
    status: LoadStatus,
}

#[derive(Serialize)]
struct TreeOutput<'a> {
    tree: &'a str,
}

/// Format and display output based on format preference
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Display any serializable value as JSON
    pub fn display<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Display a table or file listing
    pub fn display_catalogue(&self, catalogue: Catalogue, names: &[String]) -> CliResult<()> {
        let empty = catalogue.is_empty_listing(names);
        match self.format {
            OutputFormat::Json => self.display(&CatalogueOutput {
                catalogue,
                empty,
                names: if empty { &[] } else { names },
            }),
            OutputFormat::Human => {
                print!("{}", self.render_catalogue(catalogue, names));
                Ok(())
            }
        }
    }

    /// Display the outcome of a successful learn or load
    pub fn display_loaded(&self, source: &Source, status: LoadStatus) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display(&StatusOutput { source, status }),
            OutputFormat::Human => {
                let text = match source {
                    Source::Table(table) => format!("Tree learned from table {table}"),
                    Source::File(file) => format!("Tree loaded from file {file}"),
                };
                self.print_success(&text);
                Ok(())
            }
        }
    }

    /// Display tree text exactly as the server sent it
    pub fn display_tree(&self, tree: &str) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display(&TreeOutput { tree }),
            OutputFormat::Human => {
                print!("{tree}");
                if !tree.ends_with('\n') {
                    println!();
                }
                Ok(())
            }
        }
    }

    /// Display one prediction turn
    pub fn display_turn(&self, turn: &Turn) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(turn)?);
                Ok(())
            }
            OutputFormat::Human => {
                println!("{}", self.render_turn(turn));
                Ok(())
            }
        }
    }

    /// Display a session status report
    pub fn display_status(&self, report: &StatusReport) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display(report),
            OutputFormat::Human => {
                self.print_header("Session");
                self.print_kv("Endpoint", &report.endpoint.to_string());
                self.print_kv("State", &report.state.to_string());
                self.print_kv("Tree loaded", if report.tree_loaded { "yes" } else { "no" });
                self.print_kv(
                    "Values sent/received",
                    &format!(
                        "{}/{}",
                        report.metrics.messages_sent, report.metrics.messages_received
                    ),
                );
                self.print_kv(
                    "Connections (failed)",
                    &format!(
                        "{} ({})",
                        report.metrics.connections, report.metrics.failed_connections
                    ),
                );
                Ok(())
            }
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &CliError) {
        if self.colored {
            eprintln!(
                "{} [{}]: {}",
                "Error".bright_red().bold(),
                error.category(),
                error
            );

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{}]: {error}", error.category());

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    /// Informational line on stderr
    pub fn print_info(&self, text: &str) {
        if self.colored {
            eprintln!("{}", text.bright_blue());
        } else {
            eprintln!("{text}");
        }
    }

    /// Success line, suppressed in JSON mode
    pub fn print_success(&self, text: &str) {
        if self.format == OutputFormat::Json {
            return;
        }
        if self.colored {
            println!("{} {}", "✓".bright_green(), text);
        } else {
            println!("✓ {text}");
        }
    }

    /// Human rendering of a listing, one name per line.
    pub fn render_catalogue(&self, catalogue: Catalogue, names: &[String]) -> String {
        if catalogue.is_empty_listing(names) {
            let text = match catalogue {
                Catalogue::Tables => "The server has no tables",
                Catalogue::Files => "The server has no archived trees",
            };
            return format!("{text}\n");
        }
        let title = match catalogue {
            Catalogue::Tables => "Tables",
            Catalogue::Files => "Files",
        };
        let mut out = if self.colored {
            format!("{}\n", title.bright_cyan().bold())
        } else {
            format!("{title}\n")
        };
        for name in names {
            if self.colored {
                out.push_str(&format!("  {} {}\n", "•".bright_blue(), name.bright_green()));
            } else {
                out.push_str(&format!("  • {name}\n"));
            }
        }
        out
    }

    /// Human rendering of a prediction turn.
    pub fn render_turn(&self, turn: &Turn) -> String {
        match turn {
            Turn::Query { prompt, children } => {
                let range = format!("[0-{}]", children.saturating_sub(1));
                if self.colored {
                    format!("{} {}", prompt.bold(), range.bright_black())
                } else {
                    format!("{prompt} {range}")
                }
            }
            Turn::Done(class) => {
                if self.colored {
                    format!("{} {}", "Prediction:".bright_green().bold(), class)
                } else {
                    format!("Prediction: {class}")
                }
            }
        }
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_cyan().bold());
            println!("{}", "=".repeat(text.len()).bright_cyan());
        } else {
            println!("{text}");
            println!("{}", "=".repeat(text.len()));
        }
    }

    fn print_kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}: {}", key.bright_green().bold(), value);
        } else {
            println!("  {key}: {value}");
        }
    }
}
