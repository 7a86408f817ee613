//! Interactive shell keeping one connection open.

use std::str::FromStr;

use rtminer_client::Catalogue;
use tokio::io::AsyncBufRead;
use tracing::debug;

use crate::cli::Source;
use crate::error::{CliError, CliResult};
use crate::executor::{CommandExecutor, prompt_line};

const HELP: &str = "\
Commands:
  endpoint [HOST PORT]   show or change the server endpoint
  connect                open the connection
  disconnect             close the connection
  reconnect              close and reopen the connection
  status                 show session state
  tables                 list database tables
  files                  list archived tree files
  learn TABLE            learn a tree from a table
  load FILE              load an archived tree
  print                  print the current tree
  predict                answer questions to get a prediction
  help                   show this text
  quit                   leave the shell";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Endpoint(Option<(String, u32)>),
    Connect,
    Disconnect,
    Reconnect,
    Status,
    List(Catalogue),
    Load(Source),
    Print,
    Predict,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CliError::InvalidArguments("empty command".into()));
        };
        let rest: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("endpoint", []) => Self::Endpoint(None),
            ("endpoint", [host, port]) => {
                let port = port.parse().map_err(|_| {
                    CliError::InvalidArguments(format!("port must be a number, got {port}"))
                })?;
                Self::Endpoint(Some(((*host).to_string(), port)))
            }
            ("connect", []) => Self::Connect,
            ("disconnect", []) => Self::Disconnect,
            ("reconnect", []) => Self::Reconnect,
            ("status", []) => Self::Status,
            ("tables", []) => Self::List(Catalogue::Tables),
            ("files", []) => Self::List(Catalogue::Files),
            ("learn", [table]) => Self::Load(Source::Table((*table).to_string())),
            ("load", [file]) => Self::Load(Source::File((*file).to_string())),
            ("print", []) => Self::Print,
            ("predict", []) => Self::Predict,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            (verb, _) => {
                return Err(CliError::InvalidArguments(format!(
                    "unknown command or wrong arguments: {verb} (try `help`)"
                )));
            }
        };
        Ok(command)
    }
}

/// Reads commands from `input` until `quit` or end of input.
///
/// Errors are reported and the shell keeps going; the session is
/// disconnected on the way out.
pub async fn run<R: AsyncBufRead + Unpin>(
    executor: &CommandExecutor,
    input: &mut R,
) -> CliResult<()> {
    let dispatcher = executor.dispatcher();
    executor
        .formatter
        .print_info(&format!("rtminer shell, endpoint {}. Type `help`.", dispatcher.endpoint()));

    while let Some(line) = prompt_line(input, "rtminer> ").await? {
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<ShellCommand>() {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => command,
            Err(e) => {
                executor.display_error(&e);
                continue;
            }
        };
        debug!("Shell command {:?}", command);
        if let Err(e) = dispatch(executor, command, input).await {
            executor.display_error(&e);
        }
    }

    dispatcher.disconnect().await?;
    Ok(())
}

async fn dispatch<R: AsyncBufRead + Unpin>(
    executor: &CommandExecutor,
    command: ShellCommand,
    input: &mut R,
) -> CliResult<()> {
    let dispatcher = executor.dispatcher();
    match command {
        ShellCommand::Endpoint(None) => {
            let endpoint = dispatcher.endpoint();
            println!("{endpoint} ({})", endpoint.check());
            Ok(())
        }
        ShellCommand::Endpoint(Some((host, port))) => {
            dispatcher.set_endpoint(host, port).await?;
            let endpoint = dispatcher.endpoint();
            executor
                .formatter
                .print_success(&format!("Endpoint set to {endpoint} ({})", endpoint.check()));
            Ok(())
        }
        ShellCommand::Connect => {
            dispatcher.connect().await?;
            executor.formatter.print_success("Connected");
            Ok(())
        }
        ShellCommand::Disconnect => {
            dispatcher.disconnect().await?;
            executor.formatter.print_success("Disconnected");
            Ok(())
        }
        ShellCommand::Reconnect => {
            dispatcher.reconnect().await?;
            executor.formatter.print_success("Reconnected");
            Ok(())
        }
        ShellCommand::Status => executor.status(),
        ShellCommand::List(catalogue) => executor.list(catalogue).await,
        ShellCommand::Load(source) => executor.load(&source).await.map(|_| ()),
        ShellCommand::Print => executor.print().await,
        ShellCommand::Predict => executor.predict(input).await,
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    }
}
