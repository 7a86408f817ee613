//! Command execution through the request dispatcher

use std::io::Write;
use std::sync::Arc;

use rtminer_client::{
    Catalogue, ClientError, LoadStatus, PredictionDialog, RequestDispatcher, StaticProbe, Turn,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::{Commands, OutputFormat, ServerArgs, Source};
use crate::error::{CliError, CliResult};
use crate::formatter::{Formatter, StatusReport};
use crate::shell;

/// Execute CLI commands
#[derive(Debug)]
pub struct CommandExecutor {
    pub formatter: Formatter,
    dispatcher: RequestDispatcher,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(dispatcher: RequestDispatcher, format: OutputFormat, colored: bool) -> Self {
        Self {
            formatter: Formatter::new(format, colored),
            dispatcher,
        }
    }

    /// The dispatcher every request goes through.
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Display an error with rich formatting
    pub fn display_error(&self, error: &CliError) {
        self.formatter.display_error(error);
    }

    /// Applies endpoint and probe settings to the session.
    pub async fn configure(&self, server: &ServerArgs) -> CliResult<()> {
        if server.skip_network_check {
            self.dispatcher
                .session()
                .set_probe(Arc::new(StaticProbe(true)));
        }
        self.dispatcher
            .set_endpoint(server.host.clone(), server.port)
            .await?;
        Ok(())
    }

    /// Execute a command, reading answers from standard input
    pub async fn execute(&self, command: Commands) -> CliResult<()> {
        let mut input = BufReader::new(tokio::io::stdin());
        self.execute_with(command, &mut input).await
    }

    /// Execute a command, reading answers from `input`
    ///
    /// One-shot commands connect first and always disconnect afterwards.
    pub async fn execute_with<R: AsyncBufRead + Unpin>(
        &self,
        command: Commands,
        input: &mut R,
    ) -> CliResult<()> {
        if let Commands::Shell = command {
            return shell::run(self, input).await;
        }

        self.dispatcher.connect().await?;
        let result = self.execute_connected(command, input).await;
        self.dispatcher.disconnect().await?;
        result
    }

    async fn execute_connected<R: AsyncBufRead + Unpin>(
        &self,
        command: Commands,
        input: &mut R,
    ) -> CliResult<()> {
        match command {
            Commands::Tables => self.list(Catalogue::Tables).await,
            Commands::Files => self.list(Catalogue::Files).await,
            Commands::Learn { table } => self.load(&Source::Table(table)).await.map(|_| ()),
            Commands::Load { file } => self.load(&Source::File(file)).await.map(|_| ()),
            Commands::Print(source) => {
                let source = resolve(source.resolve())?;
                self.load(&source).await?;
                self.print().await
            }
            Commands::Predict(source) => {
                let source = resolve(source.resolve())?;
                self.load(&source).await?;
                self.predict(input).await
            }
            Commands::Shell => shell::run(self, input).await,
        }
    }

    // Session operations shared with the shell

    pub(crate) async fn list(&self, catalogue: Catalogue) -> CliResult<()> {
        let names = match catalogue {
            Catalogue::Tables => self.dispatcher.list_tables().await?,
            Catalogue::Files => self.dispatcher.list_files().await?,
        };
        self.formatter.display_catalogue(catalogue, &names)
    }

    /// Learns or loads a tree; a non-`ok` status is reported as an error.
    pub(crate) async fn load(&self, source: &Source) -> CliResult<LoadStatus> {
        let status = match source {
            Source::Table(table) => self.dispatcher.learn_tree_from_table(table.clone()).await?,
            Source::File(file) => self.dispatcher.load_tree_from_file(file.clone()).await?,
        };
        status.ensure_ok()?;
        self.formatter.display_loaded(source, status)?;
        Ok(status)
    }

    pub(crate) async fn print(&self) -> CliResult<()> {
        let tree = self.dispatcher.print_tree().await?;
        self.formatter.display_tree(&tree)
    }

    /// Walks the loaded tree, offering another walk after each prediction.
    pub(crate) async fn predict<R: AsyncBufRead + Unpin>(&self, input: &mut R) -> CliResult<()> {
        loop {
            let dialog = self.dispatcher.begin_prediction().await?;
            self.walk(&dialog, input).await?;
            if !confirm(input, "Predict again? [y/N] ").await? {
                return Ok(());
            }
        }
    }

    async fn walk<R: AsyncBufRead + Unpin>(
        &self,
        dialog: &PredictionDialog,
        input: &mut R,
    ) -> CliResult<()> {
        let mut turn = dialog.turn();
        loop {
            self.formatter.display_turn(&turn)?;
            let Turn::Query { children, .. } = turn else {
                return Ok(());
            };
            turn = loop {
                let index = read_index(input, children).await?;
                match self.dispatcher.choose(dialog, index).await {
                    Ok(next) => break next,
                    Err(ClientError::InvalidChoice { children, .. }) => {
                        self.formatter.print_info(&format!(
                            "Choose a number from 0 to {}",
                            children.saturating_sub(1)
                        ));
                    }
                    Err(e) => return Err(e.into()),
                }
            };
        }
    }

    pub(crate) fn status(&self) -> CliResult<()> {
        let session = self.dispatcher.session();
        self.formatter.display_status(&StatusReport {
            endpoint: session.endpoint(),
            state: session.state(),
            connected: session.is_connected(),
            tree_loaded: session.has_tree(),
            metrics: session.metrics(),
        })
    }
}

fn resolve(source: Option<Source>) -> CliResult<Source> {
    source.ok_or_else(|| CliError::InvalidArguments("give exactly one of --table or --file".into()))
}

/// Reads lines from `input` until one parses as a child index.
///
/// Range checking is left to the dialog so its bound is authoritative.
async fn read_index<R: AsyncBufRead + Unpin>(input: &mut R, children: u32) -> CliResult<u32> {
    loop {
        let line = prompt_line(input, &format!("Answer [0-{}]: ", children.saturating_sub(1)))
            .await?
            .ok_or(CliError::InputClosed)?;
        match line.parse::<u32>() {
            Ok(index) => return Ok(index),
            Err(_) => {
                debug!("Ignoring non-numeric answer {:?}", line);
                eprintln!("Not a number: {line}");
            }
        }
    }
}

async fn confirm<R: AsyncBufRead + Unpin>(input: &mut R, question: &str) -> CliResult<bool> {
    Ok(prompt_line(input, question)
        .await?
        .is_some_and(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")))
}

/// Writes `prompt` to stderr and reads one trimmed line, `None` at end of input.
pub(crate) async fn prompt_line<R: AsyncBufRead + Unpin>(
    input: &mut R,
    prompt: &str,
) -> CliResult<Option<String>> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_index_skips_garbage() {
        let mut input = Cursor::new("abc\n\n 2 \n");
        assert_eq!(read_index(&mut input, 3).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_read_index_at_end_of_input() {
        let mut input = Cursor::new("x\n");
        assert!(matches!(
            read_index(&mut input, 3).await,
            Err(CliError::InputClosed)
        ));
    }

    #[tokio::test]
    async fn test_confirm() {
        assert!(confirm(&mut Cursor::new("Y\n"), "?").await.unwrap());
        assert!(confirm(&mut Cursor::new("yes\n"), "?").await.unwrap());
        assert!(!confirm(&mut Cursor::new("n\n"), "?").await.unwrap());
        assert!(!confirm(&mut Cursor::new(""), "?").await.unwrap());
    }

    #[tokio::test]
    async fn test_prompt_waits_for_a_slow_writer() {
        // The writer runs on the same single-threaded runtime as the reader
        let (reader, mut writer) = tokio::io::duplex(64);
        let feeder = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            writer.write_all(b"nope\n").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            writer.write_all(b"1\n").await.unwrap();
        });
        let mut input = BufReader::new(reader);
        assert_eq!(read_index(&mut input, 2).await.unwrap(), 1);
        feeder.await.unwrap();
    }

    #[test]
    fn test_resolve_requires_a_source() {
        assert!(matches!(
            resolve(None),
            Err(CliError::InvalidArguments(_))
        ));
        assert_eq!(
            resolve(Some(Source::File("a".into()))).unwrap(),
            Source::File("a".into())
        );
    }
}
