//! Request catalogue and the literal strings the server replies with.

use std::fmt;

use rtminer_transport::ObjectChannel;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Load/learn succeeded.
pub const STATUS_OK: &str = "ok";
/// The server could not build its data set from the table.
pub const STATUS_DATA_ERROR: &str = "dataError";
/// The named table does not exist.
pub const STATUS_TABLE_NOT_FOUND: &str = "tableNotFound";
/// The named tree file does not exist.
pub const STATUS_FILE_NOT_FOUND: &str = "fileNotFound";
/// Sole element of an empty table listing.
pub const NO_TABLES_FOUND: &str = "NoTablesFound";
/// Sole element of an empty file listing.
pub const NO_FILES_FOUND: &str = "NoFilesFound";
/// Prediction turn carrying a question.
pub const TAG_QUERY: &str = "QUERY";
/// Prediction turn carrying the final class.
pub const TAG_OK: &str = "OK";

/// Server operations, sent as the first value of every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum RequestCode {
    /// List database tables
    ListTables = 1,
    /// List archived tree files
    ListFiles = 2,
    /// Learn a tree from a table
    LearnTree = 3,
    /// Load a tree from a file
    LoadTree = 4,
    /// Print the current tree
    PrintTree = 5,
    /// Begin an interactive prediction
    Predict = 6,
}

impl RequestCode {
    /// Wire value of the code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListTables => "list-tables",
            Self::ListFiles => "list-files",
            Self::LearnTree => "learn-tree",
            Self::LoadTree => "load-tree",
            Self::PrintTree => "print-tree",
            Self::Predict => "predict",
        };
        write!(f, "{name}({})", self.code())
    }
}

/// Status reply to a learn or load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStatus {
    /// A tree is ready on the server.
    Ok,
    /// The table exists but its data could not be used.
    DataError,
    /// No such table.
    TableNotFound,
    /// No such file.
    FileNotFound,
}

impl LoadStatus {
    /// Parses a reply to [`RequestCode::LearnTree`].
    pub fn parse_learn(reply: &str) -> ClientResult<Self> {
        match reply {
            STATUS_OK => Ok(Self::Ok),
            STATUS_DATA_ERROR => Ok(Self::DataError),
            STATUS_TABLE_NOT_FOUND => Ok(Self::TableNotFound),
            other => Err(ClientError::protocol(format!(
                "unexpected learn status {other:?}"
            ))),
        }
    }

    /// Parses a reply to [`RequestCode::LoadTree`].
    pub fn parse_load(reply: &str) -> ClientResult<Self> {
        match reply {
            STATUS_OK => Ok(Self::Ok),
            STATUS_FILE_NOT_FOUND => Ok(Self::FileNotFound),
            other => Err(ClientError::protocol(format!(
                "unexpected load status {other:?}"
            ))),
        }
    }

    /// The literal the server sent.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => STATUS_OK,
            Self::DataError => STATUS_DATA_ERROR,
            Self::TableNotFound => STATUS_TABLE_NOT_FOUND,
            Self::FileNotFound => STATUS_FILE_NOT_FOUND,
        }
    }

    /// True for [`LoadStatus::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Turns a failure status into [`ClientError::ServerReported`].
    pub fn ensure_ok(self) -> ClientResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ClientError::ServerReported(self.as_str().to_string()))
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two listings the server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Catalogue {
    /// Database tables
    Tables,
    /// Archived tree files
    Files,
}

impl Catalogue {
    /// Request code that lists this catalogue.
    pub fn request(self) -> RequestCode {
        match self {
            Self::Tables => RequestCode::ListTables,
            Self::Files => RequestCode::ListFiles,
        }
    }

    /// Sentinel the server sends in place of an empty listing.
    pub fn sentinel(self) -> &'static str {
        match self {
            Self::Tables => NO_TABLES_FOUND,
            Self::Files => NO_FILES_FOUND,
        }
    }

    /// True when `names` is the empty-catalogue sentinel alone.
    pub fn is_empty_listing(self, names: &[String]) -> bool {
        matches!(names, [only] if only == self.sentinel())
    }

    /// Turns the sentinel listing into [`ClientError::ServerReported`].
    pub fn ensure_nonempty(self, names: Vec<String>) -> ClientResult<Vec<String>> {
        if self.is_empty_listing(&names) {
            Err(ClientError::ServerReported(self.sentinel().to_string()))
        } else {
            Ok(names)
        }
    }
}

/// One step of a prediction dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    /// The server asks a question with `children` possible answers.
    Query {
        /// Question text
        prompt: String,
        /// Number of legal child indices
        children: u32,
    },
    /// The walk reached a leaf.
    Done(String),
}

impl Turn {
    /// True for [`Turn::Done`].
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Reads one tagged prediction turn, exactly the values the tag prescribes.
pub(crate) fn read_turn(channel: &mut ObjectChannel) -> ClientResult<Turn> {
    let tag = channel.receive()?.into_string()?;
    match tag.as_str() {
        TAG_QUERY => {
            let prompt = channel.receive()?.into_string()?;
            let children = channel.receive()?.into_int()?;
            let children = u32::try_from(children)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    ClientError::protocol(format!("query {prompt:?} offers {children} children"))
                })?;
            Ok(Turn::Query { prompt, children })
        }
        TAG_OK => Ok(Turn::Done(channel.receive()?.into_string()?)),
        other => Err(ClientError::protocol(format!(
            "unexpected prediction tag {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes() {
        assert_eq!(RequestCode::ListTables.code(), 1);
        assert_eq!(RequestCode::Predict.code(), 6);
        assert_eq!(RequestCode::LearnTree.to_string(), "learn-tree(3)");
    }

    #[test]
    fn test_learn_status() {
        assert_eq!(LoadStatus::parse_learn("ok").unwrap(), LoadStatus::Ok);
        assert_eq!(
            LoadStatus::parse_learn("tableNotFound").unwrap(),
            LoadStatus::TableNotFound
        );
        assert_eq!(
            LoadStatus::parse_learn("dataError").unwrap(),
            LoadStatus::DataError
        );
        assert!(LoadStatus::parse_learn("fileNotFound").unwrap_err().is_fatal());
        assert!(LoadStatus::parse_learn("OK").is_err());
    }

    #[test]
    fn test_load_status() {
        assert_eq!(LoadStatus::parse_load("ok").unwrap(), LoadStatus::Ok);
        assert_eq!(
            LoadStatus::parse_load("fileNotFound").unwrap(),
            LoadStatus::FileNotFound
        );
        assert!(LoadStatus::parse_load("tableNotFound").is_err());
    }

    #[test]
    fn test_ensure_ok() {
        assert!(LoadStatus::Ok.ensure_ok().is_ok());
        assert_eq!(
            LoadStatus::DataError.ensure_ok().unwrap_err(),
            ClientError::ServerReported("dataError".into())
        );
    }

    #[test]
    fn test_catalogue_sentinels() {
        let empty = vec![NO_FILES_FOUND.to_string()];
        assert!(Catalogue::Files.is_empty_listing(&empty));
        assert!(!Catalogue::Tables.is_empty_listing(&empty));
        assert!(!Catalogue::Files.is_empty_listing(&[]));
        let mixed = vec!["a".to_string(), NO_FILES_FOUND.to_string()];
        assert!(!Catalogue::Files.is_empty_listing(&mixed));

        assert_eq!(
            Catalogue::Files.ensure_nonempty(empty).unwrap_err(),
            ClientError::ServerReported("NoFilesFound".into())
        );
        assert_eq!(
            Catalogue::Tables
                .ensure_nonempty(vec!["iris".into()])
                .unwrap(),
            vec!["iris"]
        );
        assert_eq!(Catalogue::Tables.request(), RequestCode::ListTables);
    }
}
