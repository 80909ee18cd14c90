// ABOUTME: Error taxonomy for the backup engine
// ABOUTME: Every kind is fatal; the binary maps each one to its own exit status

use thiserror::Error;

/// Fatal failure of an export.
///
/// Skipped tables (vanished between enumeration and extraction, excluded by
/// the allow-list, data suppressed by the ignore-list) are not errors and
/// never surface here.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Config file unreadable, unparseable, or semantically invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cannot open or ping the database
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<mysql_async::Error>,
    },

    /// A SQL statement failed
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<mysql_async::Error>,
    },

    /// Cannot create or write the destination
    #[error("File error: {message}")]
    File {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl DumpError {
    pub fn config(message: impl Into<String>) -> Self {
        DumpError::Config(message.into())
    }

    pub fn connection(message: impl Into<String>, source: mysql_async::Error) -> Self {
        DumpError::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn query(message: impl Into<String>, source: mysql_async::Error) -> Self {
        DumpError::Query {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Query failure detected by the engine itself rather than the driver
    pub fn query_msg(message: impl Into<String>) -> Self {
        DumpError::Query {
            message: message.into(),
            source: None,
        }
    }

    pub fn file(message: impl Into<String>, source: std::io::Error) -> Self {
        DumpError::File {
            message: message.into(),
            source,
        }
    }

    /// Process exit status for this kind of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            DumpError::Config(_) => 2,
            DumpError::Connection { .. } => 3,
            DumpError::Query { .. } => 4,
            DumpError::File { .. } => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;
