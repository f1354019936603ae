//! Error types for the ovfgen core library.

use std::path::PathBuf;

/// The main error type for ovfgen operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Build parameters rejected before any document is assembled.
    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// The external disk image converter could not be run or failed.
    #[error("disk tool '{}' failed: {message}", tool.display())]
    DiskTool { tool: PathBuf, message: String },

    /// Error serializing the envelope to XML.
    #[error("XML error: {message}")]
    Xml { message: String },
}

/// A specialized Result type for ovfgen operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create an invalid parameters error.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a disk tool error.
    pub fn disk_tool(tool: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DiskTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}
