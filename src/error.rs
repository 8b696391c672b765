//! Error types shared by the I/O pipeline and the rewrite engine

use std::path::PathBuf;
use std::time::Duration;

/// Errors produced while reading, transcoding, editing or writing a document
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Not a regular file: {}", path.display())]
    NotRegularFile { path: PathBuf },

    /// File could not be opened
    #[error("Cannot open file {}: {source}", path.display())]
    CannotOpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File was opened but reading failed
    #[error("Cannot read file {}: {source}", path.display())]
    CannotReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the transformed document failed; the original is left in place
    #[error("Cannot write file {}: {source}", path.display())]
    CannotWriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Charset detection was asked to examine zero bytes
    #[error("Empty input")]
    EmptyInput,

    /// Charset could not be determined
    #[error("Charset detection failed{}", describe_path(path))]
    DetectionFailed { path: Option<PathBuf> },

    /// Transcoding failed in either direction
    #[error("Conversion {from} -> {to} failed: {reason}")]
    ConversionFailed {
        from: String,
        to: String,
        reason: String,
    },

    /// Caller supplied an argument the operation cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Path given for a batch run does not exist or cannot be accessed
    #[error("Path does not exist or is not accessible: {}", path.display())]
    InvalidPath { path: PathBuf },

    /// Path holds no markdown file
    #[error("No markdown files found in {}", path.display())]
    NoMarkdownFiles { path: PathBuf },

    /// Directory enumeration ran past its time limit
    #[error("Scanning {} took longer than {:.1}s", path.display(), timeout.as_secs_f64())]
    ScanTimeout { path: PathBuf, timeout: Duration },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" for {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Shorthand for a conversion failure between two charsets
    pub(crate) fn conversion(from: impl Into<String>, to: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ConversionFailed {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
