//! Error types for the search engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while searching.
///
/// Pattern compilation failures are not raised from configuration; the engine
/// keeps them and exposes them through [`SearchEngine::pattern_error`].
///
/// [`SearchEngine::pattern_error`]: crate::SearchEngine::pattern_error
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query did not compile to a regular expression.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A file or directory could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A file name filter was not a valid glob.
    #[error("invalid file filter: {0}")]
    InvalidFilter(#[from] globset::Error),

    /// The directory walker reported an error.
    #[error("directory walk failed: {0}")]
    Walk(#[from] ignore::Error),
}

impl SearchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the path involved in the error, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
