//! Match and result types produced by searches.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A match in the search pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl SearchMatch {
    /// Creates a new search match.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<regex::Match<'_>> for SearchMatch {
    fn from(m: regex::Match<'_>) -> Self {
        Self::new(m.start(), m.end())
    }
}

impl From<SearchMatch> for (usize, usize) {
    fn from(m: SearchMatch) -> Self {
        (m.start, m.end)
    }
}

/// A pool line that contains at least one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// 1-based line number.
    pub line_number: usize,
    /// Line text without its terminator.
    pub text: String,
}

impl fmt::Display for LineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line_number, self.text)
    }
}

/// A matching line found in a file or named buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMatch {
    /// File path, or the buffer name for in-memory searches.
    pub path: PathBuf,
    /// 1-based line number.
    pub line_number: usize,
    /// Line text without its terminator.
    pub text: String,
}

impl fmt::Display for FileMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line_number, self.text)
    }
}

/// Counters collected while searching files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Files opened and scanned.
    pub files_searched: usize,
    /// Files skipped as binary or unreadable.
    pub files_skipped: usize,
    /// Matching lines reported.
    pub matches: usize,
}

/// Turns a [`FileMatch`] into display text.
pub type ResultFormatter = Arc<dyn Fn(&FileMatch) -> String + Send + Sync>;

pub(crate) fn default_formatter() -> ResultFormatter {
    Arc::new(|m: &FileMatch| m.to_string())
}
