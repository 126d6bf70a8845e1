//! Search options and directory walk settings.

use std::fmt;

/// Query and flags for a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// The text or pattern to look for.
    pub query: String,
    /// Interpret the query as a regular expression.
    pub is_regex: bool,
    /// Match letter case exactly.
    pub match_case: bool,
    /// Only match text with a non-word character or the pool edge on each
    /// side, in both literal and regex mode.
    pub whole_word: bool,
    /// Direction used by [`SearchEngine::find`](crate::SearchEngine::find).
    pub search_down: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            is_regex: true,
            match_case: true,
            whole_word: false,
            search_down: true,
        }
    }
}

impl SearchOptions {
    /// Creates options for the given query with default flags.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Creates options for a literal (non-regex) query.
    pub fn literal(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            is_regex: false,
            ..Self::default()
        }
    }

    /// Sets whether the query is a regular expression.
    pub fn with_regex(mut self, is_regex: bool) -> Self {
        self.is_regex = is_regex;
        self
    }

    /// Sets whether letter case must match.
    pub fn with_match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    /// Sets whether only whole words match.
    pub fn with_whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    /// Sets the direction used by `find`.
    pub fn with_search_down(mut self, search_down: bool) -> Self {
        self.search_down = search_down;
        self
    }
}

impl fmt::Display for SearchOptions {
    /// Short human-readable summary, e.g. `"foo" [regex, match case, down]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::with_capacity(4);
        flags.push(if self.is_regex { "regex" } else { "literal" });
        if self.match_case {
            flags.push("match case");
        }
        if self.whole_word {
            flags.push("whole word");
        }
        flags.push(if self.search_down { "down" } else { "up" });
        write!(f, "{:?} [{}]", self.query, flags.join(", "))
    }
}

/// Settings for searching a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Visit files and directories whose names start with a dot.
    pub include_hidden: bool,
    /// Glob patterns matched against file names. Empty means every file.
    pub filters: Vec<String>,
    /// Skip files larger than this many bytes.
    pub max_file_size: Option<u64>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_hidden: false,
            filters: Vec::new(),
            max_file_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SearchOptions::default();
        assert!(opts.is_regex);
        assert!(opts.match_case);
        assert!(!opts.whole_word);
        assert!(opts.search_down);
        assert!(opts.query.is_empty());

        let dir = DirectoryOptions::default();
        assert!(dir.recursive);
        assert!(!dir.include_hidden);
        assert!(dir.filters.is_empty());
    }

    #[test]
    fn test_display() {
        let opts = SearchOptions::literal("foo")
            .with_match_case(false)
            .with_whole_word(true)
            .with_search_down(false);
        assert_eq!(opts.to_string(), "\"foo\" [literal, whole word, up]");
    }
}
