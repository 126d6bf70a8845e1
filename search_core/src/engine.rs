//! Search engine: compiled query plus the pool it runs over.

use regex::{NoExpand, Regex};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::options::SearchOptions;
use crate::pattern;
use crate::pool::TextPool;
use crate::result::{default_formatter, FileMatch, LineMatch, ResultFormatter, SearchMatch};

/// Find/replace engine.
///
/// Configuring the engine compiles the query. A query that fails to compile
/// leaves the engine without a pattern: [`query_object`](Self::query_object)
/// returns `None`, the error is kept in [`pattern_error`](Self::pattern_error),
/// and every find operation reports no matches.
#[derive(Clone)]
pub struct SearchEngine {
    options: SearchOptions,
    regex: Option<Regex>,
    pattern_error: Option<regex::Error>,
    pool: TextPool,
    formatter: ResultFormatter,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEngine")
            .field("options", &self.options)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("pattern_error", &self.pattern_error)
            .field("pool_len", &self.pool.len_bytes())
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Creates an engine for the given options with an empty pool.
    pub fn new(options: SearchOptions) -> Self {
        let mut engine = Self {
            options,
            regex: None,
            pattern_error: None,
            pool: TextPool::new(),
            formatter: default_formatter(),
        };
        engine.recompile();
        engine
    }

    /// Sets the query and every flag at once, then recompiles.
    pub fn configure(
        &mut self,
        query: &str,
        is_regex: bool,
        match_case: bool,
        whole_word: bool,
        search_down: bool,
    ) {
        self.set_options(SearchOptions {
            query: query.to_owned(),
            is_regex,
            match_case,
            whole_word,
            search_down,
        });
    }

    /// Replaces the options and recompiles.
    pub fn set_options(&mut self, options: SearchOptions) {
        self.options = options;
        self.recompile();
    }

    /// Returns the current options.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Returns the query text.
    pub fn query(&self) -> &str {
        &self.options.query
    }

    /// Sets the query text and recompiles.
    pub fn set_query(&mut self, query: &str) {
        if self.options.query != query {
            self.options.query = query.to_owned();
            self.recompile();
        }
    }

    /// Sets regex mode and recompiles if it changed.
    pub fn set_regex(&mut self, is_regex: bool) {
        if self.options.is_regex != is_regex {
            self.options.is_regex = is_regex;
            self.recompile();
        }
    }

    /// Sets case matching and recompiles if it changed.
    pub fn set_match_case(&mut self, match_case: bool) {
        if self.options.match_case != match_case {
            self.options.match_case = match_case;
            self.recompile();
        }
    }

    /// Sets whole-word matching and recompiles if it changed.
    pub fn set_whole_word(&mut self, whole_word: bool) {
        if self.options.whole_word != whole_word {
            self.options.whole_word = whole_word;
            self.recompile();
        }
    }

    /// Direction does not affect the compiled pattern.
    pub fn set_search_down(&mut self, search_down: bool) {
        self.options.search_down = search_down;
    }

    /// Returns the compiled pattern, or `None` when there is nothing to
    /// search with (empty query or compile failure).
    pub fn query_object(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Returns why the last query failed to compile, if it did.
    pub fn pattern_error(&self) -> Option<&regex::Error> {
        self.pattern_error.as_ref()
    }

    /// Returns true if a compiled pattern is available.
    pub fn is_ready(&self) -> bool {
        self.regex.is_some()
    }

    fn recompile(&mut self) {
        match pattern::compile(&self.options) {
            Ok(regex) => {
                self.regex = regex;
                self.pattern_error = None;
            }
            Err(e) => {
                log::debug!("query {} did not compile: {}", self.options, e);
                self.regex = None;
                self.pattern_error = Some(e);
            }
        }
    }

    /// Replaces the text searched by the find operations.
    pub fn set_search_pool(&mut self, pool: impl Into<TextPool>) {
        self.pool = pool.into();
    }

    /// Returns the current search pool.
    pub fn pool(&self) -> &TextPool {
        &self.pool
    }

    /// Installs the formatter used by [`format_result`](Self::format_result).
    pub fn set_result_formatter<F>(&mut self, formatter: F)
    where
        F: Fn(&FileMatch) -> String + Send + Sync + 'static,
    {
        self.formatter = Arc::new(formatter);
    }

    /// Formats a result with the installed formatter.
    pub fn format_result(&self, result: &FileMatch) -> String {
        (self.formatter)(result)
    }

    /// Finds in the configured direction from `start`.
    pub fn find(&self, start: usize) -> Option<SearchMatch> {
        if self.options.search_down {
            self.find_next(start)
        } else {
            self.find_previous(start)
        }
    }

    /// Returns the first match starting at or after byte offset `start`.
    pub fn find_next(&self, start: usize) -> Option<SearchMatch> {
        let regex = self.regex.as_ref()?;
        let start = self.pool.ceil_char_boundary(start);
        regex.find_at(self.pool.as_str(), start).map(SearchMatch::from)
    }

    /// Returns the last match ending at or before byte offset `start`.
    ///
    /// Scans forward from the beginning of the pool on every call.
    pub fn find_previous(&self, start: usize) -> Option<SearchMatch> {
        let regex = self.regex.as_ref()?;
        regex
            .find_iter(self.pool.as_str())
            .take_while(|m| m.end() <= start)
            .last()
            .map(SearchMatch::from)
    }

    /// Returns every non-overlapping match in the pool.
    pub fn find_all(&self) -> Vec<SearchMatch> {
        match &self.regex {
            Some(regex) => regex
                .find_iter(self.pool.as_str())
                .map(SearchMatch::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Lazily yields each pool line that contains a match.
    pub fn find_all_lines(&self) -> LineMatches<'_> {
        LineMatches {
            pool: &self.pool,
            matches: self.regex.as_ref().map(|r| r.find_iter(self.pool.as_str())),
            last_line: None,
        }
    }

    /// Returns the number of non-overlapping matches.
    pub fn count(&self) -> usize {
        self.regex
            .as_ref()
            .map_or(0, |r| r.find_iter(self.pool.as_str()).count())
    }

    /// Converts a match to character offsets in the pool.
    pub fn char_range(&self, m: SearchMatch) -> (usize, usize) {
        (self.pool.byte_to_char(m.start), self.pool.byte_to_char(m.end))
    }

    /// Replaces every match in the pool, returning the new text and the
    /// number of replacements.
    ///
    /// Regex queries expand `$1` and `${name}` in `replacement`; literal
    /// queries insert it as-is.
    pub fn replace_all(&self, replacement: &str) -> (String, usize) {
        let text = self.pool.as_str();
        let Some(regex) = &self.regex else {
            return (text.to_owned(), 0);
        };

        let count = regex.find_iter(text).count();
        if count == 0 {
            return (text.to_owned(), 0);
        }

        let replaced = if self.options.is_regex {
            regex.replace_all(text, replacement)
        } else {
            regex.replace_all(text, NoExpand(replacement))
        };
        (replaced.into_owned(), count)
    }

    /// Like [`find_all_lines`](Self::find_all_lines), but tags each line with
    /// a buffer name so results read like file results.
    pub fn search_in_buffer(
        &self,
        name: impl Into<PathBuf>,
    ) -> impl Iterator<Item = FileMatch> + '_ {
        let name = name.into();
        self.find_all_lines().map(move |line| FileMatch {
            path: name.clone(),
            line_number: line.line_number,
            text: line.text,
        })
    }
}

/// Iterator over matching pool lines. See [`SearchEngine::find_all_lines`].
pub struct LineMatches<'a> {
    pool: &'a TextPool,
    matches: Option<regex::Matches<'a, 'a>>,
    last_line: Option<usize>,
}

impl Iterator for LineMatches<'_> {
    type Item = LineMatch;

    fn next(&mut self) -> Option<LineMatch> {
        let matches = self.matches.as_mut()?;
        for m in matches {
            let line = self.pool.byte_to_line(m.start());
            if self.last_line == Some(line) {
                continue;
            }
            self.last_line = Some(line);
            return Some(LineMatch {
                line_number: line + 1,
                text: self.pool.line(line).unwrap_or_default(),
            });
        }
        None
    }
}
