//! Line-by-line search over files and directory trees.
//!
//! Each search is a pull-based iterator: results are produced one at a time
//! as the caller asks for them, and dropping the iterator stops the search.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::options::DirectoryOptions;
use crate::pool::trim_line_ending;
use crate::result::{FileMatch, SearchStats};

/// Bytes inspected when deciding whether a file is binary.
const BINARY_PROBE_LEN: usize = 8 * 1024;

type PathSource = Box<dyn Iterator<Item = Result<PathBuf>>>;

impl SearchEngine {
    /// Searches a single file.
    pub fn search_in_file(&self, path: impl Into<PathBuf>) -> FileSearch {
        self.search_in_files(vec![path.into()])
    }

    /// Searches files in the given order.
    pub fn search_in_files<I, P>(&self, paths: I) -> FileSearch
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        FileSearch::new(self.query_object().cloned(), Box::new(paths.into_iter().map(Ok)))
    }

    /// Searches every file under `dir` accepted by `options`.
    ///
    /// Fails up front only if a file filter is not a valid glob. Walk errors
    /// are reported through the iterator.
    pub fn search_in_directory(
        &self,
        dir: impl AsRef<Path>,
        options: &DirectoryOptions,
    ) -> Result<FileSearch> {
        let paths = walk_directory(dir.as_ref(), options)?;
        Ok(FileSearch::new(self.query_object().cloned(), paths))
    }
}

fn build_filters(filters: &[String]) -> Result<Option<GlobSet>> {
    if filters.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for filter in filters {
        builder.add(Glob::new(filter)?);
    }
    Ok(Some(builder.build()?))
}

fn walk_directory(dir: &Path, options: &DirectoryOptions) -> Result<PathSource> {
    let filters = build_filters(&options.filters)?;
    let max_file_size = options.max_file_size;

    let mut builder = WalkBuilder::new(dir);
    builder
        .standard_filters(false)
        .hidden(!options.include_hidden)
        .follow_links(false)
        .max_depth(if options.recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b));

    let walker = builder.build().filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => return Some(Err(SearchError::from(err))),
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            return None;
        }
        if let Some(set) = &filters {
            if !set.is_match(entry.file_name()) {
                return None;
            }
        }
        if let Some(limit) = max_file_size {
            match entry.metadata() {
                Ok(meta) if meta.len() > limit => {
                    log::debug!("skipping {} ({} bytes)", entry.path().display(), meta.len());
                    return None;
                }
                Ok(_) => {}
                Err(err) => return Some(Err(SearchError::from(err))),
            }
        }
        Some(Ok(entry.into_path()))
    });
    Ok(Box::new(walker))
}

struct OpenFile {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: usize,
}

/// Iterator over matching lines of a sequence of files.
///
/// Yields `Err` for files that cannot be read and keeps going with the next
/// file. Files that look binary are skipped silently.
pub struct FileSearch {
    regex: Option<Regex>,
    paths: PathSource,
    current: Option<OpenFile>,
    line_buf: Vec<u8>,
    stats: SearchStats,
    cancel: Option<Arc<AtomicBool>>,
}

impl FileSearch {
    fn new(regex: Option<Regex>, paths: PathSource) -> Self {
        Self {
            regex,
            paths,
            current: None,
            line_buf: Vec::new(),
            stats: SearchStats::default(),
            cancel: None,
        }
    }

    /// Stops the iteration as soon as `flag` becomes true, even in the middle
    /// of a file.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Counters for the work done so far.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Opens the next file worth scanning, or returns an error item.
    fn open_next(&mut self) -> Option<Result<()>> {
        loop {
            let path = match self.paths.next()? {
                Ok(path) => path,
                Err(err) => return Some(Err(err)),
            };

            let file = match File::open(&path) {
                Ok(file) => file,
                Err(err) => {
                    log::warn!("cannot open {}: {}", path.display(), err);
                    self.stats.files_skipped += 1;
                    return Some(Err(SearchError::io(path, err)));
                }
            };

            let mut reader = BufReader::with_capacity(BINARY_PROBE_LEN, file);
            match reader.fill_buf() {
                Ok(head) if head.contains(&0) => {
                    log::debug!("skipping binary file {}", path.display());
                    self.stats.files_skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("cannot read {}: {}", path.display(), err);
                    self.stats.files_skipped += 1;
                    return Some(Err(SearchError::io(path, err)));
                }
            }

            self.stats.files_searched += 1;
            self.current = Some(OpenFile {
                path,
                reader,
                line_number: 0,
            });
            return Some(Ok(()));
        }
    }
}

impl Iterator for FileSearch {
    type Item = Result<FileMatch>;

    fn next(&mut self) -> Option<Result<FileMatch>> {
        if self.regex.is_none() {
            return None;
        }

        loop {
            if self.is_cancelled() {
                return None;
            }

            let Some(file) = self.current.as_mut() else {
                if let Err(err) = self.open_next()? {
                    return Some(Err(err));
                }
                continue;
            };

            self.line_buf.clear();
            match file.reader.read_until(b'\n', &mut self.line_buf) {
                Ok(0) => {
                    self.current = None;
                }
                Ok(_) => {
                    file.line_number += 1;
                    let mut line = String::from_utf8_lossy(&self.line_buf).into_owned();
                    trim_line_ending(&mut line);
                    if self.regex.as_ref().is_some_and(|r| r.is_match(&line)) {
                        self.stats.matches += 1;
                        return Some(Ok(FileMatch {
                            path: file.path.clone(),
                            line_number: file.line_number,
                            text: line,
                        }));
                    }
                }
                Err(err) => {
                    log::warn!("error reading {}: {}", file.path.display(), err);
                    let path = file.path.clone();
                    self.current = None;
                    return Some(Err(SearchError::io(path, err)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SearchOptions;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn names(results: &[FileMatch], root: &Path) -> Vec<String> {
        results
            .iter()
            .map(|m| {
                let rel = m.path.strip_prefix(root).unwrap_or(&m.path);
                format!("{}:{}", rel.display(), m.line_number)
            })
            .collect()
    }

    #[test]
    fn test_search_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", b"alpha\nbeta\r\nalphabet\n");
        let engine = SearchEngine::new(SearchOptions::literal("alpha"));

        let mut search = engine.search_in_file(&path);
        let results: Vec<FileMatch> = search.by_ref().map(Result::unwrap).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].line_number, 1);
        assert_eq!(results[1].text, "alphabet");
        assert_eq!(
            engine.format_result(&results[0]),
            format!("{}:1: alpha", path.display())
        );
        assert_eq!(search.stats().files_searched, 1);
        assert_eq!(search.stats().matches, 2);
    }

    #[test]
    fn test_search_in_files_reports_errors_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", b"needle\n");
        let missing = dir.path().join("missing.txt");
        let b = write(dir.path(), "b.txt", b"hay\nneedle\n");
        let engine = SearchEngine::new(SearchOptions::literal("needle"));

        let mut search = engine.search_in_files([a, missing.clone(), b]);
        let items: Vec<Result<FileMatch>> = search.by_ref().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(err) => assert_eq!(err.path(), Some(missing.as_path())),
            Ok(m) => panic!("expected error, got {m}"),
        }
        assert_eq!(items[2].as_ref().unwrap().line_number, 2);
        assert_eq!(search.stats().files_searched, 2);
        assert_eq!(search.stats().files_skipped, 1);
    }

    #[test]
    fn test_buffer_and_file_lines_agree() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            "page\x0cnext needle\n",
            "old\rmac needle\n",
            "para\u{2028}sep needle\nsecond needle\r\n",
            "first\nthird\u{0085}needle",
        ];
        for (i, text) in cases.into_iter().enumerate() {
            let path = write(dir.path(), &format!("case{i}.txt"), text.as_bytes());
            let mut engine = SearchEngine::new(SearchOptions::literal("needle"));
            engine.set_search_pool(text);

            let from_file: Vec<(usize, String)> = engine
                .search_in_file(&path)
                .map(|m| m.map(|m| (m.line_number, m.text)).unwrap())
                .collect();
            let from_buffer: Vec<(usize, String)> = engine
                .search_in_buffer(&path)
                .map(|m| (m.line_number, m.text))
                .collect();
            assert!(!from_file.is_empty(), "{text:?}");
            assert_eq!(from_buffer, from_file, "{text:?}");
        }
    }

    #[test]
    fn test_binary_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bin = write(dir.path(), "blob.bin", b"needle\0\x01\x02");
        let engine = SearchEngine::new(SearchOptions::literal("needle"));

        let mut search = engine.search_in_file(bin);
        assert!(search.next().is_none());
        assert_eq!(search.stats().files_skipped, 1);
    }

    #[test]
    fn test_lossy_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "latin1.txt", b"caf\xe9 needle\n");
        let engine = SearchEngine::new(SearchOptions::literal("needle"));

        let result = engine.search_in_file(path).next().unwrap().unwrap();
        assert_eq!(result.text, "caf\u{FFFD} needle");
    }

    #[test]
    fn test_no_pattern_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", b"(unclosed\n");
        let engine = SearchEngine::new(SearchOptions::new("(unclosed"));
        assert_eq!(engine.search_in_file(path).count(), 0);
    }

    #[test]
    fn test_search_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.rs", b"fn needle() {}\n");
        write(root, "a.txt", b"needle\nno\nneedle again\n");
        write(root, "sub/c.rs", b"// needle\n");
        write(root, ".hidden/d.rs", b"needle\n");
        write(root, ".e.txt", b"needle\n");
        let engine = SearchEngine::new(SearchOptions::literal("needle"));

        let results: Vec<FileMatch> = engine
            .search_in_directory(root, &DirectoryOptions::default())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(names(&results, root), vec!["a.txt:1", "a.txt:3", "b.rs:1", "sub/c.rs:1"]);
    }

    #[test]
    fn test_search_in_directory_options() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.rs", b"needle\n");
        write(root, "a.txt", b"needle\n");
        write(root, "sub/c.rs", b"needle\n");
        write(root, ".hidden/d.rs", b"needle\n");
        write(root, "big.rs", &[b'x'; 4096]);
        let engine = SearchEngine::new(SearchOptions::literal("needle"));

        let flat = DirectoryOptions {
            recursive: false,
            ..DirectoryOptions::default()
        };
        let results: Vec<FileMatch> = engine
            .search_in_directory(root, &flat)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(names(&results, root), vec!["a.txt:1", "b.rs:1"]);

        let rust_only = DirectoryOptions {
            include_hidden: true,
            filters: vec!["*.rs".to_string()],
            max_file_size: Some(1024),
            ..DirectoryOptions::default()
        };
        let mut search = engine.search_in_directory(root, &rust_only).unwrap();
        let results: Vec<FileMatch> = search.by_ref().map(Result::unwrap).collect();
        assert_eq!(names(&results, root), vec![".hidden/d.rs:1", "b.rs:1", "sub/c.rs:1"]);
        assert_eq!(search.stats().files_searched, 3);
    }

    #[test]
    fn test_invalid_filter() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SearchEngine::new(SearchOptions::literal("x"));
        let opts = DirectoryOptions {
            filters: vec!["[".to_string()],
            ..DirectoryOptions::default()
        };
        assert!(matches!(
            engine.search_in_directory(dir.path(), &opts),
            Err(SearchError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_cancel_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", b"needle\nneedle\nneedle\n");
        let engine = SearchEngine::new(SearchOptions::literal("needle"));
        let flag = Arc::new(AtomicBool::new(false));

        let mut search = engine.search_in_file(path).with_cancel_flag(flag.clone());
        assert!(search.next().is_some());
        flag.store(true, Ordering::Relaxed);
        assert!(search.next().is_none());
    }
}
