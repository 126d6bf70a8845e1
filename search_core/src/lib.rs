//! Editra search - find/replace engine.
//!
//! This crate holds the editor's search logic without any dependency on a
//! windowing toolkit: query compilation, find next/previous/all over an
//! in-memory pool, replace-all, and line searches over files and directory
//! trees, optionally run on a background thread.

pub mod engine;
pub mod error;
pub mod files;
pub mod options;
pub mod pattern;
pub mod pool;
pub mod result;
pub mod worker;

pub use engine::{LineMatches, SearchEngine};
pub use error::{Result, SearchError};
pub use files::FileSearch;
pub use options::{DirectoryOptions, SearchOptions};
pub use pool::TextPool;
pub use result::{FileMatch, LineMatch, ResultFormatter, SearchMatch, SearchStats};
pub use worker::{SearchEvent, SearchJob, SearchTarget};
