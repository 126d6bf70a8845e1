//! Background search job.
//!
//! The job runs a search on its own thread and streams events back over a
//! channel so the caller never blocks on file I/O.

use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::engine::SearchEngine;
use crate::error::SearchError;
use crate::files::FileSearch;
use crate::options::DirectoryOptions;
use crate::result::{FileMatch, SearchStats};

/// What a [`SearchJob`] searches.
#[derive(Debug, Clone)]
pub enum SearchTarget {
    /// A named in-memory buffer.
    Buffer {
        /// Name reported as the path of each match.
        name: PathBuf,
        text: String,
    },
    /// A single file.
    File(PathBuf),
    /// Several files, in order.
    Files(Vec<PathBuf>),
    /// A directory tree.
    Directory {
        path: PathBuf,
        options: DirectoryOptions,
    },
}

/// Events sent from the search thread.
#[derive(Debug)]
pub enum SearchEvent {
    /// A matching line.
    Match(FileMatch),
    /// A file or directory could not be searched. The job keeps going.
    Error(SearchError),
    /// The job is done. Always the last event.
    Finished { stats: SearchStats, cancelled: bool },
}

/// Handle to a search running on a background thread.
pub struct SearchJob {
    event_rx: Receiver<SearchEvent>,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl SearchJob {
    /// Starts searching `target` with a copy of `engine`.
    pub fn spawn(engine: SearchEngine, target: SearchTarget) -> io::Result<Self> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let thread_cancel = cancel.clone();
        let thread_running = running.clone();
        let spawned = thread::Builder::new()
            .name("search-job".to_string())
            .spawn(move || {
                let _running = RunningGuard(thread_running);
                log::debug!("search job started: {}", engine.options());
                run_job(engine, target, &event_tx, &thread_cancel);
            });

        if let Err(e) = spawned {
            running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        Ok(Self {
            event_rx,
            cancel,
            running,
        })
    }

    /// Tries to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<SearchEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits for the next event. Returns `None` once the job has finished
    /// and every event has been received.
    pub fn recv(&self) -> Option<SearchEvent> {
        self.event_rx.recv().ok()
    }

    /// Blocking iterator over the remaining events.
    pub fn iter(&self) -> impl Iterator<Item = SearchEvent> + '_ {
        self.event_rx.iter()
    }

    /// Asks the search thread to stop. It still sends `Finished`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Returns whether the job was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Returns whether the search thread is still working.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SearchJob {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Clears the running flag when the search thread exits, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn run_job(
    mut engine: SearchEngine,
    target: SearchTarget,
    event_tx: &Sender<SearchEvent>,
    cancel: &Arc<AtomicBool>,
) {
    let stats = match target {
        SearchTarget::Buffer { name, text } => {
            engine.set_search_pool(text);
            let mut stats = SearchStats::default();
            for m in engine.search_in_buffer(name) {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                stats.matches += 1;
                if event_tx.send(SearchEvent::Match(m)).is_err() {
                    cancel.store(true, Ordering::SeqCst);
                    break;
                }
            }
            stats
        }
        SearchTarget::File(path) => drain(engine.search_in_file(path), event_tx, cancel),
        SearchTarget::Files(paths) => drain(engine.search_in_files(paths), event_tx, cancel),
        SearchTarget::Directory { path, options } => match engine.search_in_directory(&path, &options) {
            Ok(search) => drain(search, event_tx, cancel),
            Err(e) => {
                log::warn!("cannot search {}: {}", path.display(), e);
                let _ = event_tx.send(SearchEvent::Error(e));
                SearchStats::default()
            }
        },
    };

    let cancelled = cancel.load(Ordering::SeqCst);
    log::debug!(
        "search job finished: {} matches in {} files{}",
        stats.matches,
        stats.files_searched,
        if cancelled { " (cancelled)" } else { "" }
    );
    let _ = event_tx.send(SearchEvent::Finished { stats, cancelled });
}

fn drain(
    search: FileSearch,
    event_tx: &Sender<SearchEvent>,
    cancel: &Arc<AtomicBool>,
) -> SearchStats {
    let mut search = search.with_cancel_flag(cancel.clone());
    for item in search.by_ref() {
        let event = match item {
            Ok(m) => SearchEvent::Match(m),
            Err(e) => SearchEvent::Error(e),
        };
        // Receiver gone means nobody is listening anymore.
        if event_tx.send(event).is_err() {
            cancel.store(true, Ordering::SeqCst);
            break;
        }
    }
    search.stats()
}
