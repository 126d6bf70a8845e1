//! Editra search - find text in files, directories or standard input.
//!
//! Usage: editra-search [OPTIONS] <QUERY> [PATH]...

use clap::Parser;
use editra_search_core::{
    DirectoryOptions, FileMatch, SearchEngine, SearchEvent, SearchJob, SearchOptions, SearchTarget,
};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "editra-search", version, about = "Search files the way the Editra find dialog does")]
struct Args {
    /// Text or regular expression to search for.
    query: String,

    /// Files or directories to search. Reads standard input when empty.
    paths: Vec<PathBuf>,

    /// Treat the query as literal text instead of a regular expression.
    #[arg(short = 'F', long)]
    fixed_strings: bool,

    /// Match regardless of letter case.
    #[arg(short, long)]
    ignore_case: bool,

    /// Only match whole words.
    #[arg(short, long = "word-regexp")]
    word_regexp: bool,

    /// Do not descend into subdirectories.
    #[arg(long)]
    no_recursive: bool,

    /// Search hidden files and directories.
    #[arg(long)]
    hidden: bool,

    /// Only search files whose name matches this glob. Repeatable.
    #[arg(short, long = "glob", value_name = "PATTERN")]
    globs: Vec<String>,

    /// Skip files larger than this many bytes.
    #[arg(long, value_name = "BYTES")]
    max_filesize: Option<u64>,

    /// Print only the number of matching lines.
    #[arg(short, long)]
    count: bool,

    /// Print one JSON object per matching line.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn search_options(&self) -> SearchOptions {
        SearchOptions::new(self.query.clone())
            .with_regex(!self.fixed_strings)
            .with_match_case(!self.ignore_case)
            .with_whole_word(self.word_regexp)
    }

    fn directory_options(&self) -> DirectoryOptions {
        DirectoryOptions {
            recursive: !self.no_recursive,
            include_hidden: self.hidden,
            filters: self.globs.clone(),
            max_file_size: self.max_filesize,
        }
    }

    /// Groups consecutive file arguments so they run as one job. Without
    /// paths, `input` becomes the search pool.
    fn targets(&self, mut input: impl Read) -> io::Result<Vec<SearchTarget>> {
        if self.paths.is_empty() {
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            return Ok(vec![SearchTarget::Buffer {
                name: PathBuf::from("<stdin>"),
                text,
            }]);
        }

        let mut targets = Vec::new();
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                if !files.is_empty() {
                    targets.push(SearchTarget::Files(std::mem::take(&mut files)));
                }
                targets.push(SearchTarget::Directory {
                    path: path.clone(),
                    options: self.directory_options(),
                });
            } else {
                files.push(path.clone());
            }
        }
        if !files.is_empty() {
            targets.push(SearchTarget::Files(files));
        }
        Ok(targets)
    }
}

/// Exit status: some line matched.
const EXIT_MATCH: u8 = 0;
/// Exit status: nothing matched.
const EXIT_NO_MATCH: u8 = 1;
/// Exit status: bad pattern or the search could not run.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let stdout = io::stdout();
    ExitCode::from(run(&args, io::stdin(), stdout.lock()))
}

/// Runs a search for `args`, writing results to `out`. Returns the exit status.
fn run(args: &Args, input: impl Read, mut out: impl Write) -> u8 {
    let mut engine = SearchEngine::new(args.search_options());

    if !engine.is_ready() {
        match engine.pattern_error() {
            Some(e) => log::error!("invalid pattern '{}': {}", args.query, e),
            None => log::error!("empty query"),
        }
        return EXIT_ERROR;
    }

    if args.paths.is_empty() {
        engine.set_result_formatter(|m: &FileMatch| format!("{}: {}", m.line_number, m.text));
    }

    let targets = match args.targets(input) {
        Ok(targets) => targets,
        Err(e) => {
            log::error!("failed to read standard input: {}", e);
            return EXIT_ERROR;
        }
    };

    log::info!("searching for {}", engine.options());

    let mut total = 0usize;

    for target in targets {
        let job = match SearchJob::spawn(engine.clone(), target) {
            Ok(job) => job,
            Err(e) => {
                log::error!("failed to start search: {}", e);
                return EXIT_ERROR;
            }
        };

        for event in job.iter() {
            match event {
                SearchEvent::Match(m) => {
                    total += 1;
                    if args.count {
                        continue;
                    }
                    let written = if args.json {
                        serde_json::to_string(&m)
                            .map_err(io::Error::from)
                            .and_then(|line| writeln!(out, "{}", line))
                    } else {
                        writeln!(out, "{}", engine.format_result(&m))
                    };
                    if let Err(e) = written {
                        // Broken pipe: the reader went away.
                        log::debug!("stopping output: {}", e);
                        job.cancel();
                        return exit_code(total);
                    }
                }
                SearchEvent::Error(e) => log::error!("{}", e),
                SearchEvent::Finished { stats, cancelled } => {
                    log::info!(
                        "{} files searched, {} skipped, {} matching lines{}",
                        stats.files_searched,
                        stats.files_skipped,
                        stats.matches,
                        if cancelled { " (cancelled)" } else { "" }
                    );
                }
            }
        }
    }

    if args.count {
        let _ = writeln!(out, "{}", total);
    }
    let _ = out.flush();

    exit_code(total)
}

fn exit_code(matches: usize) -> u8 {
    if matches > 0 {
        EXIT_MATCH
    } else {
        EXIT_NO_MATCH
    }
}
