//! Path classification and batch processing of markdown files
//!
//! A path is classified first, with a time limit on directory enumeration.
//! Only then is the per-file callback run over every markdown file found.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::document::Outcome;
use crate::error::{Error, Result};

/// Default time limit for directory enumeration
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(1500);

/// What a path turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    MarkdownFile,
    OtherFile,
    /// Directory containing at least one markdown file
    MarkdownDir,
    /// Directory without markdown files
    OtherDir,
    /// Directory that could not be enumerated within the time limit
    TooLarge,
    /// Missing, inaccessible, or neither file nor directory
    Invalid,
}

/// Whether `path` has a `.md` or `.markdown` extension, in any case
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

/// Classify `path`, giving up on directories that take longer than `timeout` to enumerate
pub fn classify(path: &Path, timeout: Duration) -> PathKind {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            debug!("{}: {}", path.display(), err);
            return PathKind::Invalid;
        }
    };

    if metadata.is_file() {
        return if is_markdown(path) {
            PathKind::MarkdownFile
        } else {
            PathKind::OtherFile
        };
    }
    if !metadata.is_dir() {
        return PathKind::Invalid;
    }

    let start = Instant::now();
    let mut found_markdown = false;

    for entry in WalkDir::new(path) {
        if start.elapsed() >= timeout {
            return PathKind::TooLarge;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_permission_denied(&err) => {
                debug!("skipping: {}", err);
                continue;
            }
            Err(err) => {
                warn!("error while scanning {}: {}", path.display(), err);
                return PathKind::Invalid;
            }
        };

        if entry.file_type().is_file() && is_markdown(entry.path()) {
            found_markdown = true;
        }
    }

    if found_markdown {
        PathKind::MarkdownDir
    } else {
        PathKind::OtherDir
    }
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == io::ErrorKind::PermissionDenied)
        .unwrap_or(false)
}

/// Markdown files under `dir`, in file name order
pub fn markdown_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_markdown(entry.path()))
        .map(walkdir::DirEntry::into_path)
}

/// Tally of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Files the callback was run on
    pub processed: usize,
    pub modified: usize,
    /// Files with code blocks, none of which needed a change
    pub unchanged: usize,
    /// Files without code blocks
    pub no_blocks: usize,
    pub failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Modified { .. } => self.modified += 1,
            Outcome::Unchanged { .. } => self.unchanged += 1,
            Outcome::NoBlocks => self.no_blocks += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Run `f` on `path` if it is a markdown file, or on every markdown file under it
///
/// A single file's error is returned as is. In a directory, a failing file
/// is logged and counted, and the run moves on to the next file.
pub fn run<F>(path: &Path, timeout: Duration, mut f: F) -> Result<Summary>
where
    F: FnMut(&Path) -> Result<Outcome>,
{
    let mut summary = Summary::default();

    match classify(path, timeout) {
        PathKind::MarkdownFile => {
            info!("processing {}", path.display());
            let outcome = f(path)?;
            summary.record(&outcome);
        }
        PathKind::MarkdownDir => {
            info!("processing markdown files in {}", path.display());
            for file in markdown_files(path) {
                match f(&file) {
                    Ok(outcome) => summary.record(&outcome),
                    Err(err) => {
                        error!("{}", err);
                        summary.processed += 1;
                        summary.failed += 1;
                    }
                }
            }
            info!(
                "{} file(s) processed: {} modified, {} unchanged, {} without code blocks, {} failed",
                summary.processed, summary.modified, summary.unchanged, summary.no_blocks, summary.failed
            );
        }
        PathKind::OtherFile | PathKind::OtherDir => {
            return Err(Error::NoMarkdownFiles {
                path: path.to_path_buf(),
            })
        }
        PathKind::TooLarge => {
            return Err(Error::ScanTimeout {
                path: path.to_path_buf(),
                timeout,
            })
        }
        PathKind::Invalid => {
            return Err(Error::InvalidPath {
                path: path.to_path_buf(),
            })
        }
    }

    Ok(summary)
}
