//! Destination layout and per-contest index files.
//!
//! Documents are stored as
//!
//! ```text
//! <base>/<board>/<institution>_<year>/<exams|gabaritos>/<name> (<year>).pdf
//! <base>/<board>/<institution>_<year>/info.txt
//! ```
//!
//! `info.txt` is the contest index: a header block written once, when the
//! file is created, followed by one `- [kind] name` line per stored document.
//! Appends for the same contest must be serialized by the caller; use
//! [`ContestLocks`] when downloads run in parallel.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::model::{DocumentKind, ResultItem, sanitize_display_name};

/// File name of the per-contest index.
pub const INDEX_FILE_NAME: &str = "info.txt";

/// Directory name used when a path component is empty after sanitization.
pub const UNKNOWN_COMPONENT: &str = "unknown";

/// Marker line that separates the index header from its entries.
pub const ENTRIES_MARKER: &str = "=== Entries ===";

/// Errors raised while preparing directories or writing the index.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// A destination directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The contest index could not be opened or written.
    #[error("cannot write contest index {path}: {source}")]
    Index {
        /// Index file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Deterministic destination of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    contest_dir: PathBuf,
    kind_dir: PathBuf,
}

impl DestinationPath {
    /// Computes `base/board/institution_year/<kind>s/` without touching disk.
    #[must_use]
    pub fn compute(
        base_dir: &Path,
        examining_board: &str,
        institution: &str,
        year: &str,
        kind: DocumentKind,
    ) -> Self {
        let contest = format!(
            "{}_{}",
            path_component(institution),
            sanitize_display_name(year)
        );
        let contest_dir = base_dir.join(path_component(examining_board)).join(contest);
        let kind_dir = contest_dir.join(kind.dir_name());
        Self {
            contest_dir,
            kind_dir,
        }
    }

    /// Computes the destination of `item` under `base_dir`.
    #[must_use]
    pub fn for_item(base_dir: &Path, item: &ResultItem) -> Self {
        Self::compute(
            base_dir,
            &item.examining_board,
            &item.institution,
            &item.year,
            item.kind,
        )
    }

    /// Contest directory (`base/board/institution_year`), home of the index.
    #[must_use]
    pub fn contest_dir(&self) -> &Path {
        &self.contest_dir
    }

    /// Kind directory (`.../exams` or `.../gabaritos`).
    #[must_use]
    pub fn kind_dir(&self) -> &Path {
        &self.kind_dir
    }

    /// Full path of the document file for `item`.
    #[must_use]
    pub fn file_path(&self, item: &ResultItem) -> PathBuf {
        self.kind_dir.join(item.file_name())
    }
}

/// Sanitizes one directory name; never returns an empty or dot-only name.
fn path_component(raw: &str) -> String {
    let cleaned = sanitize_display_name(raw);
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        UNKNOWN_COMPONENT.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Computes the destination of `item` and creates its directories.
///
/// Existing directories are not an error.
///
/// # Errors
///
/// Returns [`OrganizeError::CreateDir`] if the directories cannot be created.
#[instrument(level = "debug", skip(item), fields(name = %item.display_name, base = %base_dir.display()))]
pub async fn place(item: &ResultItem, base_dir: &Path) -> Result<DestinationPath, OrganizeError> {
    let destination = DestinationPath::for_item(base_dir, item);
    tokio::fs::create_dir_all(destination.kind_dir())
        .await
        .map_err(|source| OrganizeError::CreateDir {
            path: destination.kind_dir().to_path_buf(),
            source,
        })?;
    debug!(dir = %destination.kind_dir().display(), "destination ready");
    Ok(destination)
}

fn index_header(item: &ResultItem) -> String {
    format!(
        "=== Contest ===\n\nInstitution: {}\nBoard: {}\nYear: {}\nLevel: {}\n\n{ENTRIES_MARKER}\n",
        item.institution,
        item.examining_board,
        item.year,
        item.level.as_deref().unwrap_or("N/A"),
    )
}

/// Appends an entry for `item` to the contest index in `contest_dir`.
///
/// The header is written only by the call that creates the file; creation
/// uses `create_new`, so the existence check and the header write cannot
/// interleave with another writer.
///
/// # Errors
///
/// Returns [`OrganizeError::Index`] if the index cannot be opened or written.
#[instrument(level = "debug", skip(item), fields(contest = %contest_dir.display(), name = %item.display_name))]
pub async fn record_index(contest_dir: &Path, item: &ResultItem) -> Result<(), OrganizeError> {
    let path = contest_dir.join(INDEX_FILE_NAME);
    let index_err = |source| OrganizeError::Index {
        path: path.clone(),
        source,
    };

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(mut file) => {
            debug!("creating contest index");
            file.write_all(index_header(item).as_bytes())
                .await
                .map_err(index_err)?;
            file
        }
        Err(error) if error.kind() == ErrorKind::AlreadyExists => OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(index_err)?,
        Err(error) => return Err(index_err(error)),
    };

    let entry = format!("- [{}] {}\n", item.kind.label(), item.display_name);
    file.write_all(entry.as_bytes()).await.map_err(index_err)?;
    file.flush().await.map_err(index_err)?;
    Ok(())
}

/// Per-contest mutual exclusion for index writes.
///
/// Locks are created on first use and live for the duration of the run.
#[derive(Debug, Default)]
pub struct ContestLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ContestLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock guarding `contest_dir`.
    ///
    /// The `DashMap` shard lock is released before the caller awaits the
    /// returned mutex.
    #[must_use]
    pub fn lock_for(&self, contest_dir: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(contest_dir.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
