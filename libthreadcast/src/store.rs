//! Reading and rewriting the posts and archive files
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so an interrupted run never leaves a half-written posts file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, StoreError, ThreadcastError};
use crate::types::{ArchiveDocument, ArchivedThread, PostsDocument, Thread, ThreadsDocument};

impl PostsDocument {
    /// Load and parse the posts file
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| {
        StoreError::Parse {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Serialize `value` as indented JSON and atomically replace `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(StoreError::Serialize)?;
    content.push('\n');

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "threadcast".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp_path, content).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;

    debug!(path = %path.display(), "wrote document");
    Ok(())
}

/// Append-only record of published threads
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the archive; a missing or unreadable file is treated as empty
    pub fn load(&self) -> ArchiveDocument {
        if !self.path.exists() {
            return ArchiveDocument::default();
        }

        match read_json(&self.path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Starting a fresh archive: {}", e);
                ArchiveDocument::default()
            }
        }
    }

    pub fn append(&self, entry: ArchivedThread) -> Result<()> {
        let mut doc = self.load();
        doc.threads.push(entry);
        write_json(&self.path, &doc)
    }
}

/// In-memory state of one pending thread during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadProgress {
    /// Ids of the tweets already published, in thread order
    pub posted_ids: Vec<String>,
    /// Set once the thread has failed in a way retrying cannot fix
    pub abandoned: bool,
}

/// Pending threads backed by the posts file
///
/// Publishing a thread removes it from the posts file and appends it to the
/// archive, in that order of durability: archive first, then posts.
#[derive(Debug)]
pub struct ThreadStore {
    posts_path: PathBuf,
    document: ThreadsDocument,
    archive: Archive,
    /// One entry per pending thread, kept aligned with `document.threads`
    progress: Vec<ThreadProgress>,
}

impl ThreadStore {
    pub fn new(posts_path: impl Into<PathBuf>, document: ThreadsDocument, archive: Archive) -> Self {
        let progress = vec![ThreadProgress::default(); document.threads.len()];
        Self {
            posts_path: posts_path.into(),
            document,
            archive,
            progress,
        }
    }

    /// Load the posts file, which must hold a thread document
    pub fn load(posts_path: &Path, archive: Archive) -> Result<Self> {
        match PostsDocument::load(posts_path)? {
            PostsDocument::Threads(document) => Ok(Self::new(posts_path, document, archive)),
            PostsDocument::Posts(_) => Err(ThreadcastError::InvalidInput(format!(
                "{} holds a plain list of posts, not threads",
                posts_path.display()
            ))),
        }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.document.threads
    }

    pub fn len(&self) -> usize {
        self.document.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.threads.is_empty()
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Progress of the pending thread at `index` (0-based)
    pub fn progress(&self, index: usize) -> Option<&ThreadProgress> {
        self.progress.get(index)
    }

    pub fn progress_mut(&mut self, index: usize) -> Option<&mut ThreadProgress> {
        self.progress.get_mut(index)
    }

    /// Number of threads that are neither published nor abandoned
    pub fn postable(&self) -> usize {
        self.progress.iter().filter(|p| !p.abandoned).count()
    }

    /// Record the thread at `index` (0-based) as published
    pub fn complete(&mut self, index: usize, posted_ids: Vec<String>) -> Result<()> {
        if index >= self.document.threads.len() {
            return Err(ThreadcastError::InvalidInput(format!(
                "No pending thread at position {}",
                index + 1
            )));
        }

        let thread = self.document.threads.remove(index);
        self.progress.remove(index);
        self.archive.append(ArchivedThread::new(thread, posted_ids))?;
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        write_json(&self.posts_path, &self.document)
    }
}
