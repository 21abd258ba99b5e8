//! Data models for transfer tasks
//!
//! A [`Task`] names one entry of the local tree by its relative path. Paths
//! always use `/` separators and never start with one, so they map directly
//! onto URL path segments.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::TransferError;

/// Which way a task moves data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Local tree to WebDAV server
    Upload,
    /// WebDAV server to local tree (not implemented)
    Download,
}

/// What kind of entry a task refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Collection, created with MKCOL
    Directory,
    /// Resource, uploaded with PUT
    File,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Directory => write!(f, "directory"),
            TaskKind::File => write!(f, "file"),
        }
    }
}

/// One unit of transfer work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    path: String,
    kind: TaskKind,
    direction: Direction,
}

impl Task {
    /// Create a task; leading and trailing separators are stripped
    pub fn new(path: impl Into<String>, kind: TaskKind, direction: Direction) -> Self {
        let path = path.into();
        let path = path.trim_matches('/').to_string();
        Self {
            path,
            kind,
            direction,
        }
    }

    /// Upload task for a directory
    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, TaskKind::Directory, Direction::Upload)
    }

    /// Upload task for a regular file
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, TaskKind::File, Direction::Upload)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_directory(&self) -> bool {
        self.kind == TaskKind::Directory
    }

    /// Number of path segments; `a` is 1, `a/b` is 2
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Relative paths of every ancestor directory, outermost first
    pub fn ancestors(&self) -> Vec<&str> {
        self.path
            .match_indices('/')
            .map(|(idx, _)| &self.path[..idx])
            .collect()
    }

    /// Absolute local path under `root`
    pub fn local_path(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Successful task outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskSuccess {
    /// MKCOL created the collection
    Created,
    /// MKCOL found the collection already present
    AlreadyExists,
    /// PUT stored the resource
    Uploaded { bytes: u64 },
}

impl TaskSuccess {
    pub fn bytes(&self) -> u64 {
        match self {
            TaskSuccess::Uploaded { bytes } => *bytes,
            _ => 0,
        }
    }
}

/// Final record for one task, produced by the worker that handled it
#[derive(Debug)]
pub struct TaskReport {
    pub task: Task,
    pub outcome: Result<TaskSuccess, TransferError>,
    /// Requests issued, retries included; zero if never dispatched
    pub attempts: u32,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Report for a task that was never dispatched
    pub fn not_dispatched(task: Task, error: TransferError) -> Self {
        Self {
            task,
            outcome: Err(error),
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }
}
