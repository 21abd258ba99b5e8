//! Local tree enumeration
//!
//! The tree is walked twice: the first pass yields only directories, the
//! second only regular files. Both passes sort entries by name within each
//! directory and exclude the root itself. Symbolic links are not followed and,
//! like sockets, devices and FIFOs, are skipped. Empty directories are still
//! yielded so their collections get created.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::app::models::{Direction, Task, TaskKind};
use crate::errors::{WalkError, WalkResult};

/// Two-pass walker over a local root directory
#[derive(Debug, Clone)]
pub struct Enumerator {
    root: PathBuf,
}

impl Enumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pass 1: directory tasks in walk order
    pub fn directories(&self) -> Pass {
        Pass::new(&self.root, TaskKind::Directory)
    }

    /// Pass 2: file tasks in walk order
    pub fn files(&self) -> Pass {
        Pass::new(&self.root, TaskKind::File)
    }
}

/// One lazy, non-restartable pass over the tree
///
/// The first traversal error is yielded and ends the pass.
pub struct Pass {
    inner: walkdir::IntoIter,
    root: PathBuf,
    kind: TaskKind,
    failed: bool,
}

impl Pass {
    fn new(root: &Path, kind: TaskKind) -> Self {
        let inner = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Self {
            inner,
            root: root.to_path_buf(),
            kind,
            failed: false,
        }
    }
}

fn accepts(kind: TaskKind, file_type: std::fs::FileType) -> bool {
    match kind {
        TaskKind::Directory => file_type.is_dir(),
        TaskKind::File => file_type.is_file(),
    }
}

impl Iterator for Pass {
    type Item = WalkResult<Task>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        for entry in self.inner.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    self.failed = true;
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(WalkError::Traversal { path, source }));
                }
            };

            let file_type = entry.file_type();
            if !accepts(self.kind, file_type) {
                // Report skipped specials once, during the file pass
                if self.kind == TaskKind::File && !file_type.is_dir() {
                    if file_type.is_symlink() {
                        debug!("Skipping symbolic link {}", entry.path().display());
                    } else {
                        warn!("Skipping special file {}", entry.path().display());
                    }
                }
                continue;
            }

            return match relative_path(&self.root, entry.path()) {
                Ok(path) => Some(Ok(Task::new(path, self.kind, Direction::Upload))),
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            };
        }

        None
    }
}

/// `/`-joined path of `path` relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> WalkResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| WalkError::OutsideRoot {
            path: path.to_path_buf(),
        })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| WalkError::NonUtf8Name {
                    path: path.to_path_buf(),
                })?;
                segments.push(name);
            }
            Component::CurDir => {}
            _ => {
                return Err(WalkError::OutsideRoot {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    Ok(segments.join("/"))
}
