//! Scratch workspace staging
//!
//! Some external tools expect a single coherent source directory spanning
//! modules that are normally built independently. The workspace owns a
//! transient directory, populates it by copying and merging source trees,
//! and removes it entirely when the run ends, success or failure alike.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("scratch directory {0} already exists")]
    AlreadyExists(PathBuf),

    /// A merged file would land on existing content; nothing is overwritten
    #[error("merge collision: {0} already exists in the staged tree")]
    Collision(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
enum OnConflict {
    Fail,
    Overwrite,
}

/// A transient directory for staging merged source trees
///
/// Dropped workspaces are removed from disk unless [`retain`] was called.
///
/// [`retain`]: ScratchWorkspace::retain
#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
    retained: bool,
}

impl ScratchWorkspace {
    /// Create the scratch directory; the path must not already exist
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let root = root.into();
        if root.exists() {
            return Err(StagingError::AlreadyExists(root));
        }
        fs::create_dir_all(&root).map_err(|source| StagingError::Io {
            path: root.clone(),
            source,
        })?;
        debug!("Created scratch workspace at {}", root.display());
        Ok(Self {
            root,
            retained: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Copy a full source tree into the workspace under `dest`
    pub fn copy_tree(
        &self,
        src: &Path,
        dest: impl AsRef<Path>,
    ) -> Result<PathBuf, StagingError> {
        let dest = self.root.join(dest.as_ref());
        copy_dir(src, &dest, OnConflict::Fail)?;
        Ok(dest)
    }

    /// Merge a source tree into an already-staged subtree
    ///
    /// Directories are shared; a file that already exists in the staged tree
    /// is a collision and fails the merge.
    pub fn merge_tree(&self, src: &Path, dest: impl AsRef<Path>) -> Result<(), StagingError> {
        copy_dir(src, &self.root.join(dest.as_ref()), OnConflict::Fail)
    }

    /// Keep the workspace on disk after drop, for debugging
    pub fn retain(&mut self) {
        self.retained = true;
    }

    /// Remove the workspace now instead of waiting for drop
    pub fn remove(mut self) -> io::Result<()> {
        self.retained = true;
        fs::remove_dir_all(&self.root)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.retained {
            return;
        }
        if let Err(source) = fs::remove_dir_all(&self.root) {
            if source.kind() != io::ErrorKind::NotFound {
                warn!(
                    "failed to remove scratch directory {}: {}",
                    self.root.display(),
                    source
                );
            }
        }
    }
}

/// Copy a tree to a destination outside any workspace, overwriting files
///
/// Used to publish generated output (e.g. rendered documentation) where
/// replacing a previous run's files is the point.
pub fn publish_tree(src: &Path, dest: &Path) -> Result<(), StagingError> {
    copy_dir(src, dest, OnConflict::Overwrite)
}

fn copy_dir(src: &Path, dest: &Path, on_conflict: OnConflict) -> Result<(), StagingError> {
    if !dest.exists() {
        fs::create_dir_all(dest).map_err(|source| StagingError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
    } else if !dest.is_dir() {
        return Err(StagingError::Collision(dest.to_path_buf()));
    }

    let entries = fs::read_dir(src).map_err(|source| StagingError::Io {
        path: src.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| StagingError::Io {
            path: src.to_path_buf(),
            source,
        })?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        let file_type = entry.file_type().map_err(|source| StagingError::Io {
            path: from.clone(),
            source,
        })?;

        if file_type.is_dir() {
            copy_dir(&from, &to, on_conflict)?;
        } else {
            if to.exists() {
                match on_conflict {
                    OnConflict::Fail => return Err(StagingError::Collision(to)),
                    OnConflict::Overwrite => {}
                }
            }
            fs::copy(&from, &to).map_err(|source| StagingError::Io {
                path: from.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
