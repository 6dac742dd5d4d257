//! Moving entries into the repository and preserving displaced content.
//!
//! [`move_entry`] tries an atomic rename first and falls back to
//! copy-then-delete when the rename is refused (cross-device moves,
//! permission boundaries).  The fallback is not atomic: if deleting the
//! source fails after a complete copy, both copies are left in place and the
//! outcome says so ([`MoveOutcome::SourceRetained`]).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::RelocateError;

/// Subdirectory of the repository holding backup snapshots.
pub const BACKUPS_DIR: &str = "backups";

/// `strftime` format of a snapshot directory name (second resolution).
pub const SNAPSHOT_FORMAT: &str = "%Y%m%d-%H%M%S";

/// How a successful (or half-successful) move ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Atomic rename.
    Renamed,
    /// Copied to the destination, source deleted.
    Copied,
    /// Copied to the destination, but the source could not be deleted.
    /// Both paths are populated.
    SourceRetained {
        /// Why the source could not be deleted.
        reason: String,
    },
}

impl MoveOutcome {
    /// Return `true` if the source no longer exists.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}

/// Moves entries into the repository and takes timestamped backups.
#[derive(Debug, Clone)]
pub struct Relocator {
    repository: PathBuf,
}

impl Relocator {
    /// Create a relocator for `repository`.
    #[must_use]
    pub const fn new(repository: PathBuf) -> Self {
        Self { repository }
    }

    /// Snapshot directory for a backup taken at `at`.
    #[must_use]
    pub fn snapshot_dir(&self, at: NaiveDateTime) -> PathBuf {
        self.repository
            .join(BACKUPS_DIR)
            .join(at.format(SNAPSHOT_FORMAT).to_string())
    }

    /// Where `existing` lands when backed up at `at`.  Pure; creates nothing.
    #[must_use]
    pub fn backup_target(&self, existing: &Path, at: NaiveDateTime) -> PathBuf {
        let base = existing.file_name().unwrap_or(existing.as_os_str());
        self.snapshot_dir(at).join(base)
    }

    /// Create the snapshot directory for "now" and return the path the
    /// displaced entry should be moved to.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::Snapshot`] if the directory cannot be created.
    pub fn backup(&self, existing: &Path) -> Result<PathBuf, RelocateError> {
        self.backup_at(existing, chrono::Local::now().naive_local())
    }

    /// [`backup`](Self::backup) with an explicit timestamp.
    ///
    /// Two backups of the same base name within one second share a target;
    /// the later move overwrites the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::Snapshot`] if the directory cannot be created.
    pub fn backup_at(&self, existing: &Path, at: NaiveDateTime) -> Result<PathBuf, RelocateError> {
        let dir = self.snapshot_dir(at);
        fs::create_dir_all(&dir).map_err(|source| RelocateError::Snapshot {
            path: dir.clone(),
            source,
        })?;
        Ok(self.backup_target(existing, at))
    }
}

/// Move `src` to `dst`, renaming if possible and copying otherwise.
///
/// # Errors
///
/// Returns [`RelocateError::IntoItself`] if `dst` lies inside `src`.
/// Returns [`RelocateError::Copy`] if the rename fails and the copy fallback
/// fails too.  `dst` may then hold a partial copy; it is not rolled back.
pub fn move_entry(src: &Path, dst: &Path) -> Result<MoveOutcome, RelocateError> {
    refuse_nesting(src, dst)?;
    match fs::rename(src, dst) {
        Ok(()) => Ok(MoveOutcome::Renamed),
        Err(rename_err) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "rename failed ({rename_err}), falling back to copy"
            );
            copy_then_remove(src, dst)
        }
    }
}

/// The non-atomic fallback of [`move_entry`]: copy `src` to `dst`, then
/// delete `src`.
///
/// An existing `dst` is deleted before the copy, so a directory is replaced
/// rather than merged, matching what a rename would leave.
///
/// # Errors
///
/// Returns [`RelocateError::IntoItself`] if `dst` lies inside `src`,
/// [`RelocateError::Replace`] if an existing `dst` cannot be deleted, and
/// [`RelocateError::Copy`] if the copy fails.  A failed delete of `src` is
/// not an error; it is reported as [`MoveOutcome::SourceRetained`].
pub fn copy_then_remove(src: &Path, dst: &Path) -> Result<MoveOutcome, RelocateError> {
    refuse_nesting(src, dst)?;
    let copy_error = |source: io::Error| RelocateError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    };
    fs::symlink_metadata(src).map_err(copy_error)?;
    if fs::symlink_metadata(dst).is_ok() {
        remove_entry(dst).map_err(|source| RelocateError::Replace {
            path: dst.to_path_buf(),
            source,
        })?;
    }
    copy_entry(src, dst).map_err(copy_error)?;
    match remove_entry(src) {
        Ok(()) => Ok(MoveOutcome::Copied),
        Err(e) => Ok(MoveOutcome::SourceRetained {
            reason: e.to_string(),
        }),
    }
}

fn refuse_nesting(src: &Path, dst: &Path) -> Result<(), RelocateError> {
    if dst.starts_with(src) {
        return Err(RelocateError::IntoItself {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
    }
    Ok(())
}

/// Copy a file, directory tree, or symlink.  Symlinks are recreated, never
/// followed; an existing destination file is overwritten.
fn copy_entry(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(src)?;
        create_symlink(&target, dst)
    } else if file_type.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_entry(&entry.path(), &dst.join(entry.file_name()))?;
        }
        fs::set_permissions(dst, meta.permissions())
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}

/// Delete a file, symlink, or directory tree.
fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let resolved = link.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
