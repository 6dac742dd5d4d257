//! Invoking the external symlink-farm tool.
//!
//! The engine only needs a success/failure signal from the tool, so it talks
//! to it through the [`Linker`] capability.  [`StowLinker`] is the production
//! implementation; tests substitute a fake.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::LinkError;
use crate::exec;

/// Package selector meaning "the whole repository root as one package".
pub const ROOT_PACKAGE: &str = ".";

/// Default linking tool.
pub const DEFAULT_PROGRAM: &str = "stow";

/// Marker files removed before linking by default.
pub const DEFAULT_MARKERS: &[&str] = &[".DS_Store"];

/// Re-link repository content back into the watched root.
#[cfg_attr(test, mockall::automock)]
pub trait Linker: Send + Sync {
    /// Link `selector` (a package name, or [`ROOT_PACKAGE`]) into the
    /// watched root.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be run or reports failure.
    fn relink(&self, selector: &str) -> Result<(), LinkError>;
}

/// Runs `<program> -v -t <target> [extra args] <selector>` from the
/// repository root.
#[derive(Debug, Clone)]
pub struct StowLinker {
    program: String,
    extra_args: Vec<String>,
    markers: Vec<String>,
    target: PathBuf,
    repository: PathBuf,
}

impl StowLinker {
    /// Create a linker that links packages of `repository` into `target`.
    #[must_use]
    pub fn new(program: impl Into<String>, target: PathBuf, repository: PathBuf) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            markers: DEFAULT_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            target,
            repository,
        }
    }

    /// Build the linker described by `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            program: settings.linker.program.clone(),
            extra_args: settings.linker.extra_args.clone(),
            markers: settings.linker.markers.clone(),
            target: settings.home.clone(),
            repository: settings.repository.clone(),
        }
    }

    /// The program that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the tool for `selector`.
    #[must_use]
    pub fn args(&self, selector: &str) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "-t".to_string(),
            self.target.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(selector.to_string());
        args
    }

    /// Directory that holds the content of `selector`.
    #[must_use]
    pub fn package_dir(&self, selector: &str) -> PathBuf {
        if selector == ROOT_PACKAGE {
            self.repository.clone()
        } else {
            self.repository.join(selector)
        }
    }
}

impl Linker for StowLinker {
    fn relink(&self, selector: &str) -> Result<(), LinkError> {
        let package = self.package_dir(selector);
        let removed = remove_markers(&package, &self.markers);
        if removed > 0 {
            tracing::debug!("removed {removed} marker file(s) under {}", package.display());
        }

        let args = self.args(selector);
        tracing::info!("running {}", exec::command_line(&self.program, &args));
        let status = exec::run_inherited(&self.repository, &self.program, &args).map_err(
            |source| LinkError::Spawn {
                program: self.program.clone(),
                source,
            },
        )?;
        if status.success() {
            Ok(())
        } else {
            Err(LinkError::Failed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// Recursively delete files named in `markers` under `dir`, without
/// following symlinks.  Unreadable directories and failed deletions are
/// skipped.  Returns the number of files removed.
pub fn remove_markers(dir: &Path, markers: &[String]) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            removed += remove_markers(&path, markers);
        } else if markers.iter().any(|m| entry.file_name() == m.as_str())
            && fs::remove_file(&path).is_ok()
        {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec![".DS_Store".to_string()]
    }

    #[test]
    fn args_follow_tool_contract() {
        let linker = StowLinker::new("stow", PathBuf::from("/home/u"), PathBuf::from("/repo"));
        assert_eq!(linker.args(ROOT_PACKAGE), vec!["-v", "-t", "/home/u", "."]);
    }

    #[test]
    fn extra_args_precede_selector() {
        let mut linker = StowLinker::new("stow", PathBuf::from("/home/u"), PathBuf::from("/repo"));
        linker.extra_args = vec!["--ignore=^backups$".to_string()];
        assert_eq!(
            linker.args(ROOT_PACKAGE),
            vec!["-v", "-t", "/home/u", "--ignore=^backups$", "."]
        );
    }

    #[test]
    fn package_dir_for_root_and_named_package() {
        let linker = StowLinker::new("stow", PathBuf::from("/home/u"), PathBuf::from("/repo"));
        assert_eq!(linker.package_dir("."), PathBuf::from("/repo"));
        assert_eq!(linker.package_dir("zsh"), PathBuf::from("/repo/zsh"));
    }

    #[test]
    fn remove_markers_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".config/app")).unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::write(dir.path().join(".config/app/.DS_Store"), "").unwrap();
        fs::write(dir.path().join(".config/app/settings"), "keep").unwrap();

        assert_eq!(remove_markers(dir.path(), &markers()), 2);

        assert!(!dir.path().join(".DS_Store").exists());
        assert!(!dir.path().join(".config/app/.DS_Store").exists());
        assert!(dir.path().join(".config/app/settings").exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_markers_does_not_follow_symlinks() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join(".DS_Store"), "").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();

        assert_eq!(remove_markers(dir.path(), &markers()), 0);
        assert!(outside.path().join(".DS_Store").exists());
    }

    #[test]
    fn remove_markers_on_missing_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(remove_markers(&dir.path().join("missing"), &markers()), 0);
    }

    #[test]
    fn relink_missing_program_is_spawn_error() {
        let repo = tempfile::tempdir().unwrap();
        let linker = StowLinker::new(
            "this-program-does-not-exist-12345",
            PathBuf::from("/home/u"),
            repo.path().to_path_buf(),
        );
        let err = linker.relink(ROOT_PACKAGE).unwrap_err();
        assert!(matches!(err, LinkError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn relink_non_zero_exit_is_failure() {
        let repo = tempfile::tempdir().unwrap();
        let linker = StowLinker::new("false", PathBuf::from("/home/u"), repo.path().to_path_buf());
        let err = linker.relink(ROOT_PACKAGE).unwrap_err();
        assert!(matches!(err, LinkError::Failed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn relink_cleans_markers_before_running() {
        let repo = tempfile::tempdir().unwrap();
        fs::write(repo.path().join(".DS_Store"), "").unwrap();
        let linker = StowLinker::new("true", PathBuf::from("/home/u"), repo.path().to_path_buf());
        linker.relink(ROOT_PACKAGE).unwrap();
        assert!(!repo.path().join(".DS_Store").exists());
    }
}
