// Shared helpers for integration tests.
//
// Provides a temporary home directory with a dotfiles repository inside it,
// and a fake linker that honours the linking tool's contract (every
// top-level repository entry becomes a symlink in the home directory)
// without running a subprocess.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use autostow::config::Settings;
use autostow::engine::Engine;
use autostow::error::LinkError;
use autostow::link::Linker;
use autostow::logging::{BufferedLog, Log};
use autostow::relocate::BACKUPS_DIR;

/// Links every top-level repository entry into the home directory, except
/// the backups directory, and records each selector it was called with.
#[derive(Debug)]
pub struct FakeLinker {
    home: PathBuf,
    repository: PathBuf,
    calls: Mutex<Vec<String>>,
}

impl FakeLinker {
    pub fn new(home: &Path, repository: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            repository: repository.to_path_buf(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Selectors passed to `relink`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Linker for FakeLinker {
    fn relink(&self, selector: &str) -> Result<(), LinkError> {
        self.calls.lock().expect("calls lock").push(selector.to_string());
        for entry in fs::read_dir(&self.repository).expect("read repository") {
            let entry = entry.expect("repository entry");
            let name = entry.file_name();
            if name == BACKUPS_DIR {
                continue;
            }
            let link = self.home.join(&name);
            if fs::symlink_metadata(&link).is_err() {
                symlink(&entry.path(), &link);
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) {
    std::os::unix::fs::symlink(target, link).expect("create symlink");
}

#[cfg(windows)]
pub fn symlink(target: &Path, link: &Path) {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link).expect("create symlink");
    } else {
        std::os::windows::fs::symlink_file(target, link).expect("create symlink");
    }
}

/// An isolated home directory backed by a [`tempfile::TempDir`].
///
/// `home/.dotfiles` is created as the repository.  Both roots are
/// canonical, as they are at runtime.
pub struct IntegrationTestContext {
    _tmp: tempfile::TempDir,
    pub home: PathBuf,
    pub repo: PathBuf,
    pub linker: Arc<FakeLinker>,
    pub log: Arc<BufferedLog>,
}

impl IntegrationTestContext {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let home = dunce::canonicalize(tmp.path()).expect("canonical home");
        let repo = home.join(".dotfiles");
        fs::create_dir(&repo).expect("create repository");
        Self {
            linker: Arc::new(FakeLinker::new(&home, &repo)),
            log: Arc::new(BufferedLog::new()),
            _tmp: tmp,
            home,
            repo,
        }
    }

    pub fn settings(&self, dry_run: bool) -> Settings {
        Settings::new(self.home.clone(), self.repo.clone(), dry_run)
    }

    /// Engine wired to the fake linker and the buffered log.
    pub fn engine(&self, dry_run: bool) -> Engine {
        Engine::new(
            &self.settings(dry_run),
            Arc::clone(&self.linker) as Arc<dyn Linker>,
            Arc::clone(&self.log) as Arc<dyn Log>,
        )
    }

    /// Write a file at `rel` under the home directory, creating parents.
    pub fn write_home(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.home.join(rel), content)
    }

    /// Write a file at `rel` under the repository, creating parents.
    pub fn write_repo(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.repo.join(rel), content)
    }

    pub fn is_symlink(&self, name: &str) -> bool {
        fs::symlink_metadata(self.home.join(name)).is_ok_and(|m| m.file_type().is_symlink())
    }

    /// Names of the snapshot directories under `backups/`.
    pub fn snapshots(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.repo.join(BACKUPS_DIR)) else {
            return Vec::new();
        };
        entries.map(|e| e.expect("snapshot entry").path()).collect()
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
    path.to_path_buf()
}
