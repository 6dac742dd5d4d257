//! Convergence engine: the reactive handler and the one-shot scan.
//!
//! Both paths run one entry at a time against the filesystem.  Nothing here
//! takes a lock; callers must not run two engine operations concurrently.
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{Classification, Classifier, IgnoreReason};
use crate::config::Settings;
use crate::link::{Linker, ROOT_PACKAGE};
use crate::logging::{EntryStatus, Log};
use crate::relocate::{self, MoveOutcome, Relocator};

/// What [`Engine::handle`] did with a candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Classified as not relevant.
    Ignored(IgnoreReason),
    /// The top-level entry is already a symlink.
    AlreadyLinked,
    /// The top-level entry no longer exists.
    Vanished,
    /// Dry run: intent was logged, nothing changed.
    DryRun {
        /// Top-level name.
        name: OsString,
    },
    /// Moved into the repository.
    Relocated {
        /// Top-level name.
        name: OsString,
        /// Where the displaced repository entry was preserved, if any.
        backup: Option<PathBuf>,
        /// Whether the linking tool reported success.
        linked: bool,
    },
    /// The move failed; nothing was linked.
    MoveFailed {
        /// Top-level name.
        name: OsString,
    },
    /// The entry was copied but its source could not be deleted, so it now
    /// exists in both places.  Nothing was linked.
    SourceRetained {
        /// Top-level name.
        name: OsString,
    },
}

/// Return `true` if `path` is a symlink (not followed).
///
/// This is the idempotence guard of the reactive path: the linking tool's own
/// output shows up as new events, and a symlinked entry is already converged.
#[must_use]
pub fn is_converged(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Orchestrates classification, relocation, and relinking.
pub struct Engine {
    home: PathBuf,
    repository: PathBuf,
    dry_run: bool,
    linker_program: String,
    classifier: Classifier,
    relocator: Relocator,
    linker: Arc<dyn Linker>,
    log: Arc<dyn Log>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("home", &self.home)
            .field("repository", &self.repository)
            .field("dry_run", &self.dry_run)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine for `settings`.
    #[must_use]
    pub fn new(settings: &Settings, linker: Arc<dyn Linker>, log: Arc<dyn Log>) -> Self {
        Self {
            home: settings.home.clone(),
            repository: settings.repository.clone(),
            dry_run: settings.dry_run,
            linker_program: settings.linker.program.clone(),
            classifier: settings.classifier(),
            relocator: Relocator::new(settings.repository.clone()),
            linker,
            log,
        }
    }

    /// Watched root.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Converge the top-level entry that `path` belongs to.
    ///
    /// Per-entry failures are logged and reported in the returned outcome;
    /// they never propagate.
    pub fn handle(&self, path: &Path) -> HandleOutcome {
        let name = match self.classifier.classify(path) {
            Classification::Ignore(reason) => {
                self.log
                    .debug(&format!("ignoring {} ({reason})", path.display()));
                return HandleOutcome::Ignored(reason);
            }
            Classification::Relocate(name) => name,
        };
        let label = name.to_string_lossy().into_owned();

        let top = self.home.join(&name);
        if is_converged(&top) {
            self.log.debug(&format!("{label}: already linked"));
            return HandleOutcome::AlreadyLinked;
        }
        if !exists_no_follow(&top) {
            self.log.debug(&format!("{label}: no longer present"));
            return HandleOutcome::Vanished;
        }

        let dest = self.repository.join(&name);
        let dest_exists = exists_no_follow(&dest);

        if self.dry_run {
            if dest_exists {
                let target = self
                    .relocator
                    .backup_target(&dest, chrono::Local::now().naive_local());
                self.log.dry_run(&format!(
                    "would back up {} -> {}",
                    dest.display(),
                    target.display()
                ));
            }
            self.log
                .dry_run(&format!("would move {} -> {}", top.display(), dest.display()));
            self.log.dry_run(&format!(
                "would run {} for {ROOT_PACKAGE}",
                self.linker_program
            ));
            self.log.record_entry(&label, EntryStatus::DryRun, None);
            return HandleOutcome::DryRun { name };
        }

        let backup = if dest_exists {
            self.back_up(&dest)
        } else {
            None
        };

        match relocate::move_entry(&top, &dest) {
            Err(e) => {
                self.log.error(&e.to_string());
                self.log
                    .record_entry(&label, EntryStatus::Failed, Some("move failed"));
                return HandleOutcome::MoveFailed { name };
            }
            Ok(MoveOutcome::SourceRetained { reason }) => {
                self.log.error(&format!(
                    "copied {} -> {} but could not remove the source ({reason}); both copies remain",
                    top.display(),
                    dest.display()
                ));
                self.log
                    .record_entry(&label, EntryStatus::Failed, Some("source retained"));
                return HandleOutcome::SourceRetained { name };
            }
            Ok(outcome) => {
                self.log
                    .info(&format!("moved {} -> {}", top.display(), dest.display()));
                self.log.debug(&format!("{label}: {outcome:?}"));
            }
        }

        let linked = self.relink();
        let message = (!linked).then_some("relink failed");
        self.log
            .record_entry(&label, EntryStatus::Relocated, message);
        HandleOutcome::Relocated {
            name,
            backup,
            linked,
        }
    }

    /// Adopt every eligible top-level entry of the watched root.
    ///
    /// Entries whose name already exists in the repository are left alone
    /// and no backup is taken.  Returns the relocated names sorted by name;
    /// in dry-run mode, the names that would be relocated.
    pub fn scan(&self) -> Vec<OsString> {
        let mut relocated = Vec::new();
        let entries = match fs::read_dir(&self.home) {
            Ok(entries) => entries,
            Err(e) => {
                self.log
                    .error(&format!("cannot list {}: {e}", self.home.display()));
                return relocated;
            }
        };

        let mut children: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    self.log.warn(&format!("skipping unreadable entry: {e}"));
                    None
                }
            })
            .collect();
        children.sort_by_key(fs::DirEntry::file_name);

        for entry in children {
            let name = entry.file_name();
            let label = name.to_string_lossy().into_owned();
            if !Classifier::is_hidden(&name) {
                continue;
            }
            if self.classifier.is_excluded(&name) {
                self.log.debug(&format!("ignoring {label} ({})", IgnoreReason::Excluded));
                continue;
            }
            if entry.file_type().is_ok_and(|t| t.is_symlink()) {
                self.log.debug(&format!("{label}: already linked"));
                continue;
            }
            let dest = self.repository.join(&name);
            if exists_no_follow(&dest) {
                self.log.debug(&format!("{label}: already in repository"));
                self.log.record_entry(
                    &label,
                    EntryStatus::Skipped,
                    Some("already in repository"),
                );
                continue;
            }

            let src = entry.path();
            if self.dry_run {
                self.log
                    .dry_run(&format!("would move {} -> {}", src.display(), dest.display()));
                self.log.dry_run(&format!(
                    "would run {} for {ROOT_PACKAGE}",
                    self.linker_program
                ));
                self.log.record_entry(&label, EntryStatus::DryRun, None);
                relocated.push(name);
                continue;
            }

            match relocate::move_entry(&src, &dest) {
                Ok(outcome) if outcome.is_complete() => {
                    self.log
                        .info(&format!("moved {} -> {}", src.display(), dest.display()));
                }
                Ok(_) => {
                    self.log.error(&format!(
                        "copied {} -> {} but could not remove the source; both copies remain",
                        src.display(),
                        dest.display()
                    ));
                    self.log
                        .record_entry(&label, EntryStatus::Failed, Some("source retained"));
                    continue;
                }
                Err(e) => {
                    self.log.error(&e.to_string());
                    self.log
                        .record_entry(&label, EntryStatus::Failed, Some("move failed"));
                    continue;
                }
            }

            let linked = self.relink();
            self.log.record_entry(
                &label,
                EntryStatus::Relocated,
                (!linked).then_some("relink failed"),
            );
            relocated.push(name);
        }
        relocated
    }

    /// Move the existing repository entry `dest` into a fresh snapshot.
    /// Failure is logged and yields `None`; the caller proceeds anyway.
    fn back_up(&self, dest: &Path) -> Option<PathBuf> {
        let target = match self.relocator.backup(dest) {
            Ok(target) => target,
            Err(e) => {
                self.log.error(&format!("backup failed: {e}"));
                return None;
            }
        };
        match relocate::move_entry(dest, &target) {
            Ok(MoveOutcome::SourceRetained { reason }) => {
                self.log.warn(&format!(
                    "backed up {} -> {} but the original remains ({reason})",
                    dest.display(),
                    target.display()
                ));
                Some(target)
            }
            Ok(_) => {
                self.log.info(&format!(
                    "backed up {} -> {}",
                    dest.display(),
                    target.display()
                ));
                Some(target)
            }
            Err(e) => {
                self.log.error(&format!("backup failed: {e}"));
                None
            }
        }
    }

    fn relink(&self) -> bool {
        match self.linker.relink(ROOT_PACKAGE) {
            Ok(()) => true,
            Err(e) => {
                self.log.error(&format!("relink failed: {e}"));
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::link::MockLinker;
    use crate::logging::BufferedLog;

    struct Fixture {
        _tmp: tempfile::TempDir,
        home: PathBuf,
        repo: PathBuf,
        log: Arc<BufferedLog>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let home = tmp.path().join("home");
            let repo = home.join(".dotfiles");
            fs::create_dir_all(&repo).unwrap();
            Self {
                _tmp: tmp,
                home,
                repo,
                log: Arc::new(BufferedLog::new()),
            }
        }

        fn engine(&self, linker: MockLinker, dry_run: bool) -> Engine {
            let settings = Settings::new(self.home.clone(), self.repo.clone(), dry_run);
            Engine::new(&settings, Arc::new(linker), Arc::clone(&self.log) as Arc<dyn Log>)
        }
    }

    fn linker_expecting(times: usize) -> MockLinker {
        let mut linker = MockLinker::new();
        linker
            .expect_relink()
            .withf(|selector| selector == ROOT_PACKAGE)
            .times(times)
            .returning(|_| Ok(()));
        linker
    }

    fn linker_never() -> MockLinker {
        let mut linker = MockLinker::new();
        linker.expect_relink().never();
        linker
    }

    /// Whether permission bits on `dir` actually stop writes (not when root).
    #[cfg(unix)]
    fn writes_are_denied(dir: &Path) -> bool {
        let check = dir.join(".write-check");
        if fs::File::create(&check).is_ok() {
            let _ = fs::remove_file(&check);
            return false;
        }
        true
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt as _;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn ignored_path_has_no_side_effects() {
        let fx = Fixture::new();
        fs::write(fx.home.join("notes.txt"), "x").unwrap();
        let engine = fx.engine(linker_never(), false);

        let outcome = engine.handle(&fx.home.join("notes.txt"));

        assert_eq!(outcome, HandleOutcome::Ignored(IgnoreReason::NotHidden));
        assert!(fx.home.join("notes.txt").exists());
        assert!(fx.log.contains("not hidden"));
    }

    #[test]
    fn excluded_and_temporary_reasons_are_logged_distinctly() {
        let fx = Fixture::new();
        let engine = fx.engine(linker_never(), false);

        assert_eq!(
            engine.handle(&fx.home.join(".git")),
            HandleOutcome::Ignored(IgnoreReason::Excluded)
        );
        assert_eq!(
            engine.handle(&fx.home.join(".bashrc.swp")),
            HandleOutcome::Ignored(IgnoreReason::Temporary)
        );
        assert!(fx.log.contains("excluded"));
        assert!(fx.log.contains("temporary"));
    }

    #[test]
    fn new_hidden_file_is_moved_and_root_package_relinked() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".bashrc"), "export A=1").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        let outcome = engine.handle(&fx.home.join(".bashrc"));

        assert_eq!(
            outcome,
            HandleOutcome::Relocated {
                name: ".bashrc".into(),
                backup: None,
                linked: true,
            }
        );
        assert!(!fx.home.join(".bashrc").exists());
        assert_eq!(
            fs::read_to_string(fx.repo.join(".bashrc")).unwrap(),
            "export A=1"
        );
        let records = fx.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, EntryStatus::Relocated);
    }

    #[test]
    fn nested_event_relocates_whole_top_level_directory() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.home.join(".config/nvim")).unwrap();
        fs::write(fx.home.join(".config/nvim/init.lua"), "-- init").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        engine.handle(&fx.home.join(".config/nvim/init.lua"));

        assert!(!fx.home.join(".config").exists());
        assert!(fx.repo.join(".config/nvim/init.lua").is_file());
    }

    #[test]
    fn vanished_entry_is_a_no_op() {
        let fx = Fixture::new();
        let engine = fx.engine(linker_never(), false);
        assert_eq!(
            engine.handle(&fx.home.join(".gone")),
            HandleOutcome::Vanished
        );
        assert!(fx.log.records().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn second_handle_after_relink_is_idempotent() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".zshrc"), "setopt x").unwrap();
        let (repo_entry, home_entry) = (fx.repo.join(".zshrc"), fx.home.join(".zshrc"));
        let mut linker = MockLinker::new();
        linker.expect_relink().times(1).returning(move |_| {
            std::os::unix::fs::symlink(&repo_entry, &home_entry).unwrap();
            Ok(())
        });
        let engine = fx.engine(linker, false);

        let first = engine.handle(&fx.home.join(".zshrc"));
        assert!(matches!(first, HandleOutcome::Relocated { linked: true, .. }));
        assert!(is_converged(&fx.home.join(".zshrc")));

        let second = engine.handle(&fx.home.join(".zshrc"));
        assert_eq!(second, HandleOutcome::AlreadyLinked);
        assert_eq!(
            fs::read_to_string(fx.repo.join(".zshrc")).unwrap(),
            "setopt x"
        );
        assert!(!fx.repo.join(relocate::BACKUPS_DIR).exists());
    }

    #[cfg(unix)]
    #[test]
    fn temp_file_inside_symlinked_directory_is_ignored_first() {
        let fx = Fixture::new();
        fs::create_dir(fx.repo.join(".vim")).unwrap();
        std::os::unix::fs::symlink(fx.repo.join(".vim"), fx.home.join(".vim")).unwrap();
        let engine = fx.engine(linker_never(), false);

        assert_eq!(
            engine.handle(&fx.home.join(".vim/.session.swp")),
            HandleOutcome::Ignored(IgnoreReason::Temporary)
        );
    }

    #[test]
    fn existing_repository_entry_is_backed_up_before_overwrite() {
        let fx = Fixture::new();
        fs::write(fx.repo.join(".vimrc"), "old").unwrap();
        fs::write(fx.home.join(".vimrc"), "new").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        let outcome = engine.handle(&fx.home.join(".vimrc"));

        let HandleOutcome::Relocated {
            backup: Some(backup),
            ..
        } = outcome
        else {
            panic!("expected a relocation with backup, got {outcome:?}");
        };
        assert!(backup.starts_with(fx.repo.join(relocate::BACKUPS_DIR)));
        assert!(backup.ends_with(".vimrc"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old");
        assert_eq!(fs::read_to_string(fx.repo.join(".vimrc")).unwrap(), "new");
    }

    #[test]
    fn relink_failure_is_logged_and_not_fatal() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".inputrc"), "set x").unwrap();
        let mut linker = MockLinker::new();
        linker.expect_relink().times(1).returning(|_| {
            Err(LinkError::Failed {
                program: "stow".to_string(),
                code: Some(2),
            })
        });
        let engine = fx.engine(linker, false);

        let outcome = engine.handle(&fx.home.join(".inputrc"));

        assert!(matches!(outcome, HandleOutcome::Relocated { linked: false, .. }));
        assert!(fx.repo.join(".inputrc").exists());
        assert!(fx.log.contains("relink failed"));
        assert_eq!(
            fx.log.records()[0].message.as_deref(),
            Some("relink failed")
        );
    }

    #[test]
    fn move_failure_aborts_without_linking() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".tool"), "file").unwrap();
        let engine = fx.engine(linker_never(), false);
        fs::remove_dir_all(&fx.repo).unwrap();

        let outcome = engine.handle(&fx.home.join(".tool"));

        assert_eq!(
            outcome,
            HandleOutcome::MoveFailed {
                name: ".tool".into()
            }
        );
        assert!(fx.log.contains("failed to move"));
        assert!(fx.home.join(".tool").is_file());
        assert_eq!(fx.log.records()[0].status, EntryStatus::Failed);
    }

    #[test]
    fn failed_backup_still_moves_the_new_entry() {
        let fx = Fixture::new();
        // backups/ is a file, so no snapshot can be created.
        fs::write(fx.repo.join(relocate::BACKUPS_DIR), "").unwrap();
        fs::write(fx.repo.join(".tool"), "old").unwrap();
        fs::write(fx.home.join(".tool"), "new").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        let outcome = engine.handle(&fx.home.join(".tool"));

        assert_eq!(
            outcome,
            HandleOutcome::Relocated {
                name: ".tool".into(),
                backup: None,
                linked: true,
            }
        );
        assert!(fx.log.contains("backup failed"));
        assert_eq!(fs::read_to_string(fx.repo.join(".tool")).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn retained_source_is_reported_and_not_linked() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".tool"), "file").unwrap();
        let engine = fx.engine(linker_never(), false);
        // A read-only home refuses the rename and the source delete, while
        // the repository below it stays writable for the copy.
        set_mode(&fx.home, 0o555);
        if !writes_are_denied(&fx.home) {
            set_mode(&fx.home, 0o755);
            return;
        }

        let outcome = engine.handle(&fx.home.join(".tool"));
        set_mode(&fx.home, 0o755);

        assert_eq!(
            outcome,
            HandleOutcome::SourceRetained {
                name: ".tool".into()
            }
        );
        assert_eq!(fs::read_to_string(fx.home.join(".tool")).unwrap(), "file");
        assert_eq!(fs::read_to_string(fx.repo.join(".tool")).unwrap(), "file");
        assert!(fx.log.contains("both copies remain"));
        let records = fx.log.records();
        assert_eq!(records[0].status, EntryStatus::Failed);
        assert_eq!(records[0].message.as_deref(), Some("source retained"));
    }

    #[test]
    fn repository_nested_in_hidden_directory_is_not_moved_into_itself() {
        let fx = Fixture::new();
        let repo = fx.home.join(".config/dotfiles");
        fs::create_dir_all(&repo).unwrap();
        fs::write(fx.home.join(".config/app.conf"), "x").unwrap();
        let settings = Settings::new(fx.home.clone(), repo.clone(), false);
        let engine = Engine::new(
            &settings,
            Arc::new(linker_never()),
            Arc::clone(&fx.log) as Arc<dyn Log>,
        );

        assert_eq!(
            engine.handle(&fx.home.join(".config/app.conf")),
            HandleOutcome::Ignored(IgnoreReason::Excluded)
        );
        let moved = engine.scan();

        assert!(!moved.contains(&OsString::from(".config")));
        assert!(!repo.join(".config").exists());
        assert!(fx.home.join(".config/app.conf").is_file());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_name_is_relocated_under_the_same_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new();
        let name = OsStr::from_bytes(b".caf\xe9rc");
        fs::write(fx.home.join(name), "set x").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        let outcome = engine.handle(&fx.home.join(name));

        assert_eq!(
            outcome,
            HandleOutcome::Relocated {
                name: name.to_os_string(),
                backup: None,
                linked: true,
            }
        );
        assert!(!fx.home.join(name).exists());
        assert_eq!(fs::read_to_string(fx.repo.join(name)).unwrap(), "set x");
        assert_eq!(fx.log.records()[0].name, name.to_string_lossy());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn scan_keeps_non_utf8_names_intact() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new();
        let name = OsStr::from_bytes(b".caf\xe9rc");
        fs::write(fx.home.join(name), "set x").unwrap();
        let engine = fx.engine(linker_expecting(1), false);

        assert_eq!(engine.scan(), vec![name.to_os_string()]);
        assert!(fx.repo.join(name).is_file());
        assert!(!fx.home.join(name).exists());
    }

    #[test]
    fn dry_run_changes_nothing() {
        let fx = Fixture::new();
        fs::create_dir(fx.home.join(".foo")).unwrap();
        fs::write(fx.home.join(".foo/cfg"), "1").unwrap();
        let engine = fx.engine(linker_never(), true);

        let outcome = engine.handle(&fx.home.join(".foo"));

        assert_eq!(
            outcome,
            HandleOutcome::DryRun {
                name: ".foo".into()
            }
        );
        assert_eq!(fs::read_to_string(fx.home.join(".foo/cfg")).unwrap(), "1");
        assert!(!fx.repo.join(".foo").exists());
        let messages = fx.log.dry_run_messages();
        assert!(messages.iter().any(|m| m.starts_with("would move")));
        assert!(messages.iter().any(|m| m == "would run stow for ."));
    }

    #[test]
    fn dry_run_with_collision_reports_backup_without_creating_it() {
        let fx = Fixture::new();
        fs::write(fx.repo.join(".vimrc"), "old").unwrap();
        fs::write(fx.home.join(".vimrc"), "new").unwrap();
        let engine = fx.engine(linker_never(), true);

        engine.handle(&fx.home.join(".vimrc"));

        assert!(fx.log.contains("would back up"));
        assert!(!fx.repo.join(relocate::BACKUPS_DIR).exists());
        assert_eq!(fs::read_to_string(fx.repo.join(".vimrc")).unwrap(), "old");
    }

    #[test]
    fn repository_directory_is_never_relocated() {
        let fx = Fixture::new();
        let engine = fx.engine(linker_never(), false);
        assert_eq!(
            engine.handle(&fx.repo.join(".bashrc")),
            HandleOutcome::Ignored(IgnoreReason::Excluded)
        );
    }

    #[cfg(unix)]
    #[test]
    fn scan_adopts_eligible_entries_only() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".bashrc"), "b").unwrap();
        fs::create_dir(fx.home.join(".config")).unwrap();
        fs::write(fx.home.join("visible"), "v").unwrap();
        fs::create_dir(fx.home.join(".git")).unwrap();
        fs::write(fx.home.join(".editorconfig.swp"), "s").unwrap();
        std::os::unix::fs::symlink("/nonexistent", fx.home.join(".linked")).unwrap();
        let engine = fx.engine(linker_expecting(3), false);

        let relocated = engine.scan();

        assert_eq!(relocated, vec![".bashrc", ".config", ".editorconfig.swp"]);
        assert!(fx.repo.join(".bashrc").exists());
        assert!(fx.repo.join(".config").is_dir());
        assert!(fx.home.join("visible").exists());
        assert!(fx.home.join(".git").is_dir());
        assert!(is_converged(&fx.home.join(".linked")));
    }

    #[test]
    fn scan_silently_defers_to_existing_repository_entry() {
        let fx = Fixture::new();
        fs::write(fx.repo.join(".gitconfig"), "repo").unwrap();
        fs::write(fx.home.join(".gitconfig"), "home").unwrap();
        let engine = fx.engine(linker_never(), false);

        let relocated = engine.scan();

        assert!(relocated.is_empty());
        assert_eq!(fs::read_to_string(fx.repo.join(".gitconfig")).unwrap(), "repo");
        assert_eq!(fs::read_to_string(fx.home.join(".gitconfig")).unwrap(), "home");
        assert!(!fx.repo.join(relocate::BACKUPS_DIR).exists());
    }

    #[test]
    fn scan_continues_after_relink_failure() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".a"), "a").unwrap();
        fs::write(fx.home.join(".b"), "b").unwrap();
        let mut linker = MockLinker::new();
        linker.expect_relink().times(2).returning(|_| {
            Err(LinkError::Failed {
                program: "stow".to_string(),
                code: None,
            })
        });
        let engine = fx.engine(linker, false);

        assert_eq!(engine.scan(), vec![".a", ".b"]);
        assert!(fx.log.contains("relink failed"));
    }

    #[test]
    fn scan_dry_run_lists_without_moving() {
        let fx = Fixture::new();
        fs::write(fx.home.join(".profile"), "p").unwrap();
        let engine = fx.engine(linker_never(), true);

        assert_eq!(engine.scan(), vec![".profile"]);
        assert!(fx.home.join(".profile").exists());
        assert!(!fx.repo.join(".profile").exists());
    }

    #[test]
    fn scan_of_missing_root_logs_and_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let log = Arc::new(BufferedLog::new());
        let settings = Settings::new(tmp.path().join("missing"), tmp.path().join("repo"), false);
        let engine = Engine::new(&settings, Arc::new(linker_never()), Arc::clone(&log) as Arc<dyn Log>);

        assert!(engine.scan().is_empty());
        assert!(log.contains("cannot list"));
    }

    #[test]
    fn is_converged_only_for_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file"), "").unwrap();
        assert!(!is_converged(&dir.path().join("file")));
        assert!(!is_converged(&dir.path().join("missing")));
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("dangling"))
                .unwrap();
            assert!(is_converged(&dir.path().join("dangling")));
        }
    }
}
