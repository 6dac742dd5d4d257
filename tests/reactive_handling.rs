#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the reactive handler: a single detected path is
//! classified, relocated, and re-linked through the fake linker.

mod common;

use std::fs;

use autostow::classify::IgnoreReason;
use autostow::engine::HandleOutcome;
use autostow::logging::EntryStatus;
use common::IntegrationTestContext;

#[test]
fn new_dotfile_ends_up_linked_from_repository() {
    let ctx = IntegrationTestContext::new();
    let path = ctx.write_home(".bashrc", "alias ll='ls -l'");

    let outcome = ctx.engine(false).handle(&path);

    assert!(matches!(outcome, HandleOutcome::Relocated { linked: true, .. }));
    assert_eq!(ctx.linker.calls(), vec!["."]);
    assert!(ctx.is_symlink(".bashrc"));
    assert_eq!(
        fs::read_link(ctx.home.join(".bashrc")).unwrap(),
        ctx.repo.join(".bashrc")
    );
    assert_eq!(
        fs::read_to_string(ctx.home.join(".bashrc")).unwrap(),
        "alias ll='ls -l'"
    );
}

#[test]
fn dot_directory_is_adopted_as_a_whole() {
    let ctx = IntegrationTestContext::new();
    ctx.write_home(".config/git/ignore", "*.swp");

    ctx.engine(false).handle(&ctx.home.join(".config"));

    assert!(ctx.is_symlink(".config"));
    assert!(ctx.repo.join(".config/git/ignore").is_file());
}

#[test]
fn handling_a_converged_entry_again_changes_nothing() {
    let ctx = IntegrationTestContext::new();
    let path = ctx.write_home(".zshrc", "bindkey -e");
    let engine = ctx.engine(false);
    engine.handle(&path);

    let second = engine.handle(&path);

    assert_eq!(second, HandleOutcome::AlreadyLinked);
    assert_eq!(ctx.linker.calls().len(), 1);
    assert!(ctx.snapshots().is_empty());
    assert_eq!(
        fs::read_to_string(ctx.repo.join(".zshrc")).unwrap(),
        "bindkey -e"
    );
}

#[test]
fn existing_repository_copy_is_backed_up_before_overwrite() {
    let ctx = IntegrationTestContext::new();
    ctx.write_repo(".vimrc", "set number");
    let path = ctx.write_home(".vimrc", "set relativenumber");

    let outcome = ctx.engine(false).handle(&path);

    let HandleOutcome::Relocated {
        backup: Some(backup),
        ..
    } = outcome
    else {
        panic!("expected relocation with backup, got {outcome:?}");
    };
    let snapshots = ctx.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(backup, snapshots[0].join(".vimrc"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), "set number");
    assert_eq!(
        fs::read_to_string(ctx.repo.join(".vimrc")).unwrap(),
        "set relativenumber"
    );
    assert!(ctx.is_symlink(".vimrc"));
}

#[test]
fn snapshot_directory_is_named_by_second() {
    let ctx = IntegrationTestContext::new();
    ctx.write_repo(".npmrc", "old");
    let path = ctx.write_home(".npmrc", "new");

    ctx.engine(false).handle(&path);

    let snapshot = ctx.snapshots().pop().expect("one snapshot");
    let name = snapshot.file_name().unwrap().to_string_lossy().into_owned();
    assert!(
        chrono::NaiveDateTime::parse_from_str(&name, "%Y%m%d-%H%M%S").is_ok(),
        "unexpected snapshot name {name}"
    );
}

#[test]
fn dry_run_leaves_new_directory_in_place() {
    let ctx = IntegrationTestContext::new();
    ctx.write_home(".foo/settings", "x=1");

    let outcome = ctx.engine(true).handle(&ctx.home.join(".foo"));

    assert_eq!(
        outcome,
        HandleOutcome::DryRun {
            name: ".foo".into()
        }
    );
    assert!(ctx.home.join(".foo").is_dir());
    assert!(!ctx.is_symlink(".foo"));
    assert_eq!(
        fs::read_to_string(ctx.home.join(".foo/settings")).unwrap(),
        "x=1"
    );
    assert!(!ctx.repo.join(".foo").exists());
    assert!(ctx.linker.calls().is_empty());
    assert_eq!(ctx.log.records()[0].status, EntryStatus::DryRun);
}

#[test]
fn noise_is_ignored_without_touching_the_filesystem() {
    let ctx = IntegrationTestContext::new();
    let engine = ctx.engine(false);
    let swap = ctx.write_home(".bashrc.swp", "swap");
    let visible = ctx.write_home("notes.md", "# notes");

    assert_eq!(
        engine.handle(&swap),
        HandleOutcome::Ignored(IgnoreReason::Temporary)
    );
    assert_eq!(
        engine.handle(&visible),
        HandleOutcome::Ignored(IgnoreReason::NotHidden)
    );
    assert_eq!(
        engine.handle(&ctx.repo),
        HandleOutcome::Ignored(IgnoreReason::Excluded)
    );
    assert!(swap.exists());
    assert!(visible.exists());
    assert!(ctx.linker.calls().is_empty());
}
