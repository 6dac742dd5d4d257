#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the watch loop over a real filesystem subscription.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use autostow::watch::Watch;
use common::IntegrationTestContext;

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    done()
}

#[test]
fn created_dotfile_is_adopted_while_watching() {
    let ctx = IntegrationTestContext::new();
    let engine = ctx.engine(false);
    let watch = Watch::subscribe(&ctx.home).unwrap();
    let shutdown = watch.shutdown_handle();
    let log = Arc::clone(&ctx.log);

    let worker = std::thread::spawn(move || {
        watch.run(&*log, |path| {
            engine.handle(path);
        });
    });

    ctx.write_home(".editorconfig", "root = true");
    let adopted = wait_for(Duration::from_secs(10), || {
        ctx.is_symlink(".editorconfig") && ctx.repo.join(".editorconfig").is_file()
    });

    assert!(shutdown.shutdown());
    worker.join().unwrap();
    assert!(adopted, "entry was not relocated and linked in time");
    assert!(ctx.log.contains("shutdown requested"));
}

#[test]
fn temp_files_are_left_alone_while_watching() {
    let ctx = IntegrationTestContext::new();
    let engine = ctx.engine(false);
    let watch = Watch::subscribe(&ctx.home).unwrap();
    let shutdown = watch.shutdown_handle();
    let log = Arc::clone(&ctx.log);

    let worker = std::thread::spawn(move || {
        watch.run(&*log, |path| {
            engine.handle(path);
        });
    });

    ctx.write_home(".viminfo.tmp", "scratch");
    let seen = wait_for(Duration::from_secs(10), || ctx.log.contains("temporary"));

    shutdown.shutdown();
    worker.join().unwrap();
    assert!(seen, "temporary entry was never reported");
    assert!(ctx.home.join(".viminfo.tmp").is_file());
    assert!(!ctx.repo.join(".viminfo.tmp").exists());
    assert!(ctx.linker.calls().is_empty());
}
