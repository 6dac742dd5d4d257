//! Filesystem event source for the watched root.
//!
//! Notifications and the shutdown request share one channel, so whatever
//! handler is running when Ctrl-C arrives finishes before the loop exits.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatchError;
use crate::logging::Log;

/// One item on the event channel.
#[derive(Debug)]
pub enum Message {
    /// A notification (or backend error) from the watcher.
    Fs(notify::Result<Event>),
    /// Stop after the current event.
    Shutdown,
}

/// Return `true` for creations and renames.
#[must_use]
pub const fn is_qualifying(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Requests that a running [`Watch`] stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Sender<Message>);

impl ShutdownHandle {
    /// Ask the loop to stop.  Returns `false` if it has already exited.
    pub fn shutdown(&self) -> bool {
        self.0.send(Message::Shutdown).is_ok()
    }
}

/// A live, non-recursive subscription on one directory.
pub struct Watch {
    root: PathBuf,
    watcher: RecommendedWatcher,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Watch {
    /// Subscribe to events directly under `root`.  Subdirectories are not
    /// watched.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or cannot
    /// watch `root`.
    pub fn subscribe(root: &Path) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver is gone once the loop has exited.
            let _ = event_tx.send(Message::Fs(res));
        })
        .map_err(WatchError::Create)?;
        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: root.to_path_buf(),
                source,
            })?;
        Ok(Self {
            root: root.to_path_buf(),
            watcher,
            tx,
            rx,
        })
    }

    /// A handle that stops [`run`](Self::run) from another thread.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.tx.clone())
    }

    /// Block, calling `on_path` for every path of every qualifying event,
    /// one at a time.  Returns on shutdown or when the channel closes.
    pub fn run(self, log: &dyn Log, on_path: impl FnMut(&Path)) {
        let Self {
            root,
            watcher: _watcher,
            tx,
            rx,
        } = self;
        drop(tx);
        log.stage(&format!("Watching {}", root.display()));
        dispatch(rx, log, on_path);
    }
}

/// Drain `messages`, feeding qualifying paths to `on_path`.  Backend errors
/// are logged and skipped.
pub fn dispatch(
    messages: impl IntoIterator<Item = Message>,
    log: &dyn Log,
    mut on_path: impl FnMut(&Path),
) {
    for message in messages {
        match message {
            Message::Shutdown => {
                log.info("shutdown requested, stopping watch");
                return;
            }
            Message::Fs(Err(e)) => log.warn(&format!("watch error: {e}")),
            Message::Fs(Ok(event)) => {
                if !is_qualifying(&event.kind) {
                    continue;
                }
                for path in &event.paths {
                    log.debug(&format!("event {:?} {}", event.kind, path.display()));
                    on_path(path);
                }
            }
        }
    }
    log.debug("event channel closed");
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::BufferedLog;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};

    fn event(kind: EventKind, path: &str) -> Message {
        Message::Fs(Ok(Event::new(kind).add_path(PathBuf::from(path))))
    }

    #[test]
    fn creations_and_renames_qualify() {
        assert!(is_qualifying(&EventKind::Create(CreateKind::File)));
        assert!(is_qualifying(&EventKind::Create(CreateKind::Folder)));
        assert!(is_qualifying(&EventKind::Modify(ModifyKind::Name(
            RenameMode::To
        ))));
        assert!(is_qualifying(&EventKind::Modify(ModifyKind::Name(
            RenameMode::Any
        ))));
    }

    #[test]
    fn other_kinds_do_not_qualify() {
        assert!(!is_qualifying(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_qualifying(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_qualifying(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn dispatch_feeds_paths_in_order() {
        let log = BufferedLog::new();
        let messages = vec![
            event(EventKind::Create(CreateKind::File), "/h/.a"),
            event(EventKind::Remove(RemoveKind::File), "/h/.gone"),
            event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), "/h/.b"),
        ];
        let mut seen = Vec::new();

        dispatch(messages, &log, |p| seen.push(p.to_path_buf()));

        assert_eq!(seen, vec![PathBuf::from("/h/.a"), PathBuf::from("/h/.b")]);
    }

    #[test]
    fn every_path_of_a_rename_pair_is_handled() {
        let log = BufferedLog::new();
        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/h/.old"))
            .add_path(PathBuf::from("/h/.new"));
        let mut seen = Vec::new();

        dispatch(vec![Message::Fs(Ok(rename))], &log, |p| {
            seen.push(p.to_path_buf());
        });

        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn backend_errors_are_logged_and_loop_continues() {
        let log = BufferedLog::new();
        let messages = vec![
            Message::Fs(Err(notify::Error::generic("queue overflow"))),
            event(EventKind::Create(CreateKind::File), "/h/.after"),
        ];
        let mut count = 0;

        dispatch(messages, &log, |_| count += 1);

        assert_eq!(count, 1);
        assert!(log.contains("queue overflow"));
    }

    #[test]
    fn shutdown_stops_before_later_events() {
        let log = BufferedLog::new();
        let messages = vec![
            event(EventKind::Create(CreateKind::File), "/h/.first"),
            Message::Shutdown,
            event(EventKind::Create(CreateKind::File), "/h/.never"),
        ];
        let mut seen = Vec::new();

        dispatch(messages, &log, |p| seen.push(p.to_path_buf()));

        assert_eq!(seen, vec![PathBuf::from("/h/.first")]);
        assert!(log.contains("shutdown requested"));
    }

    #[test]
    fn subscribe_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Watch::subscribe(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, WatchError::Subscribe { .. }));
    }

    #[test]
    fn shutdown_handle_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let watch = Watch::subscribe(dir.path()).unwrap();
        let handle = watch.shutdown_handle();
        assert!(handle.shutdown());

        let log = BufferedLog::new();
        watch.run(&log, |_| {});

        assert!(log.contains(&format!("Watching {}", dir.path().display())));
        assert!(log.contains("shutdown requested"));
        assert!(!handle.shutdown(), "loop has exited, receiver is gone");
    }
}
