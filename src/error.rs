//! Domain-specific error types for the relocation engine.
//!
//! Internal modules return typed errors (e.g., [`RelocateError`],
//! [`LinkError`]) while the command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! AutostowError                 : fatal, ends the process
//! ├── Startup(StartupError)     : home, repository directory, config file
//! └── Watch(WatchError)         : filesystem subscription
//!
//! RelocateError                 : snapshot creation, move, copy fallback
//! LinkError                     : external linking tool
//! ```
//!
//! [`RelocateError`] and [`LinkError`] never leave the engine; it logs them
//! per entry and keeps going.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the relocation engine.
#[derive(Error, Debug)]
pub enum AutostowError {
    /// Startup error (paths, configuration).
    #[error("Startup error: {0}")]
    Startup(#[from] StartupError),

    /// Filesystem subscription error.
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),
}

/// Errors that abort the process before any entry is handled.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Neither `HOME` nor `USERPROFILE` is set and no `--home` was given.
    #[error("cannot determine home directory: set HOME or pass --home")]
    HomeNotSet,

    /// The repository directory could not be created.
    #[error("failed to create dotfiles dir {path}: {source}")]
    RepositoryDir {
        /// Repository root that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A root directory could not be canonicalized.
    #[error("failed to resolve {path}: {source}")]
    Canonicalize {
        /// Path that could not be resolved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}

/// Errors raised while moving or backing up a single entry.
#[derive(Error, Debug)]
pub enum RelocateError {
    /// The backup snapshot directory could not be created.
    #[error("failed to create backup snapshot {path}: {source}")]
    Snapshot {
        /// Snapshot directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The destination lies inside the source, so any move would nest the
    /// entry into itself.
    #[error("refusing to move {src} into itself ({dst})")]
    IntoItself {
        /// Source path.
        src: PathBuf,
        /// Destination path below `src`.
        dst: PathBuf,
    },

    /// The copy fallback could not clear an existing destination.
    #[error("failed to replace {path}: {source}")]
    Replace {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Both the rename and the copy fallback failed. The destination may
    /// hold a partial copy.
    #[error("failed to move {src} -> {dst}: {source}")]
    Copy {
        /// Source path.
        src: PathBuf,
        /// Destination path.
        dst: PathBuf,
        /// Underlying I/O error from the copy.
        source: std::io::Error,
    },
}

/// Errors raised by the external linking tool.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The tool could not be started.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status.
    #[error("{program} failed (exit {})", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed {
        /// Program name.
        program: String,
        /// Exit code, or `None` when killed by a signal.
        code: Option<i32>,
    },
}

/// Errors raised while establishing the filesystem subscription.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The platform watcher could not be created.
    #[error("failed to create watcher: {0}")]
    Create(#[source] notify::Error),

    /// The watched root could not be subscribed.
    #[error("failed to watch {path}: {source}")]
    Subscribe {
        /// Watched root.
        path: PathBuf,
        /// Underlying watcher error.
        source: notify::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn repository_dir_display_names_path() {
        let e = StartupError::RepositoryDir {
            path: PathBuf::from("/home/u/.dotfiles"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            e.to_string(),
            "failed to create dotfiles dir /home/u/.dotfiles: permission denied"
        );
    }

    #[test]
    fn copy_error_names_both_paths() {
        let e = RelocateError::Copy {
            src: PathBuf::from("/home/u/.bashrc"),
            dst: PathBuf::from("/home/u/.dotfiles/.bashrc"),
            source: io::Error::other("disk full"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/home/u/.bashrc -> /home/u/.dotfiles/.bashrc"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn copy_error_has_source() {
        use std::error::Error as StdError;
        let e = RelocateError::Copy {
            src: PathBuf::from("a"),
            dst: PathBuf::from("b"),
            source: io::Error::other("x"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn link_failed_display_with_code() {
        let e = LinkError::Failed {
            program: "stow".to_string(),
            code: Some(2),
        };
        assert_eq!(e.to_string(), "stow failed (exit 2)");
    }

    #[test]
    fn link_failed_display_without_code() {
        let e = LinkError::Failed {
            program: "stow".to_string(),
            code: None,
        };
        assert_eq!(e.to_string(), "stow failed (exit signal)");
    }

    #[test]
    fn into_itself_names_both_paths() {
        let e = RelocateError::IntoItself {
            src: PathBuf::from("/home/u/.config"),
            dst: PathBuf::from("/home/u/.config/dotfiles/.config"),
        };
        assert_eq!(
            e.to_string(),
            "refusing to move /home/u/.config into itself (/home/u/.config/dotfiles/.config)"
        );
    }

    #[test]
    fn autostow_error_from_startup_error() {
        let e: AutostowError = StartupError::HomeNotSet.into();
        assert!(e.to_string().contains("Startup error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<AutostowError>();
        assert_send_sync::<StartupError>();
        assert_send_sync::<RelocateError>();
        assert_send_sync::<LinkError>();
        assert_send_sync::<WatchError>();
    }

    #[test]
    fn relocate_error_converts_to_anyhow() {
        let e = RelocateError::Snapshot {
            path: PathBuf::from("backups/20240102-030405"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
