//! Classification of watched-directory paths.
//!
//! Decides, from the path string alone, whether an event or listing entry
//! names a top-level hidden entry the engine should relocate.  Nothing in
//! this module touches the filesystem.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Prefix marking an entry as hidden.
pub const HIDDEN_PREFIX: &str = ".";

/// Reserved top-level names that are never relocated.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".DS_Store",
    ".localized",
    ".Trash",
    ".git",
    ".dotfiles",
    ".TemporaryItems",
    ".fseventsd",
    "Library",
    "Applications",
    "Desktop",
    "Downloads",
];

/// Editor, swap, and temp file suffixes.
pub const DEFAULT_TEMP_SUFFIXES: &[&str] = &["~", ".swp", ".swx", ".tmp"];

/// Editor lock-file prefixes.
pub const DEFAULT_TEMP_PREFIXES: &[&str] = &[".#"];

/// Why a path was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The path is the watched root itself or lies outside it.
    OutsideRoot,
    /// The top-level name does not start with [`HIDDEN_PREFIX`].
    NotHidden,
    /// The top-level name is in the [`ExclusionSet`].
    Excluded,
    /// The leaf name matches the [`TempNamePattern`].
    Temporary,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutsideRoot => "outside watched root",
            Self::NotHidden => "not hidden",
            Self::Excluded => "excluded",
            Self::Temporary => "temporary",
        })
    }
}

/// Result of [`Classifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Leave the path alone.
    Ignore(IgnoreReason),
    /// Relocate the top-level entry with this name.  The name is kept as
    /// the raw file name so non-UTF-8 entries round-trip unchanged.
    Relocate(OsString),
}

/// Exact-name, case-sensitive set of reserved top-level names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<OsString>,
}

impl ExclusionSet {
    /// The built-in reserved names plus `extra`.
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut set = Self::default();
        set.extend(DEFAULT_EXCLUSIONS.iter().copied());
        set.extend(extra);
        set
    }

    /// Add names to the set.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    /// Return `true` if `name` is reserved.
    #[must_use]
    pub fn contains(&self, name: impl AsRef<OsStr>) -> bool {
        self.names.contains(name.as_ref())
    }
}

/// Suffix and prefix rules identifying editor, swap, and temp artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TempNamePattern {
    suffixes: Vec<String>,
    prefixes: Vec<String>,
}

impl TempNamePattern {
    /// The built-in rules plus extra suffixes and prefixes.
    #[must_use]
    pub fn with_defaults(extra_suffixes: &[String], extra_prefixes: &[String]) -> Self {
        let suffixes = DEFAULT_TEMP_SUFFIXES
            .iter()
            .map(|s| (*s).to_string())
            .chain(extra_suffixes.iter().cloned())
            .collect();
        let prefixes = DEFAULT_TEMP_PREFIXES
            .iter()
            .map(|s| (*s).to_string())
            .chain(extra_prefixes.iter().cloned())
            .collect();
        Self { suffixes, prefixes }
    }

    /// Return `true` if `name` looks like a temporary artifact.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
            || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Pure decision logic over paths below the watched root.
#[derive(Debug, Clone)]
pub struct Classifier {
    root: PathBuf,
    exclusions: ExclusionSet,
    temp: TempNamePattern,
}

impl Classifier {
    /// Create a classifier for paths below `root`.
    #[must_use]
    pub const fn new(root: PathBuf, exclusions: ExclusionSet, temp: TempNamePattern) -> Self {
        Self {
            root,
            exclusions,
            temp,
        }
    }

    /// Classifier with only the built-in rules.
    #[must_use]
    pub fn with_defaults(root: PathBuf) -> Self {
        Self::new(
            root,
            ExclusionSet::with_defaults(std::iter::empty::<String>()),
            TempNamePattern::with_defaults(&[], &[]),
        )
    }

    /// Return `true` if the top-level `name` is reserved.
    #[must_use]
    pub fn is_excluded(&self, name: impl AsRef<OsStr>) -> bool {
        self.exclusions.contains(name)
    }

    /// Return `true` if `name` begins with the hidden marker.
    #[must_use]
    pub fn is_hidden(name: impl AsRef<OsStr>) -> bool {
        name.as_ref()
            .as_encoded_bytes()
            .starts_with(HIDDEN_PREFIX.as_bytes())
    }

    /// Decide what to do with `path`.
    ///
    /// Checks run in a fixed order: relative-to-root, hidden, excluded,
    /// temporary.  The exclusion and temp checks both come before any
    /// filesystem inspection the caller performs.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Classification {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return Classification::Ignore(IgnoreReason::OutsideRoot);
        };
        let top = match rel.components().next() {
            Some(Component::Normal(name)) => name,
            _ => return Classification::Ignore(IgnoreReason::OutsideRoot),
        };
        if !Self::is_hidden(top) {
            return Classification::Ignore(IgnoreReason::NotHidden);
        }
        if self.exclusions.contains(top) {
            return Classification::Ignore(IgnoreReason::Excluded);
        }
        // Temp rules are ASCII, so a lossy leaf matches the same way.
        let leaf = path.file_name().unwrap_or(top).to_string_lossy();
        if self.temp.matches(&leaf) {
            return Classification::Ignore(IgnoreReason::Temporary);
        }
        Classification::Relocate(top.to_os_string())
    }
}
