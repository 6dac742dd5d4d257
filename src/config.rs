//! Run configuration: resolved roots, flags, and the optional TOML file.
//!
//! Everything a component needs is carried in a [`Settings`] value that is
//! built once at startup and handed to each constructor.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classify::{Classifier, ExclusionSet, TempNamePattern};
use crate::error::StartupError;
use crate::link::{DEFAULT_MARKERS, DEFAULT_PROGRAM};

/// Default repository directory name under the home directory.
pub const DEFAULT_REPOSITORY_NAME: &str = ".dotfiles";

/// Contents of `config.toml`.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Additional classifier rules.
    pub classifier: ClassifierConfig,
    /// Linking tool settings.
    pub linker: LinkerConfig,
}

/// `[classifier]` table: rules added on top of the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Extra reserved top-level names.
    pub exclude: Vec<String>,
    /// Extra temp-file suffixes.
    pub temp_suffixes: Vec<String>,
    /// Extra temp-file prefixes.
    pub temp_prefixes: Vec<String>,
}

/// `[linker]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkerConfig {
    /// Linking tool executable.
    pub program: String,
    /// Arguments inserted before the package selector.
    pub extra_args: Vec<String>,
    /// Marker file names deleted from the package before linking.
    pub markers: Vec<String>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            extra_args: Vec::new(),
            markers: DEFAULT_MARKERS.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

impl FileConfig {
    /// Load `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(StartupError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| StartupError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Watched root (normally the home directory).
    pub home: PathBuf,
    /// Repository root that adopted entries move into.
    pub repository: PathBuf,
    /// Log intent only; never touch the filesystem or run the linker.
    pub dry_run: bool,
    /// Additional classifier rules.
    pub classifier: ClassifierConfig,
    /// Linking tool settings.
    pub linker: LinkerConfig,
}

impl Settings {
    /// Settings with default rules for the given roots.
    #[must_use]
    pub fn new(home: PathBuf, repository: PathBuf, dry_run: bool) -> Self {
        Self::with_file_config(home, repository, dry_run, FileConfig::default())
    }

    /// Settings combining the roots with a loaded [`FileConfig`].
    #[must_use]
    pub fn with_file_config(
        home: PathBuf,
        repository: PathBuf,
        dry_run: bool,
        file: FileConfig,
    ) -> Self {
        Self {
            home,
            repository,
            dry_run,
            classifier: file.classifier,
            linker: file.linker,
        }
    }

    /// Top-level entry of the watched root that contains the repository,
    /// at any depth (`~/.config/dotfiles` yields `.config`).
    #[must_use]
    pub fn repository_top_level_name(&self) -> Option<OsString> {
        let rel = self.repository.strip_prefix(&self.home).ok()?;
        rel.components()
            .next()
            .map(|first| first.as_os_str().to_os_string())
    }

    /// Build the classifier for these settings.  The top-level entry holding
    /// the repository is always excluded.
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        let mut exclusions = ExclusionSet::with_defaults(self.classifier.exclude.iter().cloned());
        exclusions.extend(self.repository_top_level_name());
        Classifier::new(
            self.home.clone(),
            exclusions,
            TempNamePattern::with_defaults(
                &self.classifier.temp_suffixes,
                &self.classifier.temp_prefixes,
            ),
        )
    }
}

/// Resolve the home directory from `HOME` (or `USERPROFILE` on Windows).
///
/// # Errors
///
/// Returns [`StartupError::HomeNotSet`] if neither variable is set.
pub fn home_dir() -> Result<PathBuf, StartupError> {
    let var = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE").or_else(|_| std::env::var("HOME"))
    } else {
        std::env::var("HOME")
    };
    var.map(PathBuf::from).map_err(|_| StartupError::HomeNotSet)
}

/// Default config file: `$XDG_CONFIG_HOME/autostow/config.toml`, falling
/// back to `<home>/.config/autostow/config.toml`.
#[must_use]
pub fn default_config_path(home: &Path) -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map_or_else(|_| home.join(".config"), PathBuf::from)
        .join("autostow")
        .join("config.toml")
}

/// Create `repository` if needed.
///
/// # Errors
///
/// Returns [`StartupError::RepositoryDir`] if it cannot be created.
pub fn ensure_repository(repository: &Path) -> Result<(), StartupError> {
    std::fs::create_dir_all(repository).map_err(|source| StartupError::RepositoryDir {
        path: repository.to_path_buf(),
        source,
    })
}

/// Canonicalize an existing root so event paths and listings compare equal.
///
/// # Errors
///
/// Returns [`StartupError::Canonicalize`] if the path cannot be resolved.
pub fn canonical_root(path: &Path) -> Result<PathBuf, StartupError> {
    dunce::canonicalize(path).map_err(|source| StartupError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
