pub mod scan;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::Cli;
use crate::config::{self, FileConfig, Settings};
use crate::engine::Engine;
use crate::error::StartupError;
use crate::exec;
use crate::link::StowLinker;
use crate::logging::{Log, Logger};

/// Shared state produced by the common command setup sequence.
///
/// Resolves the watched root and repository, loads the config file, and
/// creates the repository directory so that each mode starts from the same
/// canonical [`Settings`].
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved configuration for this run.
    pub settings: Settings,
}

impl CommandSetup {
    /// Resolve roots, load configuration, and create the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, the
    /// config file is unreadable or invalid, or the repository directory
    /// cannot be created.
    pub fn init(cli: &Cli, log: &dyn Log) -> Result<Self, StartupError> {
        let home = match &cli.home {
            Some(home) => home.clone(),
            None => config::home_dir()?,
        };
        let home = config::canonical_root(&home)?;

        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| config::default_config_path(&home));
        let file = FileConfig::load(&config_path)?;
        log.debug(&format!("config: {}", config_path.display()));

        let repository = cli
            .dotfiles_dir
            .clone()
            .unwrap_or_else(|| home.join(config::DEFAULT_REPOSITORY_NAME));
        let repository = if cli.dry_run && !repository.exists() {
            log.dry_run(&format!("would create {}", repository.display()));
            repository
        } else {
            config::ensure_repository(&repository)?;
            config::canonical_root(&repository)?
        };

        log.info(&format!("home: {}", home.display()));
        log.info(&format!("repository: {}", repository.display()));

        let settings = Settings::with_file_config(home, repository, cli.dry_run, file);

        if exec::which(&settings.linker.program).is_none() {
            log.warn(&format!(
                "{} not found on PATH; relocations will not be re-linked",
                settings.linker.program
            ));
        }

        Ok(Self { settings })
    }

    /// Build the engine with the production linker.
    #[must_use]
    pub fn engine(&self, log: Arc<dyn Log>) -> Engine {
        Engine::new(
            &self.settings,
            Arc::new(StowLinker::from_settings(&self.settings)),
            log,
        )
    }
}

/// Run the mode selected on the command line.
///
/// # Errors
///
/// Returns an error if startup fails or the watch subscription cannot be
/// established.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    if cli.scan {
        scan::run(cli, log).context("scan failed")
    } else {
        watch::run(cli, log).context("watch failed")
    }
}
