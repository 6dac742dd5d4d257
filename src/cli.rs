use std::path::PathBuf;

use clap::Parser;

/// Build version: `git describe` output or `AUTOSTOW_VERSION` when set at
/// build time, the package version otherwise.
pub const VERSION: &str = match option_env!("AUTOSTOW_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Move new top-level dotfiles into a dotfiles repository and re-link them.
#[derive(Parser, Debug)]
#[command(
    name = "autostow",
    about = "Adopt new dotfiles into a stow repository",
    version = VERSION
)]
pub struct Cli {
    /// Dotfiles repository (default: <home>/.dotfiles)
    #[arg(long, value_name = "PATH")]
    pub dotfiles_dir: Option<PathBuf>,

    /// Directory to watch (default: $HOME)
    #[arg(long, value_name = "PATH")]
    pub home: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/autostow/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Adopt existing dotfiles once and exit instead of watching
    #[arg(long)]
    pub scan: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Name of the running mode, used for the log file name.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        if self.scan { "scan" } else { "watch" }
    }
}
