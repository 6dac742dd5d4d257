//! Dotfile adoption engine.
//!
//! Watches a home directory for new top-level hidden entries, moves them
//! into a dotfiles repository, and runs a symlink-farm tool (GNU Stow by
//! default) so they reappear in place as symlinks.
//!
//! The public API is organised into four layers:
//!
//! - **[`classify`]**: pure path classification (hidden, excluded, temporary)
//! - **[`relocate`]** / **[`link`]**: moving entries, backups, and relinking
//! - **[`engine`]**: the reactive handler and the one-shot scan
//! - **[`watch`]** / **[`commands`]**: event source and mode orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod link;
pub mod logging;
pub mod relocate;
pub mod watch;
