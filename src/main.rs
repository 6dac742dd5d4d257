use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use autostow::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command = args.command_name();
    logging::init_subscriber(args.verbose, command);
    // Watch runs until interrupted and never prints a summary.
    let log = Arc::new(if args.scan {
        logging::Logger::new(command)
    } else {
        logging::Logger::without_summary(command)
    });

    log.info(&format!("autostow {}", cli::VERSION));
    commands::run(&args, &log)
}
