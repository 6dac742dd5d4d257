use std::sync::Arc;

use crate::cli::Cli;
use crate::commands::CommandSetup;
use crate::error::AutostowError;
use crate::logging::{Log, Logger};

/// Run the one-shot scan.
///
/// Per-entry failures are logged and summarized but do not fail the run.
///
/// # Errors
///
/// Returns an error if startup fails.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<(), AutostowError> {
    log.stage("Resolving paths");
    let setup = CommandSetup::init(cli, &**log)?;
    let engine = setup.engine(Arc::clone(log) as Arc<dyn Log>);

    log.stage(&format!("Scanning {}", engine.home().display()));
    let moved = engine.scan();
    log.info(&format!("scan complete, moved: {moved:?}"));

    log.print_summary();
    Ok(())
}
