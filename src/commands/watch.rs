use std::sync::Arc;

use crate::cli::Cli;
use crate::commands::CommandSetup;
use crate::error::AutostowError;
use crate::logging::{Log, Logger};
use crate::watch::Watch;

/// Watch the home directory until Ctrl-C.
///
/// # Errors
///
/// Returns an error if startup fails or the subscription cannot be
/// established.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<(), AutostowError> {
    log.stage("Resolving paths");
    let setup = CommandSetup::init(cli, &**log)?;
    let engine = setup.engine(Arc::clone(log) as Arc<dyn Log>);

    let watch = Watch::subscribe(engine.home())?;

    let shutdown = watch.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown.shutdown();
    }) {
        log.warn(&format!("could not install Ctrl-C handler: {e}"));
    }

    watch.run(&**log, |path| {
        engine.handle(path);
    });
    Ok(())
}
