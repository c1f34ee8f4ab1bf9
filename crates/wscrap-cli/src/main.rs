use wscrap_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args() {
        tracing::error!("wscrap failed: {:#}", err);
        eprintln!("wscrap error: {:#}", err);
        std::process::exit(1);
    }
}
