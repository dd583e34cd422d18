use clap::Parser;
use eksboot::{Cli, config, handle_command, logging};
use std::process::ExitCode;
use tracing::{debug, error, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env may set RUST_LOG, so load it before the subscriber is built
    let loaded = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| config::load_env_files(&cwd));
    logging::init(cli.log_level);
    match loaded {
        Ok(loaded) => {
            for path in loaded {
                debug!("Loaded environment from {}", path.display());
            }
        }
        Err(e) => warn!("{:#}", e),
    }

    match handle_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_fatal() {
                error!("{:#}\nPlease fix the error or install manually then try again", e);
            } else {
                error!("{:#}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}
