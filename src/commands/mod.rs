// Command module routing
//
// To add a new command:
// 1. Create a new file in this directory (e.g., `mycommand.rs`)
// 2. Add `pub mod mycommand;` below
// 3. Add the match arm in `handle_command` function

pub mod check;
pub mod create;

use crate::cli_types::Commands;
use crate::error::Result;

/// Dispatch command to appropriate handler
pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Create { command } => create::handle_create(command)?,
        Commands::Check { no_install } => check::handle_check(no_install)?,
    }
    Ok(())
}
