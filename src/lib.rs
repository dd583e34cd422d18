// eksboot library
// CLI types, commands and the services they orchestrate

pub mod cli_types;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod utils;

pub use cli_types::{Cli, Commands};
pub use commands::handle_command;
pub use error::{Error, Result};
