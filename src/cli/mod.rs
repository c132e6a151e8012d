//! Command-line interface.

pub mod commands;
pub mod render;
pub mod types;

pub use types::{Cli, Commands, DebateCommands, SessionCommands};

/// Prints a terminal error and exits non-zero.
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("{} {err:#}", console::style("error:").red().bold());
    std::process::exit(1);
}
