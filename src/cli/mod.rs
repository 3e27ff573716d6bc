pub mod commands;
pub mod core;
mod io;
pub mod output;
mod shell;

pub use self::core::{CliMode, CommandError, ShellContext};
pub use shell::run_cli;
