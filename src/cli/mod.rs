//! Command-line interface: argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, EdgeFilter, MethodArgs, RouteArgs, UsageFilter};
pub use commands::{CommandContext, run};
